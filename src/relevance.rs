// src/relevance.rs
//! Forex-relevance scoring: a monotonic, saturating keyword heuristic.
//!
//! Four keyword taxonomies contribute fixed weights per hit; the sum is
//! clamped to `[0,1]`. This is not a classifier — multiple hits simply
//! accumulate up to the cap.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency and FX-market mentions.
pub const CURRENCY_TERMS: &[&str] = &[
    "dollar",
    "dollars",
    "euro",
    "euros",
    "pound",
    "pounds",
    "yen",
    "franc",
    "currency",
    "currencies",
    "exchange",
    "forex",
    "fx",
];

/// Central banks and monetary policy.
pub const CENTRAL_BANK_TERMS: &[&str] = &[
    "federal reserve",
    "fed",
    "ecb",
    "bank of england",
    "boj",
    "central bank",
    "central banks",
    "monetary policy",
    "interest rate",
    "interest rates",
];

/// Macro indicators.
pub const INDICATOR_TERMS: &[&str] = &[
    "gdp",
    "inflation",
    "employment",
    "unemployment",
    "trade balance",
    "economic",
    "economy",
];

/// Market-moving events.
pub const EVENT_TERMS: &[&str] = &[
    "trade war",
    "brexit",
    "election",
    "political",
    "war",
    "conflict",
    "sanctions",
    "recession",
];

const CURRENCY_PER_HIT: f64 = 0.15;
const CENTRAL_BANK_PER_HIT: f64 = 0.20;
const INDICATOR_PER_HIT: f64 = 0.15;
const INDICATOR_CONTRIBUTION_CAP: f64 = 0.30;
const EVENT_PER_HIT: f64 = 0.10;

static RE_CURRENCY: Lazy<Regex> = Lazy::new(|| category_regex(CURRENCY_TERMS));
static RE_CENTRAL_BANK: Lazy<Regex> = Lazy::new(|| category_regex(CENTRAL_BANK_TERMS));
static RE_INDICATOR: Lazy<Regex> = Lazy::new(|| category_regex(INDICATOR_TERMS));
static RE_EVENT: Lazy<Regex> = Lazy::new(|| category_regex(EVENT_TERMS));

fn category_regex(terms: &[&str]) -> Regex {
    // Longest-first so multi-word phrases win over their prefixes
    // ("federal reserve" before "fed").
    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = sorted
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("taxonomy regex")
}

/// Per-category hit counts, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryHits {
    pub currency: usize,
    pub central_bank: usize,
    pub indicator: usize,
    pub event: usize,
}

pub fn category_hits(text: &str) -> CategoryHits {
    CategoryHits {
        currency: RE_CURRENCY.find_iter(text).count(),
        central_bank: RE_CENTRAL_BANK.find_iter(text).count(),
        indicator: RE_INDICATOR.find_iter(text).count(),
        event: RE_EVENT.find_iter(text).count(),
    }
}

/// Relevance of `text` to currency-market trading, in `[0,1]`.
pub fn score(text: &str) -> f64 {
    let hits = category_hits(text);
    let indicator_contribution =
        (hits.indicator as f64 * INDICATOR_PER_HIT).min(INDICATOR_CONTRIBUTION_CAP);
    let raw = hits.currency as f64 * CURRENCY_PER_HIT
        + hits.central_bank as f64 * CENTRAL_BANK_PER_HIT
        + indicator_contribution
        + hits.event as f64 * EVENT_PER_HIT;
    raw.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hits_is_zero() {
        assert_eq!(score("Local bakery wins pie contest"), 0.0);
    }

    #[test]
    fn single_category_weights() {
        assert!((score("the dollar moved") - 0.15).abs() < 1e-9);
        assert!((score("the fed met today") - 0.20).abs() < 1e-9);
        assert!((score("gdp numbers due") - 0.15).abs() < 1e-9);
        assert!((score("brexit talks resume") - 0.10).abs() < 1e-9);
    }

    #[test]
    fn phrase_beats_prefix() {
        // "federal reserve" must count once, not as "fed" plus leftovers.
        let hits = category_hits("The Federal Reserve kept policy unchanged");
        assert_eq!(hits.central_bank, 1);
    }

    #[test]
    fn indicator_contribution_is_capped() {
        // Four indicator hits would be 0.6 uncapped; contribution stops at 0.3.
        let text = "gdp inflation unemployment economy";
        assert!((score(text) - 0.30).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped_to_one() {
        let text = "dollar euro pound yen franc forex fx currency exchange \
                    fed ecb boj central bank monetary policy interest rate \
                    gdp inflation war sanctions brexit election";
        assert_eq!(score(text), 1.0);
    }

    #[test]
    fn monotone_in_added_keywords() {
        let base = "Markets quiet ahead of the holiday";
        let mut text = base.to_string();
        let mut prev = score(&text);
        for kw in ["dollar", "fed", "inflation", "sanctions", "euro", "ecb"] {
            text.push(' ');
            text.push_str(kw);
            let next = score(&text);
            assert!(
                next >= prev,
                "adding `{kw}` lowered relevance: {prev} -> {next}"
            );
            prev = next;
        }
    }

    #[test]
    fn bounds_hold_for_arbitrary_text() {
        for text in [
            "",
            "dollar",
            "Fed raises interest rates, dollar surges to record high",
            "completely unrelated text about gardening",
        ] {
            let r = score(text);
            assert!((0.0..=1.0).contains(&r), "out of range for {text:?}: {r}");
        }
    }
}
