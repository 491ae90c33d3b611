// src/sentiment.rs
//! Blended sentiment scoring for article text.
//!
//! Three independent estimators are combined 40/40/20 and clamped to
//! `[-1,1]`:
//! - a lexical-polarity estimator over an integer-valued lexicon with a
//!   short negation window,
//! - a valence-aware estimator over a graded lexicon with boosters and
//!   negation damping, normalized to a compound score,
//! - a keyword-bucket estimator over five graded keyword lists.
//!
//! Absence of any hit yields a neutral 0 contribution, never an error.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static POLARITY: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../polarity_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid polarity lexicon")
});

static VALENCE: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../valence_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid valence lexicon")
});

const W_POLARITY: f64 = 0.4;
const W_VALENCE: f64 = 0.4;
const W_BUCKET: f64 = 0.2;

/// Polarity lexicon entries span [-4, 4]; used to normalize to [-1, 1].
const POLARITY_MAX_MAGNITUDE: f64 = 4.0;

/// Valence compound normalization constant (score / sqrt(score^2 + alpha)).
const VALENCE_ALPHA: f64 = 15.0;

/// Negated valence words keep this fraction of their magnitude, flipped.
const VALENCE_NEGATION_DAMP: f64 = 0.74;

/// Magnitude added to a valence word preceded by an intensity booster.
const BOOSTER_STEP: f64 = 0.3;

/// Five graded keyword buckets with their fixed scalars. Matched by
/// substring, so inflected forms ("surges", "plunged") hit their stems.
const BUCKETS: &[(&[&str], f64)] = &[
    (
        &["surge", "soar", "boom", "explode", "skyrocket", "rally", "breakthrough", "triumph"],
        1.0,
    ),
    (
        &["rise", "gain", "grow", "increase", "advance", "improve", "strengthen", "optimistic", "bullish"],
        0.5,
    ),
    (
        &["stable", "steady", "unchanged", "maintain", "continue", "persist"],
        0.0,
    ),
    (
        &["fall", "drop", "decline", "decrease", "weaken", "worry", "concern", "bearish", "pessimistic"],
        -0.6,
    ),
    (
        &["crash", "plunge", "collapse", "plummet", "devastate", "disaster", "crisis", "panic"],
        -1.0,
    ),
];

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer;

/// Per-estimator breakdown, useful for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentBreakdown {
    pub polarity: f64,
    pub valence: f64,
    pub bucket: f64,
    pub blended: f64,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Blended sentiment of `text`, in `[-1,1]`.
    pub fn score_text(&self, text: &str) -> f64 {
        self.breakdown(text).blended
    }

    pub fn breakdown(&self, text: &str) -> SentimentBreakdown {
        let tokens: Vec<String> = tokenize(text).collect();
        let polarity = polarity_score(&tokens);
        let valence = valence_score(&tokens);
        let bucket = bucket_score(&text.to_lowercase());
        let blended =
            (polarity * W_POLARITY + valence * W_VALENCE + bucket * W_BUCKET).clamp(-1.0, 1.0);
        SentimentBreakdown {
            polarity,
            valence,
            bucket,
            blended,
        }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexical polarity: mean lexicon score of scored tokens, sign-flipped when
/// a negator appears within the preceding 3 tokens, normalized to [-1,1].
fn polarity_score(tokens: &[String]) -> f64 {
    let mut sum = 0i32;
    let mut hits = 0usize;

    for i in 0..tokens.len() {
        let base = *POLARITY.get(tokens[i].as_str()).unwrap_or(&0);
        if base == 0 && !POLARITY.contains_key(tokens[i].as_str()) {
            continue;
        }
        hits += 1;
        let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
        sum += if negated { -base } else { base };
    }

    if hits == 0 {
        return 0.0;
    }
    (sum as f64 / (hits as f64 * POLARITY_MAX_MAGNITUDE)).clamp(-1.0, 1.0)
}

/// Valence-aware estimator: graded lexicon values with booster amplification
/// and damped negation, reduced to a compound score in (-1,1).
fn valence_score(tokens: &[String]) -> f64 {
    let mut sum = 0.0f64;

    for i in 0..tokens.len() {
        let Some(&base) = VALENCE.get(tokens[i].as_str()) else {
            continue;
        };
        let mut v = base;

        if i >= 1 && is_booster(tokens[i - 1].as_str()) {
            v += BOOSTER_STEP * v.signum();
        }
        let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
        if negated {
            v = -v * VALENCE_NEGATION_DAMP;
        }

        sum += v;
    }

    if sum == 0.0 {
        return 0.0;
    }
    sum / (sum * sum + VALENCE_ALPHA).sqrt()
}

/// Keyword buckets: each matched keyword contributes its bucket scalar once;
/// the result is the mean across matched keywords.
fn bucket_score(text_lower: &str) -> f64 {
    let mut sum = 0.0f64;
    let mut hits = 0usize;

    for (words, scalar) in BUCKETS {
        for w in *words {
            if text_lower.contains(w) {
                sum += scalar;
                hits += 1;
            }
        }
    }

    if hits == 0 {
        0.0
    } else {
        sum / hits as f64
    }
}

/// Alphanumeric tokens, lower-cased.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn" | "wasn" | "aren" | "won" | "can" | "cannot" | "without"
    )
}

fn is_booster(tok: &str) -> bool {
    matches!(
        tok,
        "very" | "extremely" | "sharply" | "strongly" | "hugely" | "massively"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SentimentAnalyzer {
        SentimentAnalyzer::new()
    }

    #[test]
    fn neutral_text_scores_zero() {
        assert_eq!(analyzer().score_text("The committee met on Tuesday"), 0.0);
        assert_eq!(analyzer().score_text(""), 0.0);
    }

    #[test]
    fn positive_headline_is_positive() {
        let s = analyzer().score_text("Fed raises interest rates, dollar surges to record high");
        assert!(s > 0.3, "expected clearly positive, got {s}");
    }

    #[test]
    fn negative_headline_is_negative() {
        let s = analyzer().score_text("ECB warns of recession, euro plunges in panic selling");
        assert!(s < -0.3, "expected clearly negative, got {s}");
    }

    #[test]
    fn flat_headline_is_near_zero() {
        let s = analyzer().score_text("Markets flat amid holiday trading");
        assert!(s.abs() < 0.15, "expected near-neutral, got {s}");
    }

    #[test]
    fn negation_flips_polarity() {
        let pos = analyzer().score_text("The euro gains ground");
        let neg = analyzer().score_text("The euro does not gain ground");
        assert!(pos > 0.0);
        assert!(neg < pos);
        assert!(neg <= 0.0, "negated positive should not stay positive: {neg}");
    }

    #[test]
    fn booster_amplifies_valence() {
        let plain = analyzer().breakdown("Stocks rally after the report").valence;
        let boosted = analyzer()
            .breakdown("Stocks very sharply rally after the report")
            .valence;
        assert!(boosted > plain, "{boosted} <= {plain}");
    }

    #[test]
    fn bucket_scalars_average() {
        // One very-positive hit ("surge") and one negative hit ("concern").
        let b = analyzer()
            .breakdown("surge meets concern")
            .bucket;
        assert!((b - (1.0 - 0.6) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_hold_for_extreme_text() {
        let pile_pos = "surge soar rally boom skyrocket triumph breakthrough ".repeat(10);
        let pile_neg = "crash plunge collapse panic disaster crisis plummet ".repeat(10);
        let sp = analyzer().score_text(&pile_pos);
        let sn = analyzer().score_text(&pile_neg);
        assert!((-1.0..=1.0).contains(&sp));
        assert!((-1.0..=1.0).contains(&sn));
        assert!(sp > 0.8);
        assert!(sn < -0.8);
    }
}
