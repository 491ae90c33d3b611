// src/ingest/providers/mod.rs
pub mod feed;
pub mod json_api;

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

/// Entry cap per source per cycle. Bounds parse cost and downstream growth.
pub const MAX_ENTRIES_PER_SOURCE: usize = 50;

/// Best-effort timestamp parse: RFC 2822 (classic RSS pubDate), then
/// RFC 3339, then a bare unix-seconds integer. Unparseable input maps to 0.
pub fn parse_published(ts: &str) -> u64 {
    let t = ts.trim();
    if let Ok(dt) = OffsetDateTime::parse(t, &Rfc2822) {
        return to_unix(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(t, &Rfc3339) {
        return to_unix(dt);
    }
    t.parse::<u64>().unwrap_or(0)
}

fn to_unix(dt: OffsetDateTime) -> u64 {
    u64::try_from(dt.to_offset(UtcOffset::UTC).unix_timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc2822_and_rfc3339() {
        assert_eq!(
            parse_published("Mon, 02 Jan 2006 15:04:05 GMT"),
            1_136_214_245
        );
        assert_eq!(parse_published("2006-01-02T15:04:05Z"), 1_136_214_245);
    }

    #[test]
    fn parses_unix_and_garbage() {
        assert_eq!(parse_published("1136214245"), 1_136_214_245);
        assert_eq!(parse_published("next tuesday"), 0);
        assert_eq!(parse_published(""), 0);
    }
}
