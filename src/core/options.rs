use chrono::{DateTime, Utc};

use crate::core::sessions::SessionClock;
use crate::models::Field;

/// Normalizes raw option lists from the schema source and owns the built-in
/// per-field default sets used when the schema has nothing for a field.
pub struct OptionSource;

impl OptionSource {
    /// Trim, drop empties, dedupe case-insensitively keeping the first
    /// spelling and the original order.
    pub fn normalize(raw: &[String]) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut out: Vec<String> = Vec::new();
        for item in raw {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                continue;
            }
            let folded = trimmed.to_lowercase();
            if seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            out.push(trimmed.to_string());
        }
        out
    }

    /// Built-in fallback candidates so the flow never dead-ends on a select
    /// field with no schema data.
    pub fn defaults(field: Field) -> Vec<String> {
        Self::defaults_at(field, Utc::now())
    }

    pub fn defaults_at(field: Field, now: DateTime<Utc>) -> Vec<String> {
        match field {
            Field::Direction => vec_of(&["long", "short"]),
            Field::Session => SessionClock::ordered_at(now),
            Field::Setup => vec_of(&["breaker", "fvg", "liquidity_sweep", "order_block"]),
            Field::Emotions => vec_of(&["anxious", "calm", "confident", "fomo", "greedy"]),
            Field::Ticker => vec_of(&["BTC-USD", "ETH-USD", "ES", "NQ", "EUR-USD", "XAU-USD"]),
            // Free-form and numeric fields have no sensible defaults
            _ => Vec::new(),
        }
    }
}

fn vec_of(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_trims_and_dedupes() {
        let raw = vec![
            " BTC-USD ".to_string(),
            "".to_string(),
            "btc-usd".to_string(),
            "ETH-USD".to_string(),
            "  ".to_string(),
            "ETH-USD".to_string(),
        ];
        assert_eq!(OptionSource::normalize(&raw), vec!["BTC-USD", "ETH-USD"]);
    }

    #[test]
    fn normalize_keeps_first_spelling_and_order() {
        let raw = vec!["Long".to_string(), "LONG".to_string(), "Short".to_string()];
        assert_eq!(OptionSource::normalize(&raw), vec!["Long", "Short"]);
    }

    #[test]
    fn session_defaults_follow_the_clock() {
        // 3am ET in January = 8:00 UTC, inside the london window
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let defaults = OptionSource::defaults_at(Field::Session, now);
        assert_eq!(defaults[0], "london");
    }

    #[test]
    fn numeric_fields_have_no_defaults() {
        assert!(OptionSource::defaults(Field::Pnl).is_empty());
        assert!(OptionSource::defaults(Field::Comment).is_empty());
        assert!(OptionSource::defaults(Field::Account).is_empty());
    }
}
