use std::collections::HashMap;

use crate::models::{Entry, Field};

/// Fields worth bucketing a journal summary by.
const DIMENSIONS: &[Field] = &[Field::Ticker, Field::Session, Field::Setup];

#[derive(Debug, Clone)]
pub struct BucketStats {
    pub field: Field,
    pub value: String,
    pub total: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, Default)]
pub struct JournalSummary {
    pub entries: usize,
    pub total_pnl: f64,
    pub buckets: Vec<BucketStats>,
}

/// Rolls a user's committed entries up into per-value win/loss/PnL buckets
/// for the stats screen. An entry counts as a win when its PnL is positive;
/// entries without a PnL contribute volume but no outcome.
pub fn summarize(entries: &[Entry]) -> JournalSummary {
    let total_pnl: f64 = entries.iter().filter_map(|e| entry_pnl(e)).sum();

    let mut buckets: Vec<BucketStats> = Vec::new();
    for &field in DIMENSIONS {
        let mut grouped: HashMap<String, Vec<&Entry>> = HashMap::new();
        for entry in entries {
            for value in entry.values_for(field) {
                grouped.entry(value).or_default().push(entry);
            }
        }
        for (value, group) in grouped {
            buckets.push(compute_bucket(field, value, &group));
        }
    }

    // Largest buckets first, then by name for a stable listing
    buckets.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.value.cmp(&b.value)));

    JournalSummary {
        entries: entries.len(),
        total_pnl: round2(total_pnl),
        buckets,
    }
}

fn compute_bucket(field: Field, value: String, entries: &[&Entry]) -> BucketStats {
    let total = entries.len();
    let closed: Vec<f64> = entries.iter().filter_map(|e| entry_pnl(e)).collect();
    let wins = closed.iter().filter(|&&p| p > 0.0).count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        wins as f64 / closed.len() as f64
    };

    BucketStats {
        field,
        value,
        total,
        wins,
        win_rate: round2(win_rate),
        total_pnl: round2(closed.iter().sum()),
    }
}

fn entry_pnl(entry: &Entry) -> Option<f64> {
    entry.get(Field::Pnl).and_then(|v| v.as_decimal())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::test_helpers::entry_days_ago;
    use chrono::Utc;

    #[test]
    fn buckets_by_ticker_with_win_rate() {
        let now = Utc::now();
        let entries = vec![
            entry_days_ago(
                1,
                &[
                    (Field::Ticker, FieldValue::Text("BTC-USD".into())),
                    (Field::Pnl, FieldValue::Decimal(50.0)),
                ],
                1,
                now,
            ),
            entry_days_ago(
                1,
                &[
                    (Field::Ticker, FieldValue::Text("BTC-USD".into())),
                    (Field::Pnl, FieldValue::Decimal(-20.0)),
                ],
                2,
                now,
            ),
            entry_days_ago(
                1,
                &[
                    (Field::Ticker, FieldValue::Text("ES".into())),
                    (Field::Pnl, FieldValue::Decimal(10.0)),
                ],
                3,
                now,
            ),
        ];

        let summary = summarize(&entries);
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.total_pnl, 40.0);

        let btc = summary
            .buckets
            .iter()
            .find(|b| b.value == "BTC-USD")
            .unwrap();
        assert_eq!(btc.total, 2);
        assert_eq!(btc.wins, 1);
        assert_eq!(btc.win_rate, 0.5);
        assert_eq!(btc.total_pnl, 30.0);
    }

    #[test]
    fn entries_without_pnl_count_volume_only() {
        let now = Utc::now();
        let entries = vec![entry_days_ago(
            1,
            &[(Field::Ticker, FieldValue::Text("NQ".into()))],
            1,
            now,
        )];
        let summary = summarize(&entries);
        let nq = summary.buckets.iter().find(|b| b.value == "NQ").unwrap();
        assert_eq!(nq.total, 1);
        assert_eq!(nq.wins, 0);
        assert_eq!(nq.win_rate, 0.0);
    }

    #[test]
    fn empty_journal_summarizes_to_zeroes() {
        let summary = summarize(&[]);
        assert_eq!(summary.entries, 0);
        assert!(summary.buckets.is_empty());
    }
}
