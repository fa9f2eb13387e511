use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::models::{Entry, Field, UserId};
use crate::store::TradeStore;

const FREQUENCY_WEIGHT: f64 = 0.7;
const FRESHNESS_WEIGHT: f64 = 0.3;
const GLOBAL_WEIGHT: f64 = 0.2;

/// Per-value score signals for one (user, field) pair: a recency-weighted
/// personal map and a flat cross-user popularity map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldScores {
    pub personal: HashMap<String, f64>,
    pub global: HashMap<String, f64>,
}

impl FieldScores {
    pub fn combined(&self, value: &str) -> f64 {
        self.personal.get(value).copied().unwrap_or(0.0)
            + self.global.get(value).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.global.is_empty()
    }
}

/// Scans journal history into ranking signals. Storage failures degrade to
/// empty maps so ranking falls back to schema order.
pub struct HistoryAggregator {
    store: Arc<dyn TradeStore>,
}

impl HistoryAggregator {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    pub async fn scores(&self, user_id: UserId, field: Field, now: DateTime<Utc>) -> FieldScores {
        let personal = match self.store.query(user_id).await {
            Ok(entries) => Self::personal_scores(&entries, field, now),
            Err(e) => {
                warn!("history read for user {} failed: {:#}", user_id, e);
                HashMap::new()
            }
        };

        let global = match self.store.query_all().await {
            Ok(entries) => Self::global_scores(&entries, field),
            Err(e) => {
                warn!("global history read failed: {:#}", e);
                HashMap::new()
            }
        };

        FieldScores { personal, global }
    }

    /// Frequency dominates, recency is a secondary tiebreaker: each
    /// occurrence adds 0.7 plus up to 0.3 scaled by 1/age_days.
    fn personal_scores(
        entries: &[Entry],
        field: Field,
        now: DateTime<Utc>,
    ) -> HashMap<String, f64> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        for entry in entries {
            let freshness = 1.0 / entry.age_days(now);
            for value in entry.values_for(field) {
                *scores.entry(value).or_insert(0.0) +=
                    FREQUENCY_WEIGHT + freshness * FRESHNESS_WEIGHT;
            }
        }
        scores
    }

    /// Flat +0.2 per occurrence across all users, independent of age.
    fn global_scores(entries: &[Entry], field: Field) -> HashMap<String, f64> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        for entry in entries {
            for value in entry.values_for(field) {
                *scores.entry(value).or_insert(0.0) += GLOBAL_WEIGHT;
            }
        }
        scores
    }
}
