use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::history::HistoryAggregator;
use crate::core::options::OptionSource;
use crate::core::ranking::RankingEngine;
use crate::models::{DraftEntry, Field, FieldOption, UserId};
use crate::store::{SchemaSource, TradeStore};

struct Slot<T> {
    value: T,
    stored_at: Instant,
}

impl<T> Slot<T> {
    fn fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

type SchemaKey = (Field, String);
type SuggestionKey = (UserId, Field, String);

/// Memoizes schema fetches and base rankings with independent TTLs.
///
/// Schema entries live long (schemas change rarely) and survive expiry as a
/// stale fallback when a refresh fails. Suggestion entries live short so a
/// freshly committed trade surfaces quickly, and are invalidated eagerly on
/// commit. Locks are never held across an await; concurrent misses may race
/// to fill a slot (last write wins), which is acceptable here.
pub struct SuggestionCache {
    schema: Arc<dyn SchemaSource>,
    history: HistoryAggregator,
    schema_slots: RwLock<HashMap<SchemaKey, Slot<Vec<String>>>>,
    suggestion_slots: RwLock<HashMap<SuggestionKey, Slot<Vec<FieldOption>>>>,
    schema_ttl: Duration,
    suggestion_ttl: Duration,
}

impl SuggestionCache {
    pub fn new(
        schema: Arc<dyn SchemaSource>,
        store: Arc<dyn TradeStore>,
        schema_ttl: Duration,
        suggestion_ttl: Duration,
    ) -> Self {
        Self {
            schema,
            history: HistoryAggregator::new(store),
            schema_slots: RwLock::new(HashMap::new()),
            suggestion_slots: RwLock::new(HashMap::new()),
            schema_ttl,
            suggestion_ttl,
        }
    }

    /// Normalized allowed options for a field. Fetch failures fall back to
    /// the stale cached value when one exists, else an empty list.
    pub async fn schema_options(&self, field: Field) -> Vec<String> {
        let key = (field, self.schema.identity());

        {
            let slots = self.schema_slots.read().unwrap();
            if let Some(slot) = slots.get(&key) {
                if slot.fresh(self.schema_ttl) {
                    return slot.value.clone();
                }
            }
        }

        match self.schema.options(field).await {
            Ok(raw) => {
                let options = OptionSource::normalize(&raw);
                let mut slots = self.schema_slots.write().unwrap();
                slots.insert(
                    key,
                    Slot {
                        value: options.clone(),
                        stored_at: Instant::now(),
                    },
                );
                options
            }
            Err(e) => {
                warn!("schema fetch for {} failed: {:#}", field, e);
                // Availability over freshness: serve the expired value if any
                let slots = self.schema_slots.read().unwrap();
                slots.get(&key).map(|s| s.value.clone()).unwrap_or_default()
            }
        }
    }

    /// Ranked suggestions for a (user, field) pair. The base ranking is
    /// cached without draft context; the context boost is applied on every
    /// call so the key never depends on draft content.
    pub async fn suggestions(
        &self,
        user_id: UserId,
        field: Field,
        draft: &DraftEntry,
    ) -> Vec<FieldOption> {
        let key = (user_id, field, self.schema.identity());

        let base = {
            let slots = self.suggestion_slots.read().unwrap();
            slots
                .get(&key)
                .filter(|slot| slot.fresh(self.suggestion_ttl))
                .map(|slot| slot.value.clone())
        };

        let base = match base {
            Some(cached) => cached,
            None => {
                let options = self.schema_options(field).await;
                let scores = self.history.scores(user_id, field, chrono::Utc::now()).await;
                let ranked = RankingEngine::base_rank(field, &options, &scores);
                let mut slots = self.suggestion_slots.write().unwrap();
                slots.insert(
                    key,
                    Slot {
                        value: ranked.clone(),
                        stored_at: Instant::now(),
                    },
                );
                ranked
            }
        };

        RankingEngine::apply_context(base, draft.get(field))
    }

    /// Drop a user's cached rankings for the given fields. Called after a
    /// commit so just-used values surface as recent without waiting out the
    /// TTL. Schema entries are untouched.
    pub fn invalidate_user(&self, user_id: UserId, fields: &[Field]) {
        let mut slots = self.suggestion_slots.write().unwrap();
        let before = slots.len();
        slots.retain(|(uid, field, _), _| *uid != user_id || !fields.contains(field));
        debug!(
            "invalidated {} suggestion slots for user {}",
            before - slots.len(),
            user_id
        );
    }

    /// Drop all schema entries (and dependent rankings). Called on settings
    /// changes such as switching the schema database.
    pub fn invalidate_schema(&self) {
        self.schema_slots.write().unwrap().clear();
        self.suggestion_slots.write().unwrap().clear();
    }
}
