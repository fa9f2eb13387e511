use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::models::{Entry, EntryId, Field, FieldValue, UserId};
use crate::store::{SchemaSource, TradeStore};

/// Build a committed entry `days` back from `now` with the given fields.
pub fn entry_days_ago(
    user_id: UserId,
    fields: &[(Field, FieldValue)],
    days: i64,
    now: DateTime<Utc>,
) -> Entry {
    let values: HashMap<Field, FieldValue> = fields.iter().cloned().collect();
    Entry {
        id: 0,
        user_id,
        values,
        committed_at: now - Duration::days(days),
    }
}

/// In-memory trade store with call counting and a failure switch, for
/// exercising cache hits and degraded-history paths.
pub struct MemoryTradeStore {
    entries: RwLock<Vec<Entry>>,
    query_calls: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryTradeStore {
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            query_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let store = Self::with_entries(Vec::new());
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn push(&self, entry: Entry) {
        self.entries.write().unwrap().push(entry);
    }

    /// Total `query` + `query_all` invocations.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(anyhow!("storage unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn add(&self, mut entry: Entry) -> Result<EntryId> {
        self.check()?;
        let mut entries = self.entries.write().unwrap();
        let id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        entry.id = id;
        entries.push(entry);
        Ok(id)
    }

    async fn query(&self, user_id: UserId) -> Result<Vec<Entry>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_all(&self) -> Result<Vec<Entry>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.entries.read().unwrap().clone())
    }

    async fn delete(&self, user_id: UserId, entry_id: EntryId) -> Result<bool> {
        self.check()?;
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.id == entry_id));
        Ok(entries.len() != before)
    }
}

/// Schema source that serves one field until told to start failing.
pub struct FlakySchemaSource {
    field: Field,
    options: Vec<String>,
    fail: AtomicBool,
}

impl FlakySchemaSource {
    pub fn new(field: Field, options: &[&str]) -> Self {
        Self {
            field,
            options: options.iter().map(|s| s.to_string()).collect(),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail_from_now_on(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaSource for FlakySchemaSource {
    async fn options(&self, field: Field) -> Result<Vec<String>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("schema database unreachable"));
        }
        if field == self.field {
            Ok(self.options.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn identity(&self) -> String {
        "flaky".to_string()
    }
}
