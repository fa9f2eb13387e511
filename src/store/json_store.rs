use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, info};

use crate::models::{Entry, EntryId, UserId};
use crate::store::TradeStore;

/// File-backed trade store: the full journal lives in one JSON file under
/// the data directory, loaded on startup and rewritten on every mutation.
pub struct JsonTradeStore {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    file: PathBuf,
}

impl JsonTradeStore {
    pub fn load(data_dir: &str) -> Result<Self> {
        let file = Path::new(data_dir).join("journal.json");

        let entries: Vec<Entry> = match fs::read_to_string(&file) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("malformed journal file {}", file.display()))?,
            Err(_) => Vec::new(),
        };

        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        info!(
            "Journal store loaded: {} entries from {}",
            entries.len(),
            file.display()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            next_id: AtomicU64::new(next_id),
            file,
        })
    }

    fn persist(&self, entries: &[Entry]) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create data dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.file, json)
            .with_context(|| format!("cannot write journal file {}", self.file.display()))
    }
}

#[async_trait]
impl TradeStore for JsonTradeStore {
    async fn add(&self, mut entry: Entry) -> Result<EntryId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        entry.id = id;

        let mut entries = self.entries.write().unwrap();
        entries.push(entry);
        self.persist(&entries)?;
        debug!("Journal entry #{} persisted ({} total)", id, entries.len());
        Ok(id)
    }

    async fn query(&self, user_id: UserId) -> Result<Vec<Entry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_all(&self) -> Result<Vec<Entry>> {
        Ok(self.entries.read().unwrap().clone())
    }

    async fn delete(&self, user_id: UserId, entry_id: EntryId) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.id == entry_id));
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        debug!("Journal entry #{} deleted", entry_id);
        Ok(true)
    }
}
