use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trade_journal_bot::config::Config;
use trade_journal_bot::conversation::ConversationEngine;
use trade_journal_bot::core::SuggestionCache;
use trade_journal_bot::models::{Entry, EntryId, Field, FieldValue, UserId};
use trade_journal_bot::store::{SchemaSource, StaticSchemaSource, TradeStore};
use trade_journal_bot::transport::{DraftView, Presenter, StepView};

/// In-memory store with switches for slow and failing writes, so busy-guard
/// and commit-retry paths can be exercised.
pub struct MemoryStore {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    query_calls: AtomicUsize,
    fail_add: AtomicBool,
    add_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            query_calls: AtomicUsize::new(0),
            fail_add: AtomicBool::new(false),
            add_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn fail_adds(&self) {
        self.fail_add.store(true, Ordering::SeqCst);
    }

    pub fn heal_adds(&self) {
        self.fail_add.store(false, Ordering::SeqCst);
    }

    pub fn slow_adds(&self, millis: u64) {
        self.add_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn add(&self, mut entry: Entry) -> Result<EntryId> {
        let delay = self.add_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(anyhow!("storage rejected the write"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        entry.id = id;
        self.entries.lock().unwrap().push(entry);
        Ok(id)
    }

    async fn query(&self, user_id: UserId) -> Result<Vec<Entry>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_all(&self) -> Result<Vec<Entry>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn delete(&self, user_id: UserId, entry_id: EntryId) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.id == entry_id));
        Ok(entries.len() != before)
    }
}

/// Everything the engine rendered, in order.
#[derive(Debug, Clone)]
pub enum Screen {
    Step {
        field: Field,
        step: Option<usize>,
        current: Option<FieldValue>,
        options: Vec<String>,
        boosted: Vec<String>,
    },
    Confirmation(Vec<(Field, Option<FieldValue>)>),
    Message(String),
    Saved(EntryId),
    Parked(EntryId),
}

pub struct RecordingPresenter {
    screens: Mutex<Vec<Screen>>,
    next_handle: AtomicI64,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self {
            screens: Mutex::new(Vec::new()),
            next_handle: AtomicI64::new(100),
        }
    }

    pub fn screens(&self) -> Vec<Screen> {
        self.screens.lock().unwrap().clone()
    }

    pub fn last_screen(&self) -> Option<Screen> {
        self.screens.lock().unwrap().last().cloned()
    }

    pub fn last_step(&self) -> Option<Screen> {
        self.screens
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| matches!(s, Screen::Step { .. }))
            .cloned()
    }

    pub fn messages(&self) -> Vec<String> {
        self.screens
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Screen::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, screen: Screen) {
        self.screens.lock().unwrap().push(screen);
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn show_step(&self, view: StepView) -> Result<()> {
        self.push(Screen::Step {
            field: view.field,
            step: view.step,
            current: view.current.clone(),
            options: view.options.iter().map(|o| o.value.clone()).collect(),
            boosted: view
                .options
                .iter()
                .filter(|o| o.context)
                .map(|o| o.value.clone())
                .collect(),
        });
        Ok(())
    }

    async fn show_confirmation(&self, view: DraftView) -> Result<()> {
        self.push(Screen::Confirmation(view.rows));
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<()> {
        self.push(Screen::Message(message.to_string()));
        Ok(())
    }

    async fn show_saved(&self, entry_id: EntryId) -> Result<()> {
        self.push(Screen::Saved(entry_id));
        Ok(())
    }

    async fn show_parked(&self, view: DraftView) -> Result<i64> {
        self.push(Screen::Parked(view.entry_id));
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::from_env();
    cfg.flow = Field::DEFAULT_FLOW.to_vec();
    cfg.max_input_errors = 3;
    cfg.idle_threshold_secs = 1800;
    cfg.schema_ttl_secs = 600;
    cfg.suggestion_ttl_secs = 600;
    cfg.top_n = 6;
    cfg
}

pub fn default_schema() -> StaticSchemaSource {
    StaticSchemaSource::new()
        .with(Field::Ticker, &["BTC-USD", "ETH-USD", "ES"])
        .with(Field::Direction, &["Long", "Short"])
}

pub struct Harness {
    pub engine: Arc<ConversationEngine>,
    pub store: Arc<MemoryStore>,
    pub presenter: Arc<RecordingPresenter>,
    pub cache: Arc<SuggestionCache>,
}

pub fn harness(cfg: Config, schema: Arc<dyn SchemaSource>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let presenter = Arc::new(RecordingPresenter::new());
    let cache = Arc::new(SuggestionCache::new(
        schema,
        store.clone() as Arc<dyn TradeStore>,
        cfg.schema_ttl(),
        cfg.suggestion_ttl(),
    ));
    let engine = Arc::new(ConversationEngine::new(
        cfg.shared(),
        store.clone() as Arc<dyn TradeStore>,
        cache.clone(),
        presenter.clone() as Arc<dyn Presenter>,
    ));
    Harness {
        engine,
        store,
        presenter,
        cache,
    }
}

pub fn default_harness() -> Harness {
    harness(test_config(), Arc::new(default_schema()))
}
