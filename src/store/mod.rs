pub mod json_store;
pub mod schema_api;

pub use json_store::JsonTradeStore;
pub use schema_api::{ApiSchemaSource, StaticSchemaSource};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Entry, EntryId, Field, UserId};

/// Durable storage for committed journal entries.
///
/// `add` errors propagate to the commit caller so the user can be told the
/// save failed; `query*` errors are absorbed by the history aggregator.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn add(&self, entry: Entry) -> Result<EntryId>;
    async fn query(&self, user_id: UserId) -> Result<Vec<Entry>>;
    async fn query_all(&self) -> Result<Vec<Entry>>;
    /// Remove one entry; returns false when it did not exist.
    async fn delete(&self, user_id: UserId, entry_id: EntryId) -> Result<bool>;
}

/// External system defining the legal set of values for select fields.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn options(&self, field: Field) -> Result<Vec<String>>;
    /// Identity of the backing schema (e.g. database id); part of cache keys.
    fn identity(&self) -> String;
}
