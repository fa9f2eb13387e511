mod bot;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use trade_journal_bot::config::Config;
use trade_journal_bot::conversation::ConversationEngine;
use trade_journal_bot::core::SuggestionCache;
use trade_journal_bot::store::{
    ApiSchemaSource, JsonTradeStore, SchemaSource, StaticSchemaSource, TradeStore,
};
use trade_journal_bot::transport::{ConsolePresenter, Presenter};

use crate::bot::JournalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let store: Arc<dyn TradeStore> = Arc::new(JsonTradeStore::load(&cfg.data_dir)?);

    let schema: Arc<dyn SchemaSource> = if cfg.schema_api_url.is_empty() {
        // No external schema database configured; built-in defaults
        // drive the select fields
        Arc::new(StaticSchemaSource::new())
    } else {
        Arc::new(ApiSchemaSource::new(
            &cfg.schema_api_url,
            &cfg.schema_api_token,
            &cfg.schema_database_id,
        ))
    };

    let cache = Arc::new(SuggestionCache::new(
        schema,
        store.clone(),
        cfg.schema_ttl(),
        cfg.suggestion_ttl(),
    ));

    let presenter = Arc::new(ConsolePresenter::new());
    let shared_config = cfg.shared();

    let engine = Arc::new(ConversationEngine::new(
        shared_config.clone(),
        store.clone(),
        cache.clone(),
        presenter.clone() as Arc<dyn Presenter>,
    ));

    let mut bot = JournalBot::new(shared_config, engine, store, cache, presenter).await;
    bot.run().await?;

    Ok(())
}
