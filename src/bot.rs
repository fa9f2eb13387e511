use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use trade_journal_bot::config::SharedConfig;
use trade_journal_bot::conversation::{ConversationEngine, Outcome};
use trade_journal_bot::core::{stats, SuggestionCache};
use trade_journal_bot::models::{EntryId, Field};
use trade_journal_bot::store::TradeStore;
use trade_journal_bot::transport::console::{parse_line, Command};
use trade_journal_bot::transport::ConsolePresenter;

const HELP: &str = "\
Commands:
  /new             start a journal entry
  /back /skip      navigate the current step
  /later           park the draft for later
  /pending         list parked drafts   /resume <id>   /clear
  /done            save the entry       /edit <field>  /cancel
  /stats           journal summary      /undo          delete last saved entry
  #k               pick the k-th suggested option
  anything else    value for the current step";

/// Console front end: reads lines, maps them onto engine actions, renders
/// everything else (pending lists, stats) itself.
pub struct JournalBot {
    config: SharedConfig,
    engine: Arc<ConversationEngine>,
    store: Arc<dyn TradeStore>,
    cache: Arc<SuggestionCache>,
    presenter: Arc<ConsolePresenter>,
    committed: Mutex<Vec<EntryId>>,
}

impl JournalBot {
    pub async fn new(
        config: SharedConfig,
        engine: Arc<ConversationEngine>,
        store: Arc<dyn TradeStore>,
        cache: Arc<SuggestionCache>,
        presenter: Arc<ConsolePresenter>,
    ) -> Self {
        let cfg = config.read().await;

        info!("{}", "=".repeat(60));
        info!("Trade journal bot starting up");
        let steps: Vec<&str> = cfg.flow.iter().map(|f| f.as_str()).collect();
        info!("Entry flow: {}", steps.join(" -> "));
        info!(
            "TTLs: schema {}s, suggestions {}s; idle threshold {}s",
            cfg.schema_ttl_secs, cfg.suggestion_ttl_secs, cfg.idle_threshold_secs
        );
        info!("{}", "=".repeat(60));
        drop(cfg);

        Self {
            config,
            engine,
            store,
            cache,
            presenter,
            committed: Mutex::new(Vec::new()),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. /help for commands, Ctrl+C to stop.");
        println!("{}", HELP);

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.dispatch(&line).await {
                                return Ok(());
                            }
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Handle one console line. Returns false to quit.
    async fn dispatch(&self, line: &str) -> bool {
        let user_id = self.config.read().await.user_id;
        self.engine.sweep_idle().await;

        let Some(command) = parse_line(line, &self.presenter.last_options()) else {
            if !line.trim().is_empty() {
                println!("Unknown command. /help for the list.");
            }
            return true;
        };

        match command {
            Command::Quit => return false,
            Command::Help => println!("{}", HELP),
            Command::New => {
                if let Err(e) = self.engine.start(user_id).await {
                    warn!("failed to start entry flow: {}", e);
                }
            }
            Command::Act(action) => match self.engine.handle(user_id, action).await {
                Ok(Outcome::Committed(entry_id)) => {
                    self.committed.lock().unwrap().push(entry_id);
                }
                Ok(outcome) => debug!("action outcome: {:?}", outcome),
                Err(e) => debug!("action rejected: {}", e),
            },
            Command::Pending => self.show_pending(user_id).await,
            Command::Clear => {
                let cleared = self.engine.clear_pending(user_id).await;
                println!("Cleared {} parked draft(s).", cleared);
            }
            Command::Stats => self.show_stats(user_id).await,
            Command::Undo => self.undo(user_id).await,
        }
        true
    }

    async fn show_pending(&self, user_id: i64) {
        let pending = self.engine.list_pending(user_id).await;
        if pending.is_empty() {
            println!("No parked drafts.");
            return;
        }
        println!("Parked drafts:");
        for entry in pending {
            println!(
                "  #{} {} (parked {})",
                entry.draft.id,
                entry.draft.summary(),
                entry.parked_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    async fn show_stats(&self, user_id: i64) {
        let entries = match self.store.query(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("stats query failed: {:#}", e);
                println!("Journal unavailable right now.");
                return;
            }
        };
        let summary = stats::summarize(&entries);
        println!(
            "{} entries, total PnL {}",
            summary.entries, summary.total_pnl
        );
        for bucket in summary.buckets.iter().take(10) {
            println!(
                "  {:<10} {:<14} {} trades, {:.0}% wins, PnL {}",
                bucket.field.as_str(),
                bucket.value,
                bucket.total,
                bucket.win_rate * 100.0,
                bucket.total_pnl
            );
        }
    }

    async fn undo(&self, user_id: i64) {
        let last = self.committed.lock().unwrap().pop();
        let Some(entry_id) = last else {
            println!("Nothing saved this session to undo.");
            return;
        };
        match self.store.delete(user_id, entry_id).await {
            Ok(true) => {
                // Deleted history must stop surfacing as a suggestion
                self.cache.invalidate_user(user_id, Field::ALL);
                println!("Deleted entry #{}.", entry_id);
            }
            Ok(false) => println!("Entry #{} was already gone.", entry_id),
            Err(e) => {
                warn!("undo failed: {:#}", e);
                self.committed.lock().unwrap().push(entry_id);
                println!("Could not delete entry #{}.", entry_id);
            }
        }
    }
}
