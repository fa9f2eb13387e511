use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SharedConfig;
use crate::conversation::state::{ConversationState, Mode, PendingEntry};
use crate::core::SuggestionCache;
use crate::error::FlowError;
use crate::models::{DraftEntry, EntryId, Field, FieldValue, UserId};
use crate::store::TradeStore;
use crate::transport::{Action, DraftView, Presenter, StepView};

/// What a processed action amounted to. User-recoverable conditions land
/// here; hard failures come back as [`FlowError`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A step prompt was (re-)shown.
    Prompted,
    /// The full preview was shown.
    Confirming,
    Committed(EntryId),
    Cancelled,
    /// Cancelled after too many invalid inputs.
    AutoCancelled,
    /// The idle threshold had lapsed; the state was purged.
    Expired,
    /// Rejected by the busy guard, step unchanged.
    StillProcessing,
    /// Cancel noted while an input was in flight; applied when it finishes.
    CancelScheduled,
    /// Action not valid in the current state, state unchanged.
    Rejected,
    /// Input failed validation, same step re-prompted.
    Reprompted,
    Parked,
    Resumed,
}

/// One user's session slot. The mutex is the busy flag: a turn holds it for
/// the whole input-processing span, and a failed `try_lock` is exactly the
/// "still processing" rejection.
struct SessionSlot {
    cancel_requested: AtomicBool,
    state: Mutex<ConversationState>,
}

/// Drives users through the entry flow: one lock per user, all users in
/// parallel, suggestions served through the shared cache.
pub struct ConversationEngine {
    config: SharedConfig,
    store: Arc<dyn TradeStore>,
    cache: Arc<SuggestionCache>,
    presenter: Arc<dyn Presenter>,
    sessions: RwLock<HashMap<UserId, Arc<SessionSlot>>>,
    pending: RwLock<HashMap<UserId, Vec<PendingEntry>>>,
    next_draft_id: AtomicU64,
}

impl ConversationEngine {
    pub fn new(
        config: SharedConfig,
        store: Arc<dyn TradeStore>,
        cache: Arc<SuggestionCache>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            presenter,
            sessions: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            next_draft_id: AtomicU64::new(1),
        }
    }

    /// Begin a fresh entry flow at step 1. An existing active draft for the
    /// user is discarded (replaced); an expired one is purged silently.
    pub async fn start(&self, user_id: UserId) -> Result<Outcome, FlowError> {
        let now = Utc::now();
        let draft_id = self.next_draft_id.fetch_add(1, Ordering::SeqCst);
        let draft = DraftEntry::new(draft_id, user_id, now);
        let state = ConversationState::new(user_id, draft, now);

        let slot = Arc::new(SessionSlot {
            cancel_requested: AtomicBool::new(false),
            state: Mutex::new(state),
        });

        let replaced = self
            .sessions
            .write()
            .await
            .insert(user_id, slot.clone())
            .is_some();
        if replaced {
            info!("user {} restarted entry flow, draft replaced", user_id);
        } else {
            info!("user {} started entry flow", user_id);
        }

        let guard = slot.state.lock().await;
        self.present_step(&guard).await;
        Ok(Outcome::Prompted)
    }

    /// Process one user action against the active conversation.
    pub async fn handle(&self, user_id: UserId, action: Action) -> Result<Outcome, FlowError> {
        debug!("user {} action: {}", user_id, action.name());

        if let Action::Resume(entry_id) = action {
            return self.resume(user_id, entry_id).await;
        }

        let slot = {
            let sessions = self.sessions.read().await;
            sessions.get(&user_id).cloned()
        };
        let Some(slot) = slot else {
            self.notify(user_id, "No entry in progress. Start a new one first.")
                .await;
            return Err(FlowError::NoActiveEntry);
        };

        let mut guard = match slot.state.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if action == Action::Cancel {
                    // Cancel is never swallowed by the busy guard; the
                    // in-flight turn applies it on completion.
                    slot.cancel_requested.store(true, Ordering::SeqCst);
                    debug!("user {} cancel noted while busy", user_id);
                    return Ok(Outcome::CancelScheduled);
                }
                self.notify(user_id, "Still processing your previous input.")
                    .await;
                return Ok(Outcome::StillProcessing);
            }
        };

        let now = Utc::now();
        let cfg = self.config.read().await.clone();

        if guard.expired(cfg.idle_threshold(), now) {
            drop(guard);
            self.sessions.write().await.remove(&user_id);
            self.notify(user_id, "Your entry expired. Start a new one.")
                .await;
            info!("user {} conversation expired", user_id);
            return Ok(Outcome::Expired);
        }
        guard.touch(now);

        let outcome = match action {
            Action::Cancel => {
                drop(guard);
                self.sessions.write().await.remove(&user_id);
                self.notify(user_id, "Entry cancelled.").await;
                info!("user {} cancelled entry", user_id);
                return Ok(Outcome::Cancelled);
            }
            Action::Input(text) | Action::Pick(text) => {
                self.apply_value(&mut guard, &cfg.flow, cfg.max_input_errors, &text)
                    .await
            }
            Action::Skip => self.apply_skip(&mut guard, &cfg.flow).await,
            Action::Back => self.apply_back(&mut guard, &cfg.flow).await,
            Action::Confirm => self.apply_confirm(&mut guard).await,
            Action::Edit(field) => self.apply_edit(&mut guard, field).await,
            Action::Park => {
                let draft = guard.draft.clone();
                let view = self.draft_view(&cfg.flow, &draft);
                drop(guard);
                return self.park(user_id, draft, view).await;
            }
            Action::Resume(_) => unreachable!("resume handled above"),
        };

        // Honor a cancel that arrived while this turn held the lock. It is
        // applied even when the turn itself failed (e.g. a commit error
        // keeps the state for retry, but a requested cancel still wins).
        if slot.cancel_requested.swap(false, Ordering::SeqCst) {
            let removed = self.sessions.write().await.remove(&user_id).is_some();
            if removed {
                self.notify(user_id, "Entry cancelled.").await;
                info!("user {} cancel applied after in-flight turn", user_id);
                if outcome.is_ok() {
                    return Ok(Outcome::Cancelled);
                }
            }
        }

        outcome
    }

    /// True when the user has an active (possibly expired, not yet purged)
    /// conversation.
    pub async fn has_active(&self, user_id: UserId) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }

    pub async fn list_pending(&self, user_id: UserId) -> Vec<PendingEntry> {
        self.pending
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear_pending(&self, user_id: UserId) -> usize {
        self.pending
            .write()
            .await
            .remove(&user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Purge sessions idle beyond the threshold. Correctness only needs the
    /// lazy next-touch check; this frees memory for abandoned sessions.
    pub async fn sweep_idle(&self) -> usize {
        let now = Utc::now();
        let idle = self.config.read().await.idle_threshold();
        let mut sessions = self.sessions.write().await;
        let mut purged = 0;
        let users: Vec<UserId> = sessions.keys().copied().collect();
        for user in users {
            let Some(slot) = sessions.get(&user).cloned() else {
                continue;
            };
            // Skip sessions mid-turn; they will expire on next touch
            let should_remove = if let Ok(guard) = slot.state.try_lock() {
                guard.expired(idle, now)
            } else {
                false
            };
            if should_remove {
                sessions.remove(&user);
                purged += 1;
            }
        }
        if purged > 0 {
            info!("expiry sweep purged {} idle sessions", purged);
        }
        purged
    }

    async fn resume(&self, user_id: UserId, entry_id: EntryId) -> Result<Outcome, FlowError> {
        if self.has_active(user_id).await {
            self.notify(
                user_id,
                "Finish or cancel the current entry before resuming another.",
            )
            .await;
            return Err(FlowError::AlreadyActive);
        }

        let parked = {
            let mut pending = self.pending.write().await;
            let Some(list) = pending.get_mut(&user_id) else {
                return Err(FlowError::UnknownPending(entry_id));
            };
            let pos = list.iter().position(|p| p.draft.id == entry_id);
            match pos {
                Some(pos) => list.remove(pos),
                None => return Err(FlowError::UnknownPending(entry_id)),
            }
        };

        let now = Utc::now();
        let cfg = self.config.read().await.clone();
        let state = ConversationState::resumed(user_id, parked.draft, cfg.flow.len(), now);
        let view = self.draft_view(&cfg.flow, &state.draft);

        let slot = Arc::new(SessionSlot {
            cancel_requested: AtomicBool::new(false),
            state: Mutex::new(state),
        });
        self.sessions.write().await.insert(user_id, slot);

        info!("user {} resumed pending entry #{}", user_id, entry_id);
        self.present_confirmation(view).await;
        Ok(Outcome::Resumed)
    }

    async fn park(
        &self,
        user_id: UserId,
        draft: DraftEntry,
        view: DraftView,
    ) -> Result<Outcome, FlowError> {
        self.sessions.write().await.remove(&user_id);

        let handle = match self.presenter.show_parked(view).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("presenter failed to render parked draft: {:#}", e);
                0
            }
        };

        info!("user {} parked draft #{}", user_id, draft.id);
        self.pending
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(PendingEntry {
                draft,
                handle,
                parked_at: Utc::now(),
            });
        Ok(Outcome::Parked)
    }

    async fn apply_value(
        &self,
        state: &mut ConversationState,
        flow: &[Field],
        max_errors: u32,
        text: &str,
    ) -> Result<Outcome, FlowError> {
        let field = match state.mode {
            Mode::Filling => flow[state.step],
            Mode::Editing(field) => field,
            Mode::Confirming => {
                self.notify(
                    state.user_id,
                    "Entry is complete. Confirm, edit a field, or cancel.",
                )
                .await;
                return Ok(Outcome::Rejected);
            }
        };

        match field.parse_input(text) {
            Ok(value) => {
                state.draft.set(field, value);
                state.errors = 0;
                match state.mode {
                    Mode::Editing(_) => {
                        state.mode = Mode::Confirming;
                        self.present_confirmation_for(state, flow).await;
                        Ok(Outcome::Confirming)
                    }
                    _ => self.advance(state, flow).await,
                }
            }
            Err(reason) => self.reject_input(state, max_errors, &reason).await,
        }
    }

    async fn apply_skip(
        &self,
        state: &mut ConversationState,
        flow: &[Field],
    ) -> Result<Outcome, FlowError> {
        match state.mode {
            // Skip advances without writing; a value kept from an earlier
            // visit stays in place.
            Mode::Filling => self.advance(state, flow).await,
            Mode::Editing(_) => {
                state.mode = Mode::Confirming;
                self.present_confirmation_for(state, flow).await;
                Ok(Outcome::Confirming)
            }
            Mode::Confirming => {
                self.notify(
                    state.user_id,
                    "Entry is complete. Confirm, edit a field, or cancel.",
                )
                .await;
                Ok(Outcome::Rejected)
            }
        }
    }

    async fn apply_back(
        &self,
        state: &mut ConversationState,
        flow: &[Field],
    ) -> Result<Outcome, FlowError> {
        match state.mode {
            Mode::Filling => {
                if let Some(prev) = state.nav_stack.pop() {
                    state.step = prev;
                }
                self.present_step(state).await;
                Ok(Outcome::Prompted)
            }
            Mode::Confirming => {
                state.mode = Mode::Filling;
                state.step = flow.len() - 1;
                self.present_step(state).await;
                Ok(Outcome::Prompted)
            }
            Mode::Editing(_) => {
                state.mode = Mode::Confirming;
                self.present_confirmation_for(state, flow).await;
                Ok(Outcome::Confirming)
            }
        }
    }

    async fn apply_confirm(&self, state: &mut ConversationState) -> Result<Outcome, FlowError> {
        if state.mode != Mode::Confirming {
            self.notify(state.user_id, "Finish the remaining steps first.")
                .await;
            return Ok(Outcome::Rejected);
        }

        let user_id = state.user_id;
        let entry = state.draft.clone().into_entry(Utc::now());
        let touched = state.draft.touched_fields();

        match self.store.add(entry).await {
            Ok(entry_id) => {
                self.sessions.write().await.remove(&user_id);
                self.cache.invalidate_user(user_id, &touched);
                info!("user {} committed entry #{}", user_id, entry_id);
                if let Err(e) = self.presenter.show_saved(entry_id).await {
                    warn!("presenter failed to confirm save: {:#}", e);
                }
                Ok(Outcome::Committed(entry_id))
            }
            Err(e) => {
                // State is kept so the user can retry without re-entering
                warn!("commit failed for user {}: {:#}", user_id, e);
                self.notify(user_id, "Could not save your entry. Try confirming again.")
                    .await;
                Err(FlowError::Store(e.to_string()))
            }
        }
    }

    async fn apply_edit(
        &self,
        state: &mut ConversationState,
        field: Field,
    ) -> Result<Outcome, FlowError> {
        if state.mode != Mode::Confirming {
            self.notify(state.user_id, "Editing is available from the preview.")
                .await;
            return Ok(Outcome::Rejected);
        }
        state.mode = Mode::Editing(field);
        self.present_step(state).await;
        Ok(Outcome::Prompted)
    }

    async fn advance(
        &self,
        state: &mut ConversationState,
        flow: &[Field],
    ) -> Result<Outcome, FlowError> {
        if state.step + 1 >= flow.len() {
            // The last step is not pushed; "back" from the preview re-enters
            // it directly
            state.mode = Mode::Confirming;
            self.present_confirmation_for(state, flow).await;
            Ok(Outcome::Confirming)
        } else {
            state.nav_stack.push(state.step);
            state.step += 1;
            self.present_step(state).await;
            Ok(Outcome::Prompted)
        }
    }

    async fn reject_input(
        &self,
        state: &mut ConversationState,
        max_errors: u32,
        reason: &str,
    ) -> Result<Outcome, FlowError> {
        state.errors += 1;
        if state.errors >= max_errors {
            let user_id = state.user_id;
            self.sessions.write().await.remove(&user_id);
            self.notify(user_id, "Too many invalid inputs. Entry cancelled.")
                .await;
            info!("user {} auto-cancelled after {} errors", user_id, state.errors);
            return Ok(Outcome::AutoCancelled);
        }
        self.notify(state.user_id, reason).await;
        self.present_step(state).await;
        Ok(Outcome::Reprompted)
    }

    /// Build and show the prompt for the current step (or the field being
    /// edited). Ranked options are truncated to top-N here, at the
    /// presentation boundary; the engine itself always ranks in full.
    async fn present_step(&self, state: &ConversationState) {
        let cfg = self.config.read().await.clone();
        let (field, step) = match state.mode {
            Mode::Editing(field) => (field, None),
            _ => (cfg.flow[state.step], Some(state.step + 1)),
        };

        // Only select-kind fields have candidates worth fetching
        let mut options = if field.kind().has_options() {
            self.cache
                .suggestions(state.user_id, field, &state.draft)
                .await
        } else {
            Vec::new()
        };
        options.truncate(cfg.top_n);

        let view = StepView {
            field,
            step,
            total: cfg.flow.len(),
            current: state.draft.get(field).cloned(),
            options,
        };
        if let Err(e) = self.presenter.show_step(view).await {
            warn!("presenter failed to render step: {:#}", e);
        }
    }

    async fn present_confirmation_for(&self, state: &ConversationState, flow: &[Field]) {
        let view = self.draft_view(flow, &state.draft);
        self.present_confirmation(view).await;
    }

    async fn present_confirmation(&self, view: DraftView) {
        if let Err(e) = self.presenter.show_confirmation(view).await {
            warn!("presenter failed to render preview: {:#}", e);
        }
    }

    fn draft_view(&self, flow: &[Field], draft: &DraftEntry) -> DraftView {
        let mut rows: Vec<(Field, Option<FieldValue>)> = flow
            .iter()
            .map(|&f| (f, draft.get(f).cloned()))
            .collect();
        for field in draft.touched_fields() {
            if !flow.contains(&field) {
                rows.push((field, draft.get(field).cloned()));
            }
        }
        DraftView {
            entry_id: draft.id,
            rows,
        }
    }

    async fn notify(&self, user_id: UserId, message: &str) {
        debug!("user {}: {}", user_id, message);
        if let Err(e) = self.presenter.show_error(message).await {
            warn!("presenter failed to deliver message: {:#}", e);
        }
    }
}
