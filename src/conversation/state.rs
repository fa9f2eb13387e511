use chrono::{DateTime, Duration, Utc};

use crate::models::{DraftEntry, Field, UserId};

/// Where the flow currently stands for one user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Walking the ordered steps.
    Filling,
    /// Full preview shown, awaiting confirm / edit / cancel.
    Confirming,
    /// Single-field update from the preview.
    Editing(Field),
}

/// Per-user conversation state. One non-terminal state per user at a time;
/// access is serialized by the engine's per-user lock.
#[derive(Debug)]
pub struct ConversationState {
    pub user_id: UserId,
    pub draft: DraftEntry,
    /// 0-based index into the configured flow.
    pub step: usize,
    /// Visited step indices, for "back".
    pub nav_stack: Vec<usize>,
    pub mode: Mode,
    pub errors: u32,
    pub last_input: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(user_id: UserId, draft: DraftEntry, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            draft,
            step: 0,
            nav_stack: Vec::new(),
            mode: Mode::Filling,
            errors: 0,
            last_input: now,
            created_at: now,
        }
    }

    /// Re-open a parked draft directly at the preview.
    pub fn resumed(user_id: UserId, draft: DraftEntry, total_steps: usize, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            draft,
            step: total_steps.saturating_sub(1),
            nav_stack: (0..total_steps.saturating_sub(1)).collect(),
            mode: Mode::Confirming,
            errors: 0,
            last_input: now,
            created_at: now,
        }
    }

    pub fn expired(&self, idle_threshold: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_input > idle_threshold
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_input = now;
    }
}

/// A draft set aside mid-flow, resumable later. Distinct from the single
/// active conversation: a draft is either here or in the flow, never both.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub draft: DraftEntry,
    /// Presentation handle for re-rendering (e.g. a message id).
    pub handle: i64,
    pub parked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_past_the_threshold() {
        let now = Utc::now();
        let draft = DraftEntry::new(1, 7, now);
        let mut state = ConversationState::new(7, draft, now);

        assert!(!state.expired(Duration::minutes(30), now));
        state.last_input = now - Duration::minutes(31);
        assert!(state.expired(Duration::minutes(30), now));
        state.last_input = now - Duration::minutes(30);
        assert!(!state.expired(Duration::minutes(30), now));
    }

    #[test]
    fn resumed_state_lands_on_preview() {
        let now = Utc::now();
        let draft = DraftEntry::new(3, 7, now);
        let state = ConversationState::resumed(7, draft, 9, now);
        assert_eq!(state.mode, Mode::Confirming);
        assert_eq!(state.step, 8);
    }
}
