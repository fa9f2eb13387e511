use crate::models::EntryId;

/// Typed failures surfaced by the conversation engine.
///
/// User-recoverable conditions (busy guard, idle expiry, invalid input)
/// are reported as [`crate::conversation::Outcome`] variants instead;
/// these are the failures a caller may want to log or act on.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("no active journal entry")]
    NoActiveEntry,

    #[error("an entry is already being composed")]
    AlreadyActive,

    #[error("no pending entry with id {0}")]
    UnknownPending(EntryId),

    #[error("failed to save entry: {0}")]
    Store(String),
}
