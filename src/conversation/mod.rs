pub mod engine;
pub mod state;

pub use engine::{ConversationEngine, Outcome};
pub use state::{ConversationState, Mode, PendingEntry};
