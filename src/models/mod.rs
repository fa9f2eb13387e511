pub mod entry;
pub mod field;
pub mod suggestion;

pub use entry::{DraftEntry, Entry, EntryId, FieldValue, UserId};
pub use field::{Field, FieldKind};
pub use suggestion::FieldOption;
