pub mod console;

pub use console::ConsolePresenter;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EntryId, Field, FieldOption, FieldValue};

/// One user action delivered to the conversation engine. Every inbound
/// gesture, typed text or a button press, maps to one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Free-text value for the current step.
    Input(String),
    /// Pick one of the ranked options by its text.
    Pick(String),
    Back,
    Skip,
    Cancel,
    Confirm,
    Edit(Field),
    /// Park the draft for later resumption.
    Park,
    Resume(EntryId),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Input(_) => "input",
            Action::Pick(_) => "pick",
            Action::Back => "back",
            Action::Skip => "skip",
            Action::Cancel => "cancel",
            Action::Confirm => "confirm",
            Action::Edit(_) => "edit",
            Action::Park => "park",
            Action::Resume(_) => "resume",
        }
    }
}

/// Screen data for one step prompt. Options are already truncated to the
/// configured top-N; the full ranking never leaves the engine.
#[derive(Debug, Clone)]
pub struct StepView {
    pub field: Field,
    /// 1-based step position, or `None` when editing from the preview.
    pub step: Option<usize>,
    pub total: usize,
    pub current: Option<FieldValue>,
    pub options: Vec<FieldOption>,
}

/// Accumulated draft preview shown at the confirmation screen.
#[derive(Debug, Clone)]
pub struct DraftView {
    pub entry_id: EntryId,
    pub rows: Vec<(Field, Option<FieldValue>)>,
}

/// Outbound rendering seam. The engine only hands over structured data;
/// markup and layout belong to the transport.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn show_step(&self, view: StepView) -> Result<()>;
    async fn show_confirmation(&self, view: DraftView) -> Result<()>;
    async fn show_error(&self, message: &str) -> Result<()>;
    /// Entry saved durably.
    async fn show_saved(&self, entry_id: EntryId) -> Result<()>;
    /// Draft parked; returns the presentation handle used to re-render it.
    async fn show_parked(&self, view: DraftView) -> Result<i64>;
}
