use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::models::{EntryId, Field};
use crate::transport::{Action, DraftView, Presenter, StepView};

/// What one console line asks for, after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Act(Action),
    New,
    Pending,
    Clear,
    Stats,
    Undo,
    Help,
    Quit,
}

/// Parse a console line into a command. Bare text is a value for the
/// current step; `#3` picks the third displayed option.
pub fn parse_line(line: &str, last_options: &[String]) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix('#') {
        let index: usize = rest.trim().parse().ok()?;
        let value = last_options.get(index.checked_sub(1)?)?;
        return Some(Command::Act(Action::Pick(value.clone())));
    }

    if !line.starts_with('/') {
        return Some(Command::Act(Action::Input(line.to_string())));
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next().unwrap_or("").trim();

    match cmd {
        "/new" | "/start" => Some(Command::New),
        "/back" => Some(Command::Act(Action::Back)),
        "/skip" => Some(Command::Act(Action::Skip)),
        "/cancel" => Some(Command::Act(Action::Cancel)),
        "/done" | "/confirm" => Some(Command::Act(Action::Confirm)),
        "/edit" => Field::from_str_loose(arg).map(|f| Command::Act(Action::Edit(f))),
        "/later" | "/park" => Some(Command::Act(Action::Park)),
        "/resume" => arg
            .parse::<EntryId>()
            .ok()
            .map(|id| Command::Act(Action::Resume(id))),
        "/pending" => Some(Command::Pending),
        "/clear" => Some(Command::Clear),
        "/stats" => Some(Command::Stats),
        "/undo" => Some(Command::Undo),
        "/help" => Some(Command::Help),
        "/quit" | "/exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Renders engine screens as plain text and remembers the last displayed
/// option list so `#k` picks can be resolved.
pub struct ConsolePresenter {
    last_options: Mutex<Vec<String>>,
    next_handle: AtomicI64,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            last_options: Mutex::new(Vec::new()),
            next_handle: AtomicI64::new(1),
        }
    }

    pub fn last_options(&self) -> Vec<String> {
        self.last_options.lock().unwrap().clone()
    }

    fn render_draft(view: &DraftView) -> String {
        let mut out = format!("--- Entry draft #{} ---\n", view.entry_id);
        for (field, value) in &view.rows {
            let shown = value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!("  {:<12} {}\n", field.label(), shown));
        }
        out.push_str("/done to save, /edit <field>, /later, /cancel");
        out
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn show_step(&self, view: StepView) -> Result<()> {
        let position = match view.step {
            Some(step) => format!("[{}/{}] ", step, view.total),
            None => "[edit] ".to_string(),
        };
        println!("{}{}:", position, view.field.label());

        if let Some(current) = &view.current {
            println!("  current: {}", current);
        }
        for (i, option) in view.options.iter().enumerate() {
            let marker = if option.context { "*" } else { " " };
            println!("  #{}{} {}", i + 1, marker, option.value);
        }

        *self.last_options.lock().unwrap() =
            view.options.iter().map(|o| o.value.clone()).collect();
        Ok(())
    }

    async fn show_confirmation(&self, view: DraftView) -> Result<()> {
        println!("{}", Self::render_draft(&view));
        self.last_options.lock().unwrap().clear();
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<()> {
        println!("! {}", message);
        Ok(())
    }

    async fn show_saved(&self, entry_id: EntryId) -> Result<()> {
        println!("Saved journal entry #{}", entry_id);
        Ok(())
    }

    async fn show_parked(&self, view: DraftView) -> Result<i64> {
        println!(
            "Parked draft #{} ({} fields). /pending to list, /resume {} to continue.",
            view.entry_id,
            view.rows.iter().filter(|(_, v)| v.is_some()).count(),
            view.entry_id
        );
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_text_is_input() {
        assert_eq!(
            parse_line("BTC-USD", &[]),
            Some(Command::Act(Action::Input("BTC-USD".to_string())))
        );
    }

    #[test]
    fn hash_index_resolves_against_last_options() {
        let options = vec!["Long".to_string(), "Short".to_string()];
        assert_eq!(
            parse_line("#2", &options),
            Some(Command::Act(Action::Pick("Short".to_string())))
        );
        assert_eq!(parse_line("#3", &options), None);
        assert_eq!(parse_line("#0", &options), None);
    }

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_line("/new", &[]), Some(Command::New));
        assert_eq!(
            parse_line("/edit sl", &[]),
            Some(Command::Act(Action::Edit(Field::StopLoss)))
        );
        assert_eq!(
            parse_line("/resume 12", &[]),
            Some(Command::Act(Action::Resume(12)))
        );
        assert_eq!(parse_line("/edit bogus", &[]), None);
        assert_eq!(parse_line("/unknown", &[]), None);
    }
}
