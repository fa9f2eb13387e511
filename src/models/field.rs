use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::FieldValue;

/// A journal field collected by the entry flow or editable from the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Ticker,
    Direction,
    Pnl,
    Open,
    Close,
    #[serde(rename = "sl")]
    StopLoss,
    #[serde(rename = "tp")]
    TakeProfit,
    Volume,
    Comment,
    Account,
    Session,
    Setup,
    Emotions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Decimal,
    Select,
    MultiSelect,
}

impl FieldKind {
    /// Kinds whose candidate values come from the schema source.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::MultiSelect)
    }
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::Ticker,
        Field::Direction,
        Field::Pnl,
        Field::Open,
        Field::Close,
        Field::StopLoss,
        Field::TakeProfit,
        Field::Volume,
        Field::Comment,
        Field::Account,
        Field::Session,
        Field::Setup,
        Field::Emotions,
    ];

    /// The ordered steps of the default entry flow.
    pub const DEFAULT_FLOW: &'static [Field] = &[
        Field::Ticker,
        Field::Direction,
        Field::Pnl,
        Field::Open,
        Field::Close,
        Field::StopLoss,
        Field::TakeProfit,
        Field::Volume,
        Field::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Ticker => "ticker",
            Field::Direction => "direction",
            Field::Pnl => "pnl",
            Field::Open => "open",
            Field::Close => "close",
            Field::StopLoss => "sl",
            Field::TakeProfit => "tp",
            Field::Volume => "volume",
            Field::Comment => "comment",
            Field::Account => "account",
            Field::Session => "session",
            Field::Setup => "setup",
            Field::Emotions => "emotions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Ticker => "Ticker",
            Field::Direction => "Direction",
            Field::Pnl => "PnL",
            Field::Open => "Open price",
            Field::Close => "Close price",
            Field::StopLoss => "Stop loss",
            Field::TakeProfit => "Take profit",
            Field::Volume => "Volume",
            Field::Comment => "Comment",
            Field::Account => "Account",
            Field::Session => "Session",
            Field::Setup => "Setup",
            Field::Emotions => "Emotions",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Field> {
        match s.trim().to_lowercase().as_str() {
            "ticker" => Some(Field::Ticker),
            "direction" => Some(Field::Direction),
            "pnl" => Some(Field::Pnl),
            "open" => Some(Field::Open),
            "close" => Some(Field::Close),
            "sl" | "stop" | "stop_loss" => Some(Field::StopLoss),
            "tp" | "target" | "take_profit" => Some(Field::TakeProfit),
            "volume" => Some(Field::Volume),
            "comment" => Some(Field::Comment),
            "account" => Some(Field::Account),
            "session" => Some(Field::Session),
            "setup" => Some(Field::Setup),
            "emotions" => Some(Field::Emotions),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Ticker | Field::Direction | Field::Account | Field::Session | Field::Setup => {
                FieldKind::Select
            }
            Field::Pnl
            | Field::Open
            | Field::Close
            | Field::StopLoss
            | Field::TakeProfit
            | Field::Volume => FieldKind::Decimal,
            Field::Comment => FieldKind::Text,
            Field::Emotions => FieldKind::MultiSelect,
        }
    }

    /// Parse raw user input into a value for this field.
    ///
    /// Decimal fields accept a comma decimal separator ("1,5"). Multi-select
    /// fields split on commas, one element per selection.
    pub fn parse_input(&self, raw: &str) -> Result<FieldValue, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(format!("{} cannot be empty", self.label()));
        }
        match self.kind() {
            FieldKind::Decimal => raw
                .replace(',', ".")
                .parse::<f64>()
                .map(FieldValue::Decimal)
                .map_err(|_| format!("{} must be a number, got \"{}\"", self.label(), raw)),
            FieldKind::Text | FieldKind::Select => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::MultiSelect => {
                let items: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if items.is_empty() {
                    Err(format!("{} cannot be empty", self.label()))
                } else {
                    Ok(FieldValue::List(items))
                }
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_accepts_comma_separator() {
        assert_eq!(
            Field::Pnl.parse_input("12,5").unwrap(),
            FieldValue::Decimal(12.5)
        );
        assert_eq!(
            Field::Open.parse_input(" 40100.25 ").unwrap(),
            FieldValue::Decimal(40100.25)
        );
    }

    #[test]
    fn parse_decimal_rejects_text() {
        let err = Field::Pnl.parse_input("lots").unwrap_err();
        assert!(err.contains("must be a number"), "{}", err);
    }

    #[test]
    fn parse_multi_select_splits_on_commas() {
        assert_eq!(
            Field::Emotions.parse_input("calm, confident , ").unwrap(),
            FieldValue::List(vec!["calm".to_string(), "confident".to_string()])
        );
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert!(Field::Comment.parse_input("   ").is_err());
        assert!(Field::Emotions.parse_input(" , ,").is_err());
    }

    #[test]
    fn field_names_round_trip() {
        for &field in Field::ALL {
            assert_eq!(Field::from_str_loose(field.as_str()), Some(field));
        }
    }

    #[test]
    fn default_flow_has_nine_steps() {
        assert_eq!(Field::DEFAULT_FLOW.len(), 9);
        assert_eq!(Field::DEFAULT_FLOW[0], Field::Ticker);
        assert_eq!(Field::DEFAULT_FLOW[8], Field::Comment);
    }
}
