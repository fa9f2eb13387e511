use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::models::Field;

pub type UserId = i64;
pub type EntryId = u64;

/// A single field value on a draft or committed entry.
///
/// Untagged: decimals serialize as JSON numbers, text as strings, list
/// fields as string arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Decimal(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Text forms this value contributes to history scoring. List values
    /// contribute once per element.
    pub fn members(&self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => vec![s.clone()],
            FieldValue::Decimal(d) => vec![format_decimal(*d)],
            FieldValue::List(items) => items.clone(),
        }
    }

    /// True when `candidate` equals this value or one of its list members.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            FieldValue::Text(s) => s == candidate,
            FieldValue::Decimal(d) => format_decimal(*d) == candidate,
            FieldValue::List(items) => items.iter().any(|i| i == candidate),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Decimal(d) => write!(f, "{}", format_decimal(*d)),
            FieldValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

fn format_decimal(d: f64) -> String {
    // Trim trailing zeros so 12.50 and 12.5 read the same
    let s = format!("{:.8}", d);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// The trade being composed by the conversation flow. Mutated field by
/// field; committed into an [`Entry`] or discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub values: HashMap<Field, FieldValue>,
    pub created_at: DateTime<Utc>,
}

impl DraftEntry {
    pub fn new(id: EntryId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            values: HashMap::new(),
            created_at: now,
        }
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    /// Fields that carry a value, in declaration order.
    pub fn touched_fields(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.values.contains_key(f))
            .collect()
    }

    pub fn into_entry(self, committed_at: DateTime<Utc>) -> Entry {
        Entry {
            id: self.id,
            user_id: self.user_id,
            values: self.values,
            committed_at,
        }
    }

    /// One-line summary for pending-entry listings.
    pub fn summary(&self) -> String {
        let ticker = self
            .get(Field::Ticker)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        let direction = self
            .get(Field::Direction)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("{} {} ({} fields)", ticker, direction, self.values.len())
    }
}

/// A committed journal entry as stored and returned by the trade store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub values: HashMap<Field, FieldValue>,
    pub committed_at: DateTime<Utc>,
}

impl Entry {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Text forms of this entry's value for `field`, one per list element.
    pub fn values_for(&self, field: Field) -> Vec<String> {
        self.values
            .get(&field)
            .map(|v| v.members())
            .unwrap_or_default()
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let days = (now - self.committed_at).num_seconds() as f64 / 86_400.0;
        days.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn field_value_members_expand_lists() {
        let v = FieldValue::List(vec!["calm".into(), "fomo".into()]);
        assert_eq!(v.members(), vec!["calm".to_string(), "fomo".to_string()]);
        assert!(v.matches("fomo"));
        assert!(!v.matches("greedy"));
    }

    #[test]
    fn decimal_display_trims_zeros() {
        assert_eq!(FieldValue::Decimal(12.50).to_string(), "12.5");
        assert_eq!(FieldValue::Decimal(40000.0).to_string(), "40000");
    }

    #[test]
    fn field_value_json_shapes() {
        let text: FieldValue = serde_json::from_str("\"BTC-USD\"").unwrap();
        assert_eq!(text, FieldValue::Text("BTC-USD".into()));
        let num: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(num, FieldValue::Decimal(12.5));
        let list: FieldValue = serde_json::from_str("[\"calm\"]").unwrap();
        assert_eq!(list, FieldValue::List(vec!["calm".into()]));
    }

    #[test]
    fn entry_age_has_floor_of_one_day() {
        let now = Utc::now();
        let entry = Entry {
            id: 1,
            user_id: 7,
            values: HashMap::new(),
            committed_at: now - Duration::hours(2),
        };
        assert_eq!(entry.age_days(now), 1.0);

        let old = Entry {
            committed_at: now - Duration::days(10),
            ..entry
        };
        assert!((old.age_days(now) - 10.0).abs() < 0.01);
    }
}
