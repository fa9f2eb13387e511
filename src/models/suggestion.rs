/// One ranked candidate value for a field, with the score components that
/// produced its position. Recomputed per ranking pass, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOption {
    pub value: String,
    /// Recency-weighted frequency from the user's own history.
    pub personal: f64,
    /// Flat cross-user popularity.
    pub global: f64,
    /// Whether the value came from the schema source (vs built-in defaults).
    pub in_schema: bool,
    /// Set when the value matches the draft's current value for the field.
    pub context: bool,
}

impl FieldOption {
    pub fn combined(&self) -> f64 {
        self.personal + self.global
    }
}
