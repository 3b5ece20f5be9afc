use serde::{Deserialize, Serialize};

/// What `register_set` does when the key already has a set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateSetPolicy {
    /// Keep the first set, ignore the second registration (default).
    #[default]
    Idempotent,
    /// Treat a second registration as a logical error.
    Strict,
}

/// Planner settings read from the query context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub column_identifier_prefix: String,
    pub set_key_prefix: String,
    pub duplicate_set_policy: DuplicateSetPolicy,
    /// embed the source table expression name in minted column identifiers
    pub include_source_in_identifier: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            column_identifier_prefix: "__column_".to_string(),
            set_key_prefix: "__set_".to_string(),
            duplicate_set_policy: DuplicateSetPolicy::default(),
            include_source_in_identifier: true,
        }
    }
}

impl PlannerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { duplicate_set_policy: DuplicateSetPolicy::Strict, ..Self::default() }
    }

    pub fn with_column_identifier_prefix(mut self, prefix: &str) -> Self {
        self.column_identifier_prefix = prefix.to_string();
        self
    }

    pub fn with_set_key_prefix(mut self, prefix: &str) -> Self {
        self.set_key_prefix = prefix.to_string();
        self
    }

    pub fn with_source_in_identifier(mut self, include: bool) -> Self {
        self.include_source_in_identifier = include;
        self
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
