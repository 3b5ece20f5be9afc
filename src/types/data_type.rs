use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved type of a column or constant, as produced by the analyzer.
///
/// The planner never infers types. It carries them so the registries can
/// report `(name, type)` pairs and so the structural form of a subquery tells
/// `x: Int64` from `x: String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the `NULL` literal
    Nothing,
    Bool,
    Int64,
    Float64,
    String,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Nothing => "Nothing",
            DataType::Bool => "Bool",
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::String => "String",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
