use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A column exposed by a table expression: its name and resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameAndType {
    pub name: String,
    pub ty: DataType,
}

impl NameAndType {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Ordered list of columns; insertion order is significant for projection matching.
pub type NamesAndTypes = Vec<NameAndType>;
