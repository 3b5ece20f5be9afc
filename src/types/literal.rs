use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::types::DataType;

/// Constant value carried by constant nodes and stored in sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(NotNan<f64>),
    Bool(bool),
    Null,
}

impl Literal {
    /// Natural type of the literal when the analyzer gave none.
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::String(_) => DataType::String,
            Literal::Int(_) => DataType::Int64,
            Literal::Float(_) => DataType::Float64,
            Literal::Bool(_) => DataType::Bool,
            Literal::Null => DataType::Nothing,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(n) => write!(f, "{:?}", n.into_inner()),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "NULL"),
        }
    }
}
