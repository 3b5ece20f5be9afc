use thiserror::Error;

use crate::{planner::SetKey, query_tree::{NodeId, QueryTreeNodeType}};

/// Planner-internal consistency violations.
///
/// None of these is a user error: each one means the analyzer produced a tree
/// the planner does not expect, or the planner visited nodes in an order its
/// own invariants do not allow. They abort planning of the whole query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("Column with name {name} already exists")]
    ColumnAlreadyExists { name: String },

    #[error("Column identifier for name {name} does not exist")]
    ColumnIdentifierNotFound { name: String },

    #[error("Column identifier for column node {node} does not exist")]
    ColumnNodeIdentifierNotFound { node: NodeId },

    #[error("Table expression {node} has no registered columns")]
    TableExpressionNotFound { node: NodeId },

    #[error("No set is registered for key {key}")]
    SetNotFound { key: SetKey },

    #[error("Set for key {key} is already registered")]
    SetAlreadyRegistered { key: SetKey },

    #[error("Set for key {key} must be created before its subquery node is registered")]
    SetNotCreated { key: SetKey },

    #[error("Subquery node {node} for set {key} must have QUERY or UNION type, got {actual}")]
    InvalidSubqueryNodeForSet { key: SetKey, node: NodeId, actual: QueryTreeNodeType },

    #[error("Set row has {actual} values, expected {expected}")]
    SetArityMismatch { expected: usize, actual: usize },

    #[error("Node {node} does not exist in query tree")]
    UnknownNode { node: NodeId },

    #[error("Expected {expected} at node {node}, got {actual}")]
    UnexpectedNodeType { node: NodeId, expected: &'static str, actual: QueryTreeNodeType },
}

impl PlannerError {
    /// Error class reported to the caller. Every planner error is a logical error.
    pub fn code(&self) -> &'static str {
        "LOGICAL_ERROR"
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
