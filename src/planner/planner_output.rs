use serde::Serialize;

use crate::{
    planner::{
        ColumnIdentifier, ColumnNodeToColumnIdentifier, PlannerError, PlannerResult,
        SetKeyToSubqueryNode, TableExpressionColumns, TableExpressionNodeToColumns,
    },
    query_tree::NodeId,
};

/// Registries of a sealed planner context, as consumed by the plan builder.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerOutput {
    pub query_id: String,
    pub scope: usize,
    pub table_expression_node_to_columns: TableExpressionNodeToColumns,
    pub column_node_to_column_identifier: ColumnNodeToColumnIdentifier,
    /// snapshot of the global set producers at sealing time
    pub subquery_nodes_for_sets: SetKeyToSubqueryNode,
}

impl PlannerOutput {
    pub fn get_column_node_identifier_or_err(
        &self,
        column_node: NodeId,
    ) -> PlannerResult<&ColumnIdentifier> {
        self.column_node_to_column_identifier
            .get(&column_node)
            .ok_or(PlannerError::ColumnNodeIdentifierNotFound { node: column_node })
    }

    pub fn get_column_node_identifier_or_null(
        &self,
        column_node: NodeId,
    ) -> Option<&ColumnIdentifier> {
        self.column_node_to_column_identifier.get(&column_node)
    }

    pub fn get_table_expression_columns_or_err(
        &self,
        table_expression_node: NodeId,
    ) -> PlannerResult<&TableExpressionColumns> {
        self.table_expression_node_to_columns
            .get(&table_expression_node)
            .ok_or(PlannerError::TableExpressionNotFound { node: table_expression_node })
    }

    /// Debug dump of the registries.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
