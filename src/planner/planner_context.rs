use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    planner::{
        ColumnIdentifier, GlobalPlannerContext, GlobalPlannerContextPtr, PlannerError, PlannerOutput,
        PlannerResult, QueryContextPtr, TableExpressionColumns,
    },
    query_tree::{NodeId, QueryTree, QueryTreeNode},
};

pub type TableExpressionNodeToColumns = IndexMap<NodeId, TableExpressionColumns>;
pub type ColumnNodeToColumnIdentifier = IndexMap<NodeId, ColumnIdentifier>;

/// Lifecycle of a planner context. Sealing consumes the context, see [`PlannerContext::seal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerContextState {
    Empty,
    Populating,
}

/// Per-compilation symbol registry, filled during the single walk over the
/// query tree.
///
/// It is the only place column identifiers are minted. A context created for a
/// correlated subquery shares the parent's [`GlobalPlannerContext`], gets its
/// own scope number from it, and embeds that number in its identifiers, so
/// identifiers stay unique across every context of the query.
#[derive(Debug)]
pub struct PlannerContext {
    /// Query context
    query_context: QueryContextPtr,

    /// Global planner context
    global_planner_context: GlobalPlannerContextPtr,

    /// Column node to column identifier
    column_node_to_column_identifier: ColumnNodeToColumnIdentifier,

    /// Table expression node to columns
    table_expression_node_to_columns: TableExpressionNodeToColumns,

    /// Registries of the enclosing scopes, read-only
    outer_table_expression_node_to_columns: TableExpressionNodeToColumns,

    scope: usize,

    column_identifier_counter: usize,
}

impl PlannerContext {
    pub fn new(
        query_context: QueryContextPtr,
        global_planner_context: GlobalPlannerContextPtr,
    ) -> Self {
        let scope = global_planner_context.borrow_mut().allocate_scope();
        debug!(query_id = %query_context.query_id(), scope, "create planner context");

        Self {
            query_context,
            global_planner_context,
            column_node_to_column_identifier: IndexMap::new(),
            table_expression_node_to_columns: IndexMap::new(),
            outer_table_expression_node_to_columns: IndexMap::new(),
            scope,
            column_identifier_counter: 0,
        }
    }

    /// Context of a top-level compilation, with a fresh global context.
    pub fn for_query(query_context: QueryContextPtr) -> Self {
        let global = GlobalPlannerContext::new(query_context.settings()).into_shared();
        Self::new(query_context, global)
    }

    /// Context for a subquery compiled on its own, sharing this context's global context.
    ///
    /// The child sees the registries of this context and of every enclosing
    /// one, as they are now, so correlated column references bind to the
    /// identifiers already minted for them.
    pub fn child(&self) -> Self {
        let mut outer = self.outer_table_expression_node_to_columns.clone();
        for (node, columns) in &self.table_expression_node_to_columns {
            outer.insert(*node, columns.clone());
        }

        let mut child = Self::new(self.query_context.clone(), self.global_planner_context.clone());
        child.outer_table_expression_node_to_columns = outer;
        child
    }

    pub fn get_query_context(&self) -> &QueryContextPtr {
        &self.query_context
    }

    pub fn get_global_planner_context(&self) -> &GlobalPlannerContextPtr {
        &self.global_planner_context
    }

    pub fn get_global_planner_context_mut(&mut self) -> &mut GlobalPlannerContextPtr {
        &mut self.global_planner_context
    }

    pub fn get_table_expression_node_to_columns(&self) -> &TableExpressionNodeToColumns {
        &self.table_expression_node_to_columns
    }

    pub fn get_table_expression_node_to_columns_mut(
        &mut self,
    ) -> &mut TableExpressionNodeToColumns {
        &mut self.table_expression_node_to_columns
    }

    /// Registry of a table expression, created on first visit.
    pub fn get_or_create_table_expression_columns(
        &mut self,
        table_expression_node: NodeId,
    ) -> &mut TableExpressionColumns {
        self.table_expression_node_to_columns.entry(table_expression_node).or_default()
    }

    pub fn get_table_expression_columns_or_err(
        &self,
        table_expression_node: NodeId,
    ) -> PlannerResult<&TableExpressionColumns> {
        self.table_expression_node_to_columns
            .get(&table_expression_node)
            .ok_or(PlannerError::TableExpressionNotFound { node: table_expression_node })
    }

    /// Registry of a table expression owned by an enclosing scope, `None` if
    /// the node is not registered there.
    pub fn get_outer_table_expression_columns_or_null(
        &self,
        table_expression_node: NodeId,
    ) -> Option<&TableExpressionColumns> {
        self.outer_table_expression_node_to_columns.get(&table_expression_node)
    }

    pub fn scope(&self) -> usize {
        self.scope
    }

    /// Mint a new column identifier. No two calls on contexts sharing a
    /// global context return the same value.
    ///
    /// Layout: `<prefix><counter>_<source>_<name>`, where a nested scope writes
    /// `<scope>.<counter>` instead of `<counter>`. `<source>` is the source
    /// node's alias or name and is left out when the settings say so. An empty
    /// `column_name` is replaced by the source node's own name, or by the
    /// column's name when the source is a column node.
    pub fn get_column_unique_identifier(
        &mut self,
        tree: &QueryTree,
        column_source_node: NodeId,
        column_name: &str,
    ) -> PlannerResult<ColumnIdentifier> {
        let source_name = tree.display_name(column_source_node)?;
        let column_name = if column_name.is_empty() {
            match tree.get_or_err(column_source_node)? {
                QueryTreeNode::Column(c) => c.name.clone(),
                _ => source_name.clone(),
            }
        } else {
            column_name.to_string()
        };

        let settings = self.query_context.settings();
        let mut identifier = settings.column_identifier_prefix.clone();
        if self.scope > 0 {
            identifier.push_str(&format!("{}.", self.scope));
        }
        identifier.push_str(&self.column_identifier_counter.to_string());
        self.column_identifier_counter += 1;

        if settings.include_source_in_identifier {
            identifier.push('_');
            identifier.push_str(&source_name);
        }
        identifier.push('_');
        identifier.push_str(&column_name);

        trace!(source = %column_source_node, identifier = %identifier, "mint column identifier");
        Ok(identifier)
    }

    /// Record the identifier of a column node. The first registration of a node wins.
    pub fn register_column_node(&mut self, column_node: NodeId, column_identifier: &str) {
        trace!(node = %column_node, identifier = %column_identifier, "register column node");
        self.column_node_to_column_identifier
            .entry(column_node)
            .or_insert_with(|| column_identifier.to_string());
    }

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

    pub fn get_column_node_to_column_identifier(&self) -> &ColumnNodeToColumnIdentifier {
        &self.column_node_to_column_identifier
    }

    pub fn state(&self) -> PlannerContextState {
        let untouched = self.column_identifier_counter == 0
            && self.column_node_to_column_identifier.is_empty()
            && self.table_expression_node_to_columns.is_empty();
        if untouched { PlannerContextState::Empty } else { PlannerContextState::Populating }
    }

    /// Hand the registries to the plan builder. The context cannot be mutated afterwards.
    pub fn seal(self) -> PlannerOutput {
        let global = self.global_planner_context.borrow();
        debug!(
            query_id = %self.query_context.query_id(),
            scope = self.scope,
            table_expressions = self.table_expression_node_to_columns.len(),
            column_nodes = self.column_node_to_column_identifier.len(),
            sets = global.get_subquery_nodes_for_sets().len(),
            "seal planner context"
        );

        PlannerOutput {
            query_id: self.query_context.query_id().to_string(),
            scope: self.scope,
            table_expression_node_to_columns: self.table_expression_node_to_columns,
            column_node_to_column_identifier: self.column_node_to_column_identifier,
            subquery_nodes_for_sets: global.get_subquery_nodes_for_sets().clone(),
        }
    }
}
