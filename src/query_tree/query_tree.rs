use std::collections::HashMap;

use crate::{
    planner::{PlannerError, PlannerResult},
    query_tree::{
        ColumnNode, ConstantNode, FunctionNode, JoinKind, JoinNode, NodeId, QueryNode,
        QueryTreeNode, QueryTreeNodeType, TableNode, UnionMode, UnionNode,
    },
    types::{DataType, Literal, NameAndType, NamesAndTypes},
};

/// Functions whose right-hand argument, when a subquery, is evaluated as a set.
pub const IN_FUNCTION_NAMES: [&str; 4] = ["in", "notIn", "globalIn", "globalNotIn"];

/// Arena holding every node of one analyzed query tree.
///
/// Nodes are only ever appended, and a node may only reference nodes that are
/// already in the arena, so every reference points at a smaller id and the
/// tree is acyclic by construction. The arena outlives every planner context
/// built over it.
#[derive(Debug, Clone, Default)]
pub struct QueryTree {
    nodes: Vec<QueryTreeNode>,
}

impl QueryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Fails if it references a node that is not in the arena yet.
    pub fn add_node(&mut self, node: QueryTreeNode) -> PlannerResult<NodeId> {
        let next = self.nodes.len();
        if let Some(missing) = node.references().into_iter().find(|id| id.index() >= next) {
            return Err(PlannerError::UnknownNode { node: missing });
        }

        self.nodes.push(node);
        Ok(NodeId(next as u32))
    }

    pub fn get(&self, id: NodeId) -> Option<&QueryTreeNode> {
        self.nodes.get(id.index())
    }

    pub fn get_or_err(&self, id: NodeId) -> PlannerResult<&QueryTreeNode> {
        self.get(id).ok_or(PlannerError::UnknownNode { node: id })
    }

    pub fn node_type(&self, id: NodeId) -> PlannerResult<QueryTreeNodeType> {
        self.get_or_err(id).map(QueryTreeNode::node_type)
    }

    pub fn table(&mut self, storage_name: &str, columns: NamesAndTypes) -> NodeId {
        self.push_leaf(QueryTreeNode::Table(TableNode {
            storage_name: storage_name.to_string(),
            alias: None,
            columns,
            alias_columns: vec![],
        }))
    }

    pub fn table_with_alias(
        &mut self,
        storage_name: &str,
        alias: &str,
        columns: NamesAndTypes,
    ) -> NodeId {
        self.push_leaf(QueryTreeNode::Table(TableNode {
            storage_name: storage_name.to_string(),
            alias: Some(alias.to_string()),
            columns,
            alias_columns: vec![],
        }))
    }

    pub fn add_table(&mut self, table: TableNode) -> NodeId {
        self.push_leaf(QueryTreeNode::Table(table))
    }

    pub fn constant(&mut self, value: Literal) -> NodeId {
        let ty = value.data_type();
        self.push_leaf(QueryTreeNode::Constant(ConstantNode { value, ty }))
    }

    pub fn column(&mut self, name: &str, ty: DataType, source: NodeId) -> PlannerResult<NodeId> {
        self.add_node(QueryTreeNode::Column(ColumnNode { name: name.to_string(), ty, source }))
    }

    pub fn function(
        &mut self,
        name: &str,
        ty: DataType,
        arguments: Vec<NodeId>,
    ) -> PlannerResult<NodeId> {
        let name = name.to_string();
        self.add_node(QueryTreeNode::Function(FunctionNode { name, arguments, ty }))
    }

    pub fn query(&mut self, query: QueryNode) -> PlannerResult<NodeId> {
        self.add_node(QueryTreeNode::Query(query))
    }

    pub fn union(&mut self, queries: Vec<NodeId>, mode: UnionMode) -> PlannerResult<NodeId> {
        self.add_node(QueryTreeNode::Union(UnionNode { queries, mode, alias: None }))
    }

    pub fn join(
        &mut self,
        left: NodeId,
        right: NodeId,
        kind: JoinKind,
        on: Option<NodeId>,
    ) -> PlannerResult<NodeId> {
        self.add_node(QueryTreeNode::Join(JoinNode { left, right, kind, on }))
    }

    /// Name used when minting identifiers: the alias, else the node's own name.
    pub fn display_name(&self, id: NodeId) -> PlannerResult<String> {
        let node = self.get_or_err(id)?;
        if let Some(alias) = node.alias() {
            return Ok(alias.to_string());
        }

        let name = match node {
            QueryTreeNode::Table(t) => t.storage_name.clone(),
            QueryTreeNode::TableFunction(t) => t.name.clone(),
            QueryTreeNode::Query(_) => "_subquery".to_string(),
            QueryTreeNode::Union(_) => "_union".to_string(),
            QueryTreeNode::Join(_) => "_join".to_string(),
            QueryTreeNode::Column(c) => c.name.clone(),
            QueryTreeNode::Constant(c) => c.value.to_string(),
            QueryTreeNode::Function(f) => f.name.clone(),
        };
        Ok(name)
    }

    /// Columns a table expression exposes to its parent, in order.
    pub fn exposed_columns(&self, id: NodeId) -> PlannerResult<NamesAndTypes> {
        match self.get_or_err(id)? {
            QueryTreeNode::Table(t) => Ok(t.columns.clone()),
            QueryTreeNode::TableFunction(t) => Ok(t.columns.clone()),
            QueryTreeNode::Query(q) => {
                let mut exposed: NamesAndTypes = Vec::with_capacity(q.projection.len());
                for (position, item) in q.projection.iter().enumerate() {
                    let name = self.projection_name(*item, position, &exposed)?;
                    exposed.push(NameAndType::new(name, self.result_type(*item)?));
                }
                Ok(exposed)
            }
            QueryTreeNode::Union(u) => match u.queries.first() {
                Some(first) => self.exposed_columns(*first),
                None => Ok(vec![]),
            },
            other => Err(PlannerError::UnexpectedNodeType {
                node: id,
                expected: "table expression",
                actual: other.node_type(),
            }),
        }
    }

    /// Result type of an expression node.
    pub fn result_type(&self, id: NodeId) -> PlannerResult<DataType> {
        match self.get_or_err(id)? {
            QueryTreeNode::Column(c) => Ok(c.ty),
            QueryTreeNode::Constant(c) => Ok(c.ty),
            QueryTreeNode::Function(f) => Ok(f.ty),
            other => Err(PlannerError::UnexpectedNodeType {
                node: id,
                expected: "expression",
                actual: other.node_type(),
            }),
        }
    }

    /// Every node reachable from `root` through child links, in pre-order.
    pub fn subtree(&self, root: NodeId) -> PlannerResult<Vec<NodeId>> {
        let mut visited = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.get_or_err(id)?;
            visited.push(id);
            // reversed so the first child is visited first
            stack.extend(node.children().into_iter().rev());
        }

        Ok(visited)
    }

    /// Right-hand subquery of a membership predicate, if `id` is one.
    pub fn set_subquery_of(&self, id: NodeId) -> PlannerResult<Option<NodeId>> {
        let QueryTreeNode::Function(f) = self.get_or_err(id)? else {
            return Ok(None);
        };
        if !IN_FUNCTION_NAMES.contains(&f.name.as_str()) || f.arguments.len() != 2 {
            return Ok(None);
        }

        let rhs = f.arguments[1];
        let rhs_type = self.node_type(rhs)?;
        Ok(matches!(rhs_type, QueryTreeNodeType::Query | QueryTreeNodeType::Union).then_some(rhs))
    }

    /// Pre-order walk of `root` that does not enter membership predicate subqueries.
    /// Those are planned on their own, as set producers.
    pub fn scope_nodes(&self, root: NodeId) -> PlannerResult<Vec<NodeId>> {
        let mut visited = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.get_or_err(id)?;
            visited.push(id);

            let skip = self.set_subquery_of(id)?;
            stack.extend(node.children().into_iter().rev().filter(|child| Some(*child) != skip));
        }

        Ok(visited)
    }

    /// Copy the subtree under `root` into fresh nodes and return the new root.
    ///
    /// Column sources inside the subtree are redirected to the copies; sources
    /// outside it (correlated references) are kept.
    pub fn deep_clone(&mut self, root: NodeId) -> PlannerResult<NodeId> {
        let mut ids = self.subtree(root)?;
        ids.sort_unstable();
        ids.dedup();

        let base = self.nodes.len();
        let remap: HashMap<NodeId, NodeId> = ids
            .iter()
            .enumerate()
            .map(|(offset, old)| (*old, NodeId((base + offset) as u32)))
            .collect();

        for old in &ids {
            let copy = self.get_or_err(*old)?.map_ids(|id| remap.get(&id).copied().unwrap_or(id));
            self.add_node(copy)?;
        }

        remap.get(&root).copied().ok_or(PlannerError::UnknownNode { node: root })
    }

    /// Name a projection item exposes. A name taken by an earlier item is
    /// qualified with the column's source, and failing that with the position.
    fn projection_name(
        &self,
        item: NodeId,
        position: usize,
        taken: &[NameAndType],
    ) -> PlannerResult<String> {
        let is_taken = |name: &str| taken.iter().any(|column| column.name == name);

        let name = self.display_name(item)?;
        if !is_taken(&name) {
            return Ok(name);
        }

        if let QueryTreeNode::Column(column) = self.get_or_err(item)? {
            let qualified = format!("{}.{}", self.display_name(column.source)?, name);
            if !is_taken(&qualified) {
                return Ok(qualified);
            }
        }

        let mut positional = format!("{}_{}", name, position);
        while is_taken(&positional) {
            positional.push('_');
        }
        Ok(positional)
    }

    fn push_leaf(&mut self, node: QueryTreeNode) -> NodeId {
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }
}
