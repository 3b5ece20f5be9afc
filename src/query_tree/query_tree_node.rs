use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{query_tree::NodeId, types::{DataType, Literal, NamesAndTypes}};

/// Discriminator of a query tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryTreeNodeType {
    Table,
    TableFunction,
    Query,
    Union,
    Join,
    Column,
    Constant,
    Function,
}

impl fmt::Display for QueryTreeNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryTreeNodeType::Table => "TABLE",
            QueryTreeNodeType::TableFunction => "TABLE_FUNCTION",
            QueryTreeNodeType::Query => "QUERY",
            QueryTreeNodeType::Union => "UNION",
            QueryTreeNodeType::Join => "JOIN",
            QueryTreeNodeType::Column => "COLUMN",
            QueryTreeNodeType::Constant => "CONSTANT",
            QueryTreeNodeType::Function => "FUNCTION",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnionMode {
    All,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// Physical table read by the query.
#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    /// fully qualified storage name, e.g. `db.users`
    pub storage_name: String,
    pub alias: Option<String>,
    /// physical columns
    pub columns: NamesAndTypes,
    /// columns declared as `ALIAS <expr>` in the table definition
    pub alias_columns: NamesAndTypes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableFunctionNode {
    pub name: String,
    pub arguments: Vec<NodeId>,
    pub alias: Option<String>,
    pub columns: NamesAndTypes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub projection: Vec<NodeId>,
    pub join_tree: Option<NodeId>,
    pub where_clause: Option<NodeId>,
    pub alias: Option<String>,
}

impl QueryNode {
    pub fn new(projection: Vec<NodeId>) -> Self {
        Self { projection, join_tree: None, where_clause: None, alias: None }
    }

    pub fn from(mut self, join_tree: NodeId) -> Self {
        self.join_tree = Some(join_tree);
        self
    }

    pub fn filter(mut self, where_clause: NodeId) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionNode {
    pub queries: Vec<NodeId>,
    pub mode: UnionMode,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub left: NodeId,
    pub right: NodeId,
    pub kind: JoinKind,
    pub on: Option<NodeId>,
}

/// Reference to a column of some table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnNode {
    pub name: String,
    pub ty: DataType,
    /// table expression the column is read from
    pub source: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub value: Literal,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub arguments: Vec<NodeId>,
    pub ty: DataType,
}

/// One node of the analyzed query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTreeNode {
    Table(TableNode),
    TableFunction(TableFunctionNode),
    Query(QueryNode),
    Union(UnionNode),
    Join(JoinNode),
    Column(ColumnNode),
    Constant(ConstantNode),
    Function(FunctionNode),
}

impl QueryTreeNode {
    pub fn node_type(&self) -> QueryTreeNodeType {
        match self {
            QueryTreeNode::Table(_) => QueryTreeNodeType::Table,
            QueryTreeNode::TableFunction(_) => QueryTreeNodeType::TableFunction,
            QueryTreeNode::Query(_) => QueryTreeNodeType::Query,
            QueryTreeNode::Union(_) => QueryTreeNodeType::Union,
            QueryTreeNode::Join(_) => QueryTreeNodeType::Join,
            QueryTreeNode::Column(_) => QueryTreeNodeType::Column,
            QueryTreeNode::Constant(_) => QueryTreeNodeType::Constant,
            QueryTreeNode::Function(_) => QueryTreeNodeType::Function,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            QueryTreeNode::Table(t) => t.alias.as_deref(),
            QueryTreeNode::TableFunction(t) => t.alias.as_deref(),
            QueryTreeNode::Query(q) => q.alias.as_deref(),
            QueryTreeNode::Union(u) => u.alias.as_deref(),
            _ => None,
        }
    }

    /// Row sources: tables, table functions, subqueries and unions.
    pub fn is_table_expression(&self) -> bool {
        matches!(
            self,
            QueryTreeNode::Table(_)
                | QueryTreeNode::TableFunction(_)
                | QueryTreeNode::Query(_)
                | QueryTreeNode::Union(_)
        )
    }

    /// Child nodes in a fixed order. A column's source is a reference, not a child.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            QueryTreeNode::Table(_) | QueryTreeNode::Column(_) | QueryTreeNode::Constant(_) => {
                vec![]
            }
            QueryTreeNode::TableFunction(t) => t.arguments.clone(),
            QueryTreeNode::Query(q) => {
                let mut children = q.projection.clone();
                children.extend(q.join_tree);
                children.extend(q.where_clause);
                children
            }
            QueryTreeNode::Union(u) => u.queries.clone(),
            QueryTreeNode::Join(j) => {
                let mut children = vec![j.left, j.right];
                children.extend(j.on);
                children
            }
            QueryTreeNode::Function(f) => f.arguments.clone(),
        }
    }

    /// Ids this node points at: its children plus, for a column, its source.
    pub fn references(&self) -> Vec<NodeId> {
        match self {
            QueryTreeNode::Column(c) => vec![c.source],
            other => other.children(),
        }
    }

    /// Same node with every child id (and column source) passed through `remap`.
    pub fn map_ids(&self, remap: impl Fn(NodeId) -> NodeId) -> QueryTreeNode {
        match self {
            QueryTreeNode::Table(t) => QueryTreeNode::Table(t.clone()),
            QueryTreeNode::Constant(c) => QueryTreeNode::Constant(c.clone()),
            QueryTreeNode::TableFunction(t) => QueryTreeNode::TableFunction(TableFunctionNode {
                arguments: t.arguments.iter().map(|id| remap(*id)).collect(),
                ..t.clone()
            }),
            QueryTreeNode::Query(q) => QueryTreeNode::Query(QueryNode {
                projection: q.projection.iter().map(|id| remap(*id)).collect(),
                join_tree: q.join_tree.map(&remap),
                where_clause: q.where_clause.map(&remap),
                ..q.clone()
            }),
            QueryTreeNode::Union(u) => QueryTreeNode::Union(UnionNode {
                queries: u.queries.iter().map(|id| remap(*id)).collect(),
                ..u.clone()
            }),
            QueryTreeNode::Join(j) => QueryTreeNode::Join(JoinNode {
                left: remap(j.left),
                right: remap(j.right),
                kind: j.kind,
                on: j.on.map(&remap),
            }),
            QueryTreeNode::Column(c) => {
                QueryTreeNode::Column(ColumnNode { source: remap(c.source), ..c.clone() })
            }
            QueryTreeNode::Function(f) => QueryTreeNode::Function(FunctionNode {
                arguments: f.arguments.iter().map(|id| remap(*id)).collect(),
                ..f.clone()
            }),
        }
    }
}
