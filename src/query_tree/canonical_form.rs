use std::collections::HashMap;

use crate::{
    planner::PlannerResult,
    query_tree::{NodeId, QueryTree, QueryTreeNode, QueryTreeNodeType},
};

/// Deterministic structural serialization of the subtree under `root`.
///
/// Two subtrees get the same form exactly when they describe the same
/// computation, wherever they sit in the arena:
///
/// - aliases are left out, they never change the rows produced;
/// - table expressions inside the subtree are numbered `$0, $1, ...` in
///   pre-order, and a column reading one of them prints that ordinal, so a
///   self-join inside the subtree keeps its two sides apart;
/// - a column reading a table expression outside the subtree (a correlated
///   reference) prints the source node identity `#id`, so correlated subqueries
///   over different outer sources never share a form;
/// - names are back-quoted and literals are typed and escaped, so no name or
///   value can imitate the surrounding structure.
pub fn canonical_form(tree: &QueryTree, root: NodeId) -> PlannerResult<String> {
    let mut ordinals = HashMap::new();
    for id in tree.subtree(root)? {
        if tree.get_or_err(id)?.is_table_expression() && !ordinals.contains_key(&id) {
            ordinals.insert(id, ordinals.len());
        }
    }

    let mut out = String::new();
    CanonicalWriter { tree, ordinals }.write_node(root, &mut out)?;
    Ok(out)
}

struct CanonicalWriter<'a> {
    tree: &'a QueryTree,
    ordinals: HashMap<NodeId, usize>,
}

impl CanonicalWriter<'_> {
    fn write_node(&self, id: NodeId, out: &mut String) -> PlannerResult<()> {
        let node = self.tree.get_or_err(id)?;
        let node_type = node.node_type();

        match node {
            QueryTreeNode::Table(t) => {
                let storage = quote(&t.storage_name);
                out.push_str(&format!("{}<{}>({})", node_type, self.source_ref(id), storage));
            }
            QueryTreeNode::TableFunction(t) => {
                let name = quote(&t.name);
                out.push_str(&format!("{}<{}>({};", node_type, self.source_ref(id), name));
                self.write_list(&t.arguments, out)?;
                out.push(')');
            }
            QueryTreeNode::Query(q) => {
                out.push_str(&format!("{}<{}>(", node_type, self.source_ref(id)));
                self.write_list(&q.projection, out)?;
                out.push_str(";FROM ");
                self.write_optional(q.join_tree, out)?;
                out.push_str(";WHERE ");
                self.write_optional(q.where_clause, out)?;
                out.push(')');
            }
            QueryTreeNode::Union(u) => {
                out.push_str(&format!("{}<{}>({:?};", node_type, self.source_ref(id), u.mode));
                self.write_list(&u.queries, out)?;
                out.push(')');
            }
            QueryTreeNode::Join(j) => {
                out.push_str(&format!("{}({:?};", node_type, j.kind));
                self.write_node(j.left, out)?;
                out.push(';');
                self.write_node(j.right, out)?;
                out.push_str(";ON ");
                self.write_optional(j.on, out)?;
                out.push(')');
            }
            QueryTreeNode::Column(c) => {
                let source = self.source_ref(c.source);
                out.push_str(&format!("{}({}:{}@{})", node_type, quote(&c.name), c.ty, source));
            }
            QueryTreeNode::Constant(c) => {
                out.push_str(&format!("{}({}:{})", node_type, c.value, c.ty));
            }
            QueryTreeNode::Function(f) => {
                out.push_str(&format!("{}({}:{};", node_type, quote(&f.name), f.ty));
                self.write_list(&f.arguments, out)?;
                out.push(')');
            }
        }

        Ok(())
    }

    fn write_list(&self, ids: &[NodeId], out: &mut String) -> PlannerResult<()> {
        out.push('[');
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.write_node(*id, out)?;
        }
        out.push(']');
        Ok(())
    }

    fn write_optional(&self, id: Option<NodeId>, out: &mut String) -> PlannerResult<()> {
        match id {
            Some(id) => self.write_node(id, out),
            None => {
                out.push('-');
                Ok(())
            }
        }
    }

    fn source_ref(&self, id: NodeId) -> String {
        match self.ordinals.get(&id) {
            Some(ordinal) => format!("${}", ordinal),
            None => id.to_string(),
        }
    }
}

fn quote(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Whether a node can be the producer of a set.
pub fn is_set_source_type(node_type: QueryTreeNodeType) -> bool {
    matches!(node_type, QueryTreeNodeType::Query | QueryTreeNodeType::Union)
}
