use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use crate::{
    planner::{DuplicateSetPolicy, PlannerError, PlannerResult, PlannerSettings, SetPtr},
    query_tree::{canonical_form, is_set_source_type, NodeId, QueryTree},
};

/// Canonical key of a set source; equal for structurally equivalent subqueries.
pub type SetKey = String;
pub type SetKeyToSet = IndexMap<SetKey, SetPtr>;
pub type SetKeyToSubqueryNode = IndexMap<SetKey, SubqueryNodeForSet>;

/// Subquery node responsible for producing a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubqueryNodeForSet {
    pub subquery_node: NodeId,
    pub set: SetPtr,
}

/// Objects shared by every planner context of one query:
///
/// 1. Prepared sets.
/// 2. Subqueries for sets.
#[derive(Debug, Clone, Default)]
pub struct GlobalPlannerContext {
    settings: PlannerSettings,
    set_key_to_set: SetKeyToSet,
    set_key_to_subquery_node: SetKeyToSubqueryNode,
    next_scope: usize,
}

/// Shared handle passed explicitly from a parent compilation to the
/// compilations of its correlated subqueries. Sharing is sequential.
pub type GlobalPlannerContextPtr = Rc<RefCell<GlobalPlannerContext>>;

impl GlobalPlannerContext {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self { settings: settings.clone(), ..Default::default() }
    }

    pub fn into_shared(self) -> GlobalPlannerContextPtr {
        Rc::new(RefCell::new(self))
    }

    /// Key of the set produced by `set_source_node`: the configured prefix
    /// followed by the hex SHA-256 of the node's canonical form.
    pub fn get_set_key(&self, tree: &QueryTree, set_source_node: NodeId) -> PlannerResult<SetKey> {
        let form = canonical_form(tree, set_source_node)?;
        let digest = Sha256::digest(form.as_bytes());

        let key = format!("{}{:x}", self.settings.set_key_prefix, digest);

        trace!(node = %set_source_node, key = %key, "derived set key");
        Ok(key)
    }

    /// Register a created set for `key`.
    ///
    /// A key that already has a set keeps its first set. Under
    /// `DuplicateSetPolicy::Strict` the second call is a logical error.
    pub fn register_set(&mut self, key: &str, set: SetPtr) -> PlannerResult<()> {
        if self.set_key_to_set.contains_key(key) {
            return match self.settings.duplicate_set_policy {
                DuplicateSetPolicy::Idempotent => {
                    warn!(key = %key, "set is already registered, keeping the first one");
                    Ok(())
                }
                DuplicateSetPolicy::Strict => {
                    Err(PlannerError::SetAlreadyRegistered { key: key.to_string() })
                }
            };
        }

        trace!(key = %key, rows = set.len(), "register set");
        self.set_key_to_set.insert(key.to_string(), set);
        Ok(())
    }

    /// Get set for key, `None` if no set is registered
    pub fn get_set_or_null(&self, key: &str) -> Option<SetPtr> {
        self.set_key_to_set.get(key).cloned()
    }

    /// Get set for key, logical error if no set is registered
    pub fn get_set_or_err(&self, key: &str) -> PlannerResult<SetPtr> {
        self.get_set_or_null(key).ok_or_else(|| PlannerError::SetNotFound { key: key.to_string() })
    }

    /// Record the node that produces the set for `key`.
    ///
    /// The node must be a `QUERY` or `UNION` and the set must be created.
    /// Only the first producer of a key is kept; returns whether this one was.
    pub fn register_subquery_node_for_set(
        &mut self,
        tree: &QueryTree,
        key: &str,
        subquery_node_for_set: SubqueryNodeForSet,
    ) -> PlannerResult<bool> {
        let node = subquery_node_for_set.subquery_node;
        let node_type = tree.node_type(node)?;
        if !is_set_source_type(node_type) {
            return Err(PlannerError::InvalidSubqueryNodeForSet {
                key: key.to_string(),
                node,
                actual: node_type,
            });
        }

        if !subquery_node_for_set.set.is_created() {
            return Err(PlannerError::SetNotCreated { key: key.to_string() });
        }

        if let Some(existing) = self.set_key_to_subquery_node.get(key) {
            debug!(
                key = %key,
                producer = %existing.subquery_node,
                duplicate = %node,
                "set already has a producer"
            );
            return Ok(false);
        }

        trace!(key = %key, node = %node, "register subquery node for set");
        self.set_key_to_subquery_node.insert(key.to_string(), subquery_node_for_set);
        Ok(true)
    }

    /// Hand out the scope number of a new planner context sharing this one.
    /// The first context gets 0.
    pub fn allocate_scope(&mut self) -> usize {
        let scope = self.next_scope;
        self.next_scope += 1;
        scope
    }

    pub fn get_subquery_nodes_for_sets(&self) -> &SetKeyToSubqueryNode {
        &self.set_key_to_subquery_node
    }

    pub fn get_sets(&self) -> &SetKeyToSet {
        &self.set_key_to_set
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        planner::Set,
        query_tree::{QueryNode, QueryTreeNodeType},
        types::{DataType, Literal, NameAndType},
    };

    fn select_y_from_t(tree: &mut QueryTree) -> NodeId {
        let t = tree.table("db.t", vec![NameAndType::new("y", DataType::Int64)]);
        let y = tree.column("y", DataType::Int64, t).unwrap();
        tree.query(QueryNode::new(vec![y]).from(t)).unwrap()
    }

    fn int_set(values: &[i64]) -> SetPtr {
        Set::from_rows(vec![DataType::Int64], values.iter().map(|v| vec![Literal::Int(*v)])).unwrap()
    }

    #[test]
    fn test_structurally_equivalent_subqueries_share_key() {
        let mut tree = QueryTree::new();
        let first = select_y_from_t(&mut tree);
        let second = select_y_from_t(&mut tree);
        let ctx = GlobalPlannerContext::default();

        let key = ctx.get_set_key(&tree, first).unwrap();
        assert_eq!(key, ctx.get_set_key(&tree, second).unwrap());
        assert!(key.starts_with("__set_"));
        assert_eq!(key.len(), "__set_".len() + 64);
    }

    #[test]
    fn test_key_prefix_follows_settings() {
        let mut tree = QueryTree::new();
        let q = select_y_from_t(&mut tree);
        let ctx = GlobalPlannerContext::new(&PlannerSettings::new().with_set_key_prefix("s_"));
        let key = ctx.get_set_key(&tree, q).unwrap();
        let digest = key.strip_prefix("s_").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_register_and_get_set() {
        let mut ctx = GlobalPlannerContext::default();
        let set = int_set(&[1, 2]);

        assert!(ctx.get_set_or_null("k").is_none());
        assert_eq!(ctx.get_set_or_err("k"), Err(PlannerError::SetNotFound { key: "k".into() }));

        ctx.register_set("k", set.clone()).unwrap();
        assert!(Arc::ptr_eq(&ctx.get_set_or_null("k").unwrap(), &set));
        assert!(Arc::ptr_eq(&ctx.get_set_or_err("k").unwrap(), &set));
    }

    #[test]
    fn test_register_set_twice_keeps_first_when_idempotent() {
        let mut ctx = GlobalPlannerContext::default();
        let first = int_set(&[1]);
        ctx.register_set("k", first.clone()).unwrap();
        ctx.register_set("k", int_set(&[2])).unwrap();

        assert_eq!(ctx.get_sets().len(), 1);
        assert!(Arc::ptr_eq(&ctx.get_set_or_err("k").unwrap(), &first));
    }

    #[test]
    fn test_register_set_twice_fails_when_strict() {
        let mut ctx = GlobalPlannerContext::new(&PlannerSettings::strict());
        ctx.register_set("k", int_set(&[1])).unwrap();
        assert_eq!(
            ctx.register_set("k", int_set(&[1])),
            Err(PlannerError::SetAlreadyRegistered { key: "k".into() })
        );
    }

    #[test]
    fn test_subquery_node_for_set_validation() {
        let mut tree = QueryTree::new();
        let q = select_y_from_t(&mut tree);
        let t = tree.table("db.t", vec![]);
        let mut ctx = GlobalPlannerContext::default();

        let err = ctx
            .register_subquery_node_for_set(&tree, "k", SubqueryNodeForSet { subquery_node: t, set: int_set(&[1]) })
            .unwrap_err();
        assert_eq!(err, PlannerError::InvalidSubqueryNodeForSet { key: "k".into(), node: t, actual: QueryTreeNodeType::Table });

        let pending = Arc::new(Set::new(vec![DataType::Int64]));
        let err = ctx
            .register_subquery_node_for_set(&tree, "k", SubqueryNodeForSet { subquery_node: q, set: pending })
            .unwrap_err();
        assert_eq!(err, PlannerError::SetNotCreated { key: "k".into() });
        assert!(ctx.get_subquery_nodes_for_sets().is_empty());
    }

    #[test]
    fn test_one_producer_per_key() {
        let mut tree = QueryTree::new();
        let first = select_y_from_t(&mut tree);
        let second = select_y_from_t(&mut tree);
        let mut ctx = GlobalPlannerContext::default();
        let set = int_set(&[1]);

        let added = ctx
            .register_subquery_node_for_set(&tree, "k", SubqueryNodeForSet { subquery_node: first, set: set.clone() })
            .unwrap();
        assert!(added);
        let added = ctx
            .register_subquery_node_for_set(&tree, "k", SubqueryNodeForSet { subquery_node: second, set })
            .unwrap();
        assert!(!added);

        let producers = ctx.get_subquery_nodes_for_sets();
        assert_eq!(producers.len(), 1);
        assert_eq!(producers["k"].subquery_node, first);
    }
}
