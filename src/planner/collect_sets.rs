use indexmap::IndexMap;
use tracing::debug;

use crate::{
    planner::{
        collect_table_expression_data, PlannerContext, PlannerOutput, PlannerResult, SetKey, SetPtr,
        SubqueryNodeForSet,
    },
    query_tree::{NodeId, QueryTree},
};

/// Produces the contents of a set once its subquery is planned.
pub trait SetSource {
    fn build_set(
        &mut self,
        tree: &QueryTree,
        subquery_node: NodeId,
        planned: &PlannerOutput,
    ) -> PlannerResult<SetPtr>;
}

/// Plan `subquery` in a child context of `planner_context` and seal it.
///
/// The child shares the global context, so sets found inside the subquery are
/// registered once for the whole query.
pub fn plan_subquery(
    planner_context: &PlannerContext,
    tree: &QueryTree,
    subquery: NodeId,
    source: &mut dyn SetSource,
) -> PlannerResult<PlannerOutput> {
    let mut child = planner_context.child();
    collect_table_expression_data(&mut child, tree, subquery)?;
    collect_sets(&mut child, tree, subquery, source)?;
    Ok(child.seal())
}

/// Find every `IN (subquery)` predicate in the scope of `query_node` and make
/// sure its set exists.
///
/// Structurally equivalent subqueries map to the same key; only the first of
/// them is planned and built. Returns the key used by each predicate node.
pub fn collect_sets(
    planner_context: &mut PlannerContext,
    tree: &QueryTree,
    query_node: NodeId,
    source: &mut dyn SetSource,
) -> PlannerResult<IndexMap<NodeId, SetKey>> {
    let mut keys = IndexMap::new();

    for id in tree.scope_nodes(query_node)? {
        let Some(subquery) = tree.set_subquery_of(id)? else {
            continue;
        };

        let global = planner_context.get_global_planner_context().clone();
        let key = global.borrow().get_set_key(tree, subquery)?;
        let known = global.borrow().get_set_or_null(&key).is_some();

        if known {
            debug!(predicate = %id, subquery = %subquery, key = %key, "reuse prepared set");
        } else {
            let planned = plan_subquery(planner_context, tree, subquery, source)?;
            let set = source.build_set(tree, subquery, &planned)?;

            // producer checks run before the set becomes visible
            let producer = SubqueryNodeForSet { subquery_node: subquery, set: set.clone() };
            let mut global = global.borrow_mut();
            global.register_subquery_node_for_set(tree, &key, producer)?;
            global.register_set(&key, set)?;
            debug!(predicate = %id, subquery = %subquery, key = %key, "prepared set");
        }

        keys.insert(id, key);
    }

    Ok(keys)
}
