use tracing::{debug, trace};

use crate::{
    planner::{PlannerContext, PlannerError, PlannerResult},
    query_tree::{ColumnNode, NodeId, QueryTree, QueryTreeNode},
    types::NameAndType,
};

/// Register every table expression and column reference reachable from
/// `query_node` in `planner_context`.
///
/// Each table expression gets its registry on first sight, with all exposed
/// columns added in order. Each column reference is bound to the identifier of
/// its (source, name) pair, looked up in an enclosing scope when the source
/// belongs to one. Subqueries on the right of a membership predicate are
/// skipped; they are planned on their own by
/// [`collect_sets`](crate::planner::collect_sets).
pub fn collect_table_expression_data(
    planner_context: &mut PlannerContext,
    tree: &QueryTree,
    query_node: NodeId,
) -> PlannerResult<()> {
    for id in tree.scope_nodes(query_node)? {
        match tree.get_or_err(id)? {
            QueryTreeNode::Column(column) => visit_column(planner_context, tree, id, column)?,
            node if node.is_table_expression() && id != query_node => {
                register_table_expression(planner_context, tree, id)?;
            }
            _ => {}
        }
    }

    debug!(
        root = %query_node,
        table_expressions = planner_context.get_table_expression_node_to_columns().len(),
        "collected table expression data"
    );
    Ok(())
}

/// Create the registry of a table expression unless it exists.
pub fn register_table_expression(
    planner_context: &mut PlannerContext,
    tree: &QueryTree,
    table_expression_node: NodeId,
) -> PlannerResult<()> {
    if planner_context.get_table_expression_node_to_columns().contains_key(&table_expression_node) {
        return Ok(());
    }

    let node = tree.get_or_err(table_expression_node)?;
    if !node.is_table_expression() {
        return Err(PlannerError::UnexpectedNodeType {
            node: table_expression_node,
            expected: "table expression",
            actual: node.node_type(),
        });
    }

    let exposed = tree.exposed_columns(table_expression_node)?;
    let mut identifiers = Vec::with_capacity(exposed.len());
    for column in &exposed {
        let identifier = planner_context.get_column_unique_identifier(
            tree,
            table_expression_node,
            &column.name,
        )?;
        identifiers.push(identifier);
    }

    let columns = planner_context.get_or_create_table_expression_columns(table_expression_node);
    if let QueryTreeNode::Table(table) = node {
        for alias_column in &table.alias_columns {
            columns.add_alias_column_name(&alias_column.name);
        }
    }
    for (column, identifier) in exposed.iter().zip(&identifiers) {
        columns.add_column(column, identifier)?;
    }

    Ok(())
}

fn visit_column(
    planner_context: &mut PlannerContext,
    tree: &QueryTree,
    column_node: NodeId,
    column: &ColumnNode,
) -> PlannerResult<()> {
    if planner_context.get_column_node_identifier_or_null(column_node).is_some() {
        return Ok(());
    }

    let source = column.source;
    let is_local = planner_context.get_table_expression_node_to_columns().contains_key(&source);
    let outer = if is_local {
        None
    } else {
        planner_context
            .get_outer_table_expression_columns_or_null(source)
            .map(|columns| columns.get_column_identifier_or_null(&column.name).cloned())
    };

    if let Some(known) = outer {
        // correlated reference; alias and virtual columns of the outer source get a slot here
        let identifier = match known {
            Some(identifier) => identifier,
            None => planner_context.get_column_unique_identifier(tree, source, &column.name)?,
        };
        trace!(node = %column_node, source = %source, identifier = %identifier, "bind outer");
        planner_context.register_column_node(column_node, &identifier);
        return Ok(());
    }

    register_table_expression(planner_context, tree, source)?;

    let is_alias_column = planner_context
        .get_table_expression_columns_or_err(source)?
        .get_alias_columns_names()
        .contains(&column.name);
    if is_alias_column {
        // every use of an ALIAS column computes its expression again, into its own slot
        let identifier = planner_context.get_column_unique_identifier(tree, source, &column.name)?;
        planner_context.register_column_node(column_node, &identifier);
        return Ok(());
    }

    let known = planner_context
        .get_table_expression_columns_or_err(source)?
        .get_column_identifier_or_null(&column.name)
        .cloned();
    let identifier = match known {
        Some(identifier) => identifier,
        None => {
            // virtual columns are not part of the exposed list
            let identifier =
                planner_context.get_column_unique_identifier(tree, source, &column.name)?;
            let virtual_column = NameAndType::new(column.name.clone(), column.ty);
            planner_context
                .get_or_create_table_expression_columns(source)
                .add_column_if_not_exists(&virtual_column, &identifier);
            identifier
        }
    };

    planner_context.register_column_node(column_node, &identifier);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        planner::{PlannerSettings, QueryContext},
        query_tree::{JoinKind, QueryNode, TableNode},
        types::DataType,
    };

    fn context() -> PlannerContext {
        PlannerContext::for_query(QueryContext::with_query_id("q", PlannerSettings::default()))
    }

    #[test]
    fn test_registers_exposed_columns_in_order() {
        let mut tree = QueryTree::new();
        let t = tree.table("db.t", vec![
            NameAndType::new("id", DataType::Int64),
            NameAndType::new("name", DataType::String),
        ]);
        let name = tree.column("name", DataType::String, t).unwrap();
        let q = tree.query(QueryNode::new(vec![name]).from(t)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        let columns = ctx.get_table_expression_columns_or_err(t).unwrap();
        let names: Vec<_> = columns.get_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(
            ctx.get_column_node_identifier_or_err(name).unwrap(),
            columns.get_column_identifier_or_err("name").unwrap()
        );
        assert!(!ctx.get_table_expression_node_to_columns().contains_key(&q));
    }

    #[test]
    fn test_repeated_column_references_share_identifier() {
        let mut tree = QueryTree::new();
        let t = tree.table("db.t", vec![NameAndType::new("id", DataType::Int64)]);
        let a = tree.column("id", DataType::Int64, t).unwrap();
        let b = tree.column("id", DataType::Int64, t).unwrap();
        let q = tree.query(QueryNode::new(vec![a, b]).from(t)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        let a_identifier = ctx.get_column_node_identifier_or_err(a).unwrap();
        assert_eq!(a_identifier, ctx.get_column_node_identifier_or_err(b).unwrap());
        assert_eq!(ctx.get_table_expression_columns_or_err(t).unwrap().len(), 1);
    }

    #[test]
    fn test_alias_columns_get_a_slot_per_use() {
        let mut tree = QueryTree::new();
        let t = tree.add_table(TableNode {
            storage_name: "db.people".into(),
            alias: None,
            columns: vec![NameAndType::new("first", DataType::String)],
            alias_columns: vec![NameAndType::new("full_name", DataType::String)],
        });
        let a = tree.column("full_name", DataType::String, t).unwrap();
        let b = tree.column("full_name", DataType::String, t).unwrap();
        let q = tree.query(QueryNode::new(vec![a, b]).from(t)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        let columns = ctx.get_table_expression_columns_or_err(t).unwrap();
        assert!(columns.get_alias_columns_names().contains("full_name"));
        assert!(!columns.get_columns_names().contains("full_name"));
        let a_identifier = ctx.get_column_node_identifier_or_err(a).unwrap();
        assert_ne!(a_identifier, ctx.get_column_node_identifier_or_err(b).unwrap());
    }

    #[test]
    fn test_virtual_column_is_added_on_first_reference() {
        let mut tree = QueryTree::new();
        let t = tree.table("db.t", vec![NameAndType::new("id", DataType::Int64)]);
        let part = tree.column("_part", DataType::String, t).unwrap();
        let q = tree.query(QueryNode::new(vec![part]).from(t)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        let columns = ctx.get_table_expression_columns_or_err(t).unwrap();
        assert_eq!(columns.len(), 2);
        let registered = columns.get_column_identifier_or_err("_part").unwrap();
        assert_eq!(ctx.get_column_node_identifier_or_err(part).unwrap(), registered);
    }

    #[test]
    fn test_subquery_in_from_is_a_table_expression() {
        let mut tree = QueryTree::new();
        let t = tree.table("db.t", vec![NameAndType::new("id", DataType::Int64)]);
        let inner_id = tree.column("id", DataType::Int64, t).unwrap();
        let sub = tree.query(QueryNode::new(vec![inner_id]).from(t).alias("s")).unwrap();
        let other = tree.table("db.o", vec![NameAndType::new("id", DataType::Int64)]);
        let join = tree.join(sub, other, JoinKind::Cross, None).unwrap();
        let outer_id = tree.column("id", DataType::Int64, sub).unwrap();
        let q = tree.query(QueryNode::new(vec![outer_id]).from(join)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        assert_eq!(ctx.get_table_expression_node_to_columns().len(), 3);
        let outer = ctx.get_column_node_identifier_or_err(outer_id).unwrap();
        let inner = ctx.get_column_node_identifier_or_err(inner_id).unwrap();
        assert_ne!(outer, inner);
        assert!(outer.contains("_s_id"));
    }

    #[test]
    fn test_subquery_projecting_same_name_twice() {
        // SELECT s.id, s.`b.id` FROM (SELECT a.id, b.id FROM a CROSS JOIN b) AS s
        let mut tree = QueryTree::new();
        let a = tree.table("a", vec![NameAndType::new("id", DataType::Int64)]);
        let b = tree.table("b", vec![NameAndType::new("id", DataType::Int64)]);
        let join = tree.join(a, b, JoinKind::Cross, None).unwrap();
        let a_id = tree.column("id", DataType::Int64, a).unwrap();
        let b_id = tree.column("id", DataType::Int64, b).unwrap();
        let sub = tree.query(QueryNode::new(vec![a_id, b_id]).from(join).alias("s")).unwrap();
        let first = tree.column("id", DataType::Int64, sub).unwrap();
        let second = tree.column("b.id", DataType::Int64, sub).unwrap();
        let q = tree.query(QueryNode::new(vec![first, second]).from(sub)).unwrap();

        let mut ctx = context();
        collect_table_expression_data(&mut ctx, &tree, q).unwrap();

        let columns = ctx.get_table_expression_columns_or_err(sub).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(
            ctx.get_column_node_identifier_or_err(first).unwrap(),
            columns.get_column_identifier_or_err("id").unwrap()
        );
        assert_eq!(
            ctx.get_column_node_identifier_or_err(second).unwrap(),
            columns.get_column_identifier_or_err("b.id").unwrap()
        );
    }

    #[test]
    fn test_child_binds_outer_columns_to_parent_identifiers() {
        let mut tree = QueryTree::new();
        let users = vec![NameAndType::new("id", DataType::Int64)];
        let u = tree.table_with_alias("db.users", "u", users);
        let o = tree.table("db.orders", vec![NameAndType::new("user_id", DataType::Int64)]);
        let o_user = tree.column("user_id", DataType::Int64, o).unwrap();
        let outer_id = tree.column("id", DataType::Int64, u).unwrap();
        let eq = tree.function("equals", DataType::Bool, vec![o_user, outer_id]).unwrap();
        let sub = tree.query(QueryNode::new(vec![o_user]).from(o).filter(eq)).unwrap();
        let parent_id = tree.column("id", DataType::Int64, u).unwrap();
        let q = tree.query(QueryNode::new(vec![parent_id]).from(u)).unwrap();

        let mut parent = context();
        collect_table_expression_data(&mut parent, &tree, q).unwrap();
        let mut child = parent.child();
        collect_table_expression_data(&mut child, &tree, sub).unwrap();

        assert_eq!(
            child.get_column_node_identifier_or_err(outer_id).unwrap(),
            parent.get_column_node_identifier_or_err(parent_id).unwrap()
        );
        assert!(!child.get_table_expression_node_to_columns().contains_key(&u));
        assert!(child.get_outer_table_expression_columns_or_null(u).is_some());
        let local = child.get_column_node_identifier_or_err(o_user).unwrap();
        assert!(local.starts_with("__column_1."));
    }

    #[test]
    fn test_child_mints_outer_virtual_column_locally() {
        let mut tree = QueryTree::new();
        let u = tree.table("db.users", vec![NameAndType::new("id", DataType::Int64)]);
        let part = tree.column("_part", DataType::String, u).unwrap();
        let sub = tree.query(QueryNode::new(vec![part])).unwrap();
        let id = tree.column("id", DataType::Int64, u).unwrap();
        let q = tree.query(QueryNode::new(vec![id]).from(u)).unwrap();

        let mut parent = context();
        collect_table_expression_data(&mut parent, &tree, q).unwrap();
        let mut child = parent.child();
        collect_table_expression_data(&mut child, &tree, sub).unwrap();

        let identifier = child.get_column_node_identifier_or_err(part).unwrap();
        assert_eq!(identifier, "__column_1.0_db.users__part");
        assert!(child.get_table_expression_node_to_columns().is_empty());
    }

    #[test]
    fn test_column_with_non_table_source_is_error() {
        let mut tree = QueryTree::new();
        let t = tree.table("db.t", vec![NameAndType::new("id", DataType::Int64)]);
        let id = tree.column("id", DataType::Int64, t).unwrap();
        let bogus = tree.column("x", DataType::Int64, id).unwrap();
        let q = tree.query(QueryNode::new(vec![bogus]).from(t)).unwrap();

        let mut ctx = context();
        let err = collect_table_expression_data(&mut ctx, &tree, q).unwrap_err();
        assert!(matches!(err, PlannerError::UnexpectedNodeType { node, .. } if node == id));
    }
}
