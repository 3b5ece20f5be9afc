pub mod types;
pub use types::{DataType, Literal, NameAndType, NamesAndTypes};

pub mod query_tree;
pub use query_tree::{NodeId, QueryTree, QueryTreeNode, QueryTreeNodeType};

pub mod planner;
pub use planner::{
    collect_sets, collect_table_expression_data, plan_subquery, GlobalPlannerContext,
    GlobalPlannerContextPtr, PlannerContext, PlannerError, PlannerOutput, PlannerResult,
    PlannerSettings, QueryContext, Set, SetSource, TableExpressionColumns,
};
