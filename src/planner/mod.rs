pub mod planner_error;
pub use planner_error::*;

pub mod planner_settings;
pub use planner_settings::*;

pub mod query_context;
pub use query_context::*;

pub mod table_expression_columns;
pub use table_expression_columns::*;

pub mod set;
pub use set::*;

pub mod global_planner_context;
pub use global_planner_context::*;

pub mod planner_context;
pub use planner_context::*;

pub mod planner_output;
pub use planner_output::*;

pub mod collect_table_expression_data;
pub use collect_table_expression_data::*;

pub mod collect_sets;
pub use collect_sets::*;
