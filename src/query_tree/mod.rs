pub mod node_id;
pub use node_id::*;

pub mod query_tree_node;
pub use query_tree_node::*;

pub mod query_tree;
pub use query_tree::*;

pub mod canonical_form;
pub use canonical_form::*;
