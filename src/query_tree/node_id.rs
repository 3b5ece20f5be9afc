use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Stable index of a node inside a [`QueryTree`](crate::query_tree::QueryTree) arena.
///
/// Registries key on `NodeId` instead of node references; two ids are equal
/// only when they name the same node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
