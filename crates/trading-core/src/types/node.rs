//! Node handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node stored in a graph arena.
///
/// Handles are plain indices: they do not keep the node alive and are only
/// meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Wrap an arena index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index of this node.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
