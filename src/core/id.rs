//! Composite identifiers for submaps and nodes.
//!
//! Both are `(trajectory_id, index)` pairs ordered by trajectory first, then
//! index. Indices are dense and increase per trajectory starting at 0.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier keyed by trajectory and a per-trajectory index.
pub trait TrajectoryIndexed: Copy + Ord {
    /// Build an id from its parts.
    fn from_parts(trajectory_id: i32, index: i32) -> Self;

    /// Trajectory component.
    fn trajectory_id(&self) -> i32;

    /// Per-trajectory index component.
    fn index(&self) -> i32;

    /// Same index under another trajectory id.
    fn with_trajectory(&self, trajectory_id: i32) -> Self {
        Self::from_parts(trajectory_id, self.index())
    }
}

/// Unique identifier for a submap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmapId {
    /// Owning trajectory.
    pub trajectory_id: i32,
    /// Index within the trajectory.
    pub submap_index: i32,
}

impl SubmapId {
    /// Create a new submap ID.
    #[inline]
    pub fn new(trajectory_id: i32, submap_index: i32) -> Self {
        Self {
            trajectory_id,
            submap_index,
        }
    }
}

impl TrajectoryIndexed for SubmapId {
    fn from_parts(trajectory_id: i32, index: i32) -> Self {
        Self::new(trajectory_id, index)
    }

    fn trajectory_id(&self) -> i32 {
        self.trajectory_id
    }

    fn index(&self) -> i32 {
        self.submap_index
    }
}

impl fmt::Display for SubmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Submap({}, {})", self.trajectory_id, self.submap_index)
    }
}

/// Unique identifier for a trajectory node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Owning trajectory.
    pub trajectory_id: i32,
    /// Index within the trajectory.
    pub node_index: i32,
}

impl NodeId {
    /// Create a new node ID.
    #[inline]
    pub fn new(trajectory_id: i32, node_index: i32) -> Self {
        Self {
            trajectory_id,
            node_index,
        }
    }
}

impl TrajectoryIndexed for NodeId {
    fn from_parts(trajectory_id: i32, index: i32) -> Self {
        Self::new(trajectory_id, index)
    }

    fn trajectory_id(&self) -> i32 {
        self.trajectory_id
    }

    fn index(&self) -> i32 {
        self.node_index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}, {})", self.trajectory_id, self.node_index)
    }
}
