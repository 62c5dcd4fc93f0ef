//! Mutable pose graph state, guarded by one lock in the graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{InitialTrajectoryPose, MapMode};
use crate::core::{MapById, NodeId, Rigid3d, SubmapId, TrajectoryIndexed, project_to_plane};
use crate::engine::submap::Submap;

use super::trimmer::{SubmapView, Trimmable, Trimmer};
use super::types::{Constraint, ConstraintTag, SensorLogs, TrajectoryData, TrajectoryNode};

/// Bound on initial-pose chains, guards against cycles.
const MAX_INITIAL_POSE_CHAIN: usize = 64;

pub(crate) struct InternalSubmap {
    pub submap: Submap,
    pub global_pose: Rigid3d,
    pub node_ids: BTreeSet<NodeId>,
}

pub(crate) struct InternalNode {
    pub node: TrajectoryNode,
    pub global_pose: Rigid3d,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TrajectoryState {
    pub finished: bool,
    pub frozen: bool,
    pub initial_pose: Option<InitialTrajectoryPose>,
}

/// Everything the pose graph owns.
pub struct PoseGraphData {
    pub(crate) mode: MapMode,
    pub(crate) submaps: MapById<SubmapId, InternalSubmap>,
    pub(crate) nodes: MapById<NodeId, InternalNode>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) trajectories: BTreeMap<i32, TrajectoryState>,
    pub(crate) landmark_poses: BTreeMap<String, Rigid3d>,
    pub(crate) trajectory_data: BTreeMap<i32, TrajectoryData>,
    pub(crate) sensor_logs: BTreeMap<i32, SensorLogs>,
    pub(crate) trimmers: Vec<Box<dyn Trimmer>>,
    pub(crate) current_local_submap: Option<SubmapId>,
    pub(crate) num_nodes_since_optimization: usize,
    pub(crate) num_optimizations: usize,
}

impl PoseGraphData {
    pub(crate) fn new(mode: MapMode) -> Self {
        Self {
            mode,
            submaps: MapById::new(),
            nodes: MapById::new(),
            constraints: Vec::new(),
            trajectories: BTreeMap::new(),
            landmark_poses: BTreeMap::new(),
            trajectory_data: BTreeMap::new(),
            sensor_logs: BTreeMap::new(),
            trimmers: Vec::new(),
            current_local_submap: None,
            num_nodes_since_optimization: 0,
            num_optimizations: 0,
        }
    }

    /// Planar projection in 2D, identity in 3D.
    pub(crate) fn canonical(&self, pose: &Rigid3d) -> Rigid3d {
        match self.mode {
            MapMode::TwoD => project_to_plane(pose),
            MapMode::ThreeD => *pose,
        }
    }

    pub(crate) fn trajectory_mut(&mut self, trajectory_id: i32) -> &mut TrajectoryState {
        self.trajectories.entry(trajectory_id).or_default()
    }

    pub(crate) fn is_frozen(&self, trajectory_id: i32) -> bool {
        self.trajectories
            .get(&trajectory_id)
            .is_some_and(|state| state.frozen)
    }

    pub(crate) fn is_trajectory_finished(&self, trajectory_id: i32) -> bool {
        self.trajectories
            .get(&trajectory_id)
            .is_some_and(|state| state.finished)
    }

    /// Transform from a trajectory's local frame into the global frame.
    ///
    /// Anchored on the trajectory's newest submap when it has one, else on
    /// its declared initial pose, else identity.
    pub(crate) fn local_to_global(&self, trajectory_id: i32) -> Rigid3d {
        let mut transform = Rigid3d::identity();
        let mut current = trajectory_id;
        for _ in 0..MAX_INITIAL_POSE_CHAIN {
            if let Some((_, data)) = self.submaps.last_of(current) {
                return data.global_pose * data.submap.local_pose.inverse() * transform;
            }
            match self
                .trajectories
                .get(&current)
                .and_then(|state| state.initial_pose.as_ref())
            {
                Some(initial) => {
                    transform = initial.relative_pose * transform;
                    current = initial.to_trajectory_id;
                }
                None => return transform,
            }
        }
        log::warn!(
            "Initial pose chain from trajectory {} does not terminate",
            trajectory_id
        );
        transform
    }

    /// Add a constraint and, for intra-submap ones, the membership it implies.
    pub(crate) fn add_constraint(&mut self, mut constraint: Constraint) {
        if !self.submaps.contains(&constraint.submap_id) || !self.nodes.contains(&constraint.node_id)
        {
            log::warn!(
                "Dropping constraint {} -> {}: endpoint missing",
                constraint.node_id,
                constraint.submap_id
            );
            return;
        }
        constraint.relative_pose = self.canonical(&constraint.relative_pose);
        if constraint.tag == ConstraintTag::IntraSubmap {
            self.add_node_to_submap(constraint.node_id, constraint.submap_id);
        }
        self.constraints.push(constraint);
    }

    pub(crate) fn add_node_to_submap(&mut self, node_id: NodeId, submap_id: SubmapId) {
        match self.submaps.get_mut(&submap_id) {
            Some(data) => {
                data.node_ids.insert(node_id);
            }
            None => log::warn!("Cannot add {} to missing {}", node_id, submap_id),
        }
    }

    /// Run every trimmer once and drop the finished ones.
    pub(crate) fn run_trimmers(&mut self) {
        if self.trimmers.is_empty() {
            return;
        }
        let mut trimmers = std::mem::take(&mut self.trimmers);
        for trimmer in trimmers.iter_mut() {
            trimmer.trim(self);
        }
        trimmers.retain(|trimmer| !trimmer.is_finished());
        // Trimmers registered while trimming are kept as well.
        trimmers.append(&mut self.trimmers);
        self.trimmers = trimmers;
    }

    fn remove_node(&mut self, node_id: NodeId) {
        self.nodes.remove(&node_id);
        self.constraints.retain(|c| c.node_id != node_id);
    }
}

impl Trimmable for PoseGraphData {
    fn num_submaps(&self, trajectory_id: i32) -> usize {
        self.submaps.size_of_trajectory(trajectory_id)
    }

    fn submap_ids(&self, trajectory_id: i32) -> Vec<SubmapId> {
        self.submaps
            .trajectory(trajectory_id)
            .map(|(id, _)| *id)
            .collect()
    }

    fn submap_views(&self) -> Vec<SubmapView<'_>> {
        self.submaps
            .iter()
            .map(|(id, data)| SubmapView {
                id: *id,
                global_pose: data.global_pose,
                submap: &data.submap,
            })
            .collect()
    }

    fn mark_submap_as_trimmed(&mut self, submap_id: SubmapId) {
        let finished = self
            .submaps
            .get(&submap_id)
            .is_some_and(|data| data.submap.is_finished());
        if !finished {
            log::debug!("Not trimming {}: missing or unfinished", submap_id);
            return;
        }
        let Some(removed) = self.submaps.remove(&submap_id) else {
            return;
        };
        self.constraints.retain(|c| c.submap_id != submap_id);

        // Nodes that now belong to no live submap go as well.
        let orphans: Vec<NodeId> = removed
            .node_ids
            .iter()
            .filter(|node_id| {
                !self
                    .submaps
                    .trajectory(node_id.trajectory_id())
                    .any(|(_, data)| data.node_ids.contains(node_id))
            })
            .copied()
            .collect();
        for node_id in orphans {
            self.remove_node(node_id);
        }
        if self.current_local_submap == Some(submap_id) {
            self.current_local_submap = None;
        }
        log::debug!("Trimmed {}", submap_id);
    }

    fn is_finished(&self, trajectory_id: i32) -> bool {
        self.is_trajectory_finished(trajectory_id)
    }
}
