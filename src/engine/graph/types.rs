//! Value types owned by the pose graph.
//!
//! These are also the payloads of the persisted state stream, so they must
//! stay postcard-friendly.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::{
    FixedFramePoseData, ImuData, LandmarkData, NodeId, OdometryData, Rigid3d, SubmapId,
};
use crate::engine::submap::Submap;

/// Origin of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintTag {
    /// Node was inserted into the submap during local building.
    IntraSubmap,
    /// Found by searching for loop closures.
    InterSubmap,
}

/// Relative pose of a node in a submap's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Submap end.
    pub submap_id: SubmapId,
    /// Node end.
    pub node_id: NodeId,
    /// Node pose expressed in the submap frame.
    pub relative_pose: Rigid3d,
    /// Weight of the translational residual.
    pub translation_weight: f64,
    /// Weight of the rotational residual.
    pub rotation_weight: f64,
    /// Intra- or inter-submap.
    pub tag: ConstraintTag,
}

impl Constraint {
    /// Intra-submap constraint with unit weights.
    pub fn intra(submap_id: SubmapId, node_id: NodeId, relative_pose: Rigid3d) -> Self {
        Self {
            submap_id,
            node_id,
            relative_pose,
            translation_weight: 1.0,
            rotation_weight: 1.0,
            tag: ConstraintTag::IntraSubmap,
        }
    }

    /// Same constraint with both endpoints moved to other trajectories.
    pub fn remapped(&self, submap_trajectory: i32, node_trajectory: i32) -> Self {
        Self {
            submap_id: SubmapId::new(submap_trajectory, self.submap_id.submap_index),
            node_id: NodeId::new(node_trajectory, self.node_id.node_index),
            ..self.clone()
        }
    }
}

/// Content of one registered scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryNode {
    /// Scan time in microseconds.
    pub timestamp_us: u64,
    /// Tracking pose in the trajectory's local frame.
    pub local_pose: Rigid3d,
    /// Rotation aligning the tracking frame with gravity.
    pub gravity_alignment: UnitQuaternion<f64>,
    /// Range data that survived filtering, tracking frame.
    pub filtered_points: Vec<Vector3<f32>>,
}

/// Per-trajectory state accumulated from observation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryData {
    /// Mean gravity magnitude seen by the IMU (m/s²).
    pub gravity_constant: f64,
    /// IMU to tracking frame rotation.
    pub imu_calibration: UnitQuaternion<f64>,
    /// Fixed frame expressed in the map frame, once known.
    pub fixed_frame_origin_in_map: Option<Rigid3d>,
}

impl Default for TrajectoryData {
    fn default() -> Self {
        Self {
            gravity_constant: 9.806,
            imu_calibration: UnitQuaternion::identity(),
            fixed_frame_origin_in_map: None,
        }
    }
}

/// Observation history of one trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorLogs {
    /// IMU readings.
    pub imu: Vec<ImuData>,
    /// Odometry poses.
    pub odometry: Vec<OdometryData>,
    /// Fixed-frame poses.
    pub fixed_frame_pose: Vec<FixedFramePoseData>,
    /// Landmark observations.
    pub landmark: Vec<LandmarkData>,
}

impl SensorLogs {
    /// Record counts.
    pub fn counts(&self) -> SensorLogCounts {
        SensorLogCounts {
            imu: self.imu.len(),
            odometry: self.odometry.len(),
            fixed_frame_pose: self.fixed_frame_pose.len(),
            landmark: self.landmark.len(),
        }
    }
}

/// Number of stored observations per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorLogCounts {
    /// IMU readings.
    pub imu: usize,
    /// Odometry poses.
    pub odometry: usize,
    /// Fixed-frame poses.
    pub fixed_frame_pose: usize,
    /// Landmark observations.
    pub landmark: usize,
}

impl SensorLogCounts {
    /// Sum over all kinds.
    pub fn total(&self) -> usize {
        self.imu + self.odometry + self.fixed_frame_pose + self.landmark
    }
}

/// A submap together with its current global pose.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmapData {
    /// Submap content.
    pub submap: Submap,
    /// Global pose of the submap origin.
    pub pose: Rigid3d,
}

/// Global pose of one submap in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmapPose {
    /// Index within the trajectory.
    pub submap_index: i32,
    /// Global pose.
    pub pose: Rigid3d,
}

/// Global pose of one node in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePose {
    /// Index within the trajectory.
    pub node_index: i32,
    /// Scan time in microseconds.
    pub timestamp_us: u64,
    /// Global pose.
    pub pose: Rigid3d,
}

/// Skeleton of one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySnapshot {
    /// Trajectory id in the graph that produced the snapshot.
    pub trajectory_id: i32,
    /// Live submaps in index order.
    pub submaps: Vec<SubmapPose>,
    /// Live nodes in index order.
    pub nodes: Vec<NodePose>,
}

/// Global pose of a landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPose {
    /// Opaque landmark id.
    pub landmark_id: String,
    /// Global pose.
    pub global_pose: Rigid3d,
}

/// Structure of a whole pose graph without submap or node content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseGraphSnapshot {
    /// Every trajectory, ascending id.
    pub trajectories: Vec<TrajectorySnapshot>,
    /// Every constraint.
    pub constraints: Vec<Constraint>,
    /// Every landmark pose.
    pub landmark_poses: Vec<LandmarkPose>,
}

impl PoseGraphSnapshot {
    /// Total submaps across trajectories.
    pub fn num_submaps(&self) -> usize {
        self.trajectories.iter().map(|t| t.submaps.len()).sum()
    }

    /// Total nodes across trajectories.
    pub fn num_nodes(&self) -> usize {
        self.trajectories.iter().map(|t| t.nodes.len()).sum()
    }
}

/// Submap id → ids of nodes inserted into it.
pub type NodeMembership = BTreeMap<SubmapId, BTreeSet<NodeId>>;

/// Everything needed to persist a pose graph, taken under one lock so the
/// skeleton and the payloads agree.
#[derive(Debug, Clone, Default)]
pub struct StateExport {
    /// Graph structure and global poses.
    pub snapshot: PoseGraphSnapshot,
    /// Submap content in id order.
    pub submaps: Vec<(SubmapId, Submap)>,
    /// Node content in id order.
    pub nodes: Vec<(NodeId, TrajectoryNode)>,
    /// Accumulated per-trajectory data.
    pub trajectory_data: BTreeMap<i32, TrajectoryData>,
    /// Observation history per trajectory.
    pub sensor_logs: BTreeMap<i32, SensorLogs>,
}
