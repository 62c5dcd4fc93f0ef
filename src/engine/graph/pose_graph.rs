//! Capability contract shared by the 2D and 3D pose graphs.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MapMode;
use crate::core::{
    FixedFramePoseData, ImuData, LandmarkData, NodeId, OdometryData, Rigid3d, SubmapId,
};
use crate::engine::submap::Submap;

use super::constraint_finder::ConstraintFinder;
use super::optimization::OptimizationSummary;
use super::trimmer::{Trimmer, TrimmerKind};
use super::types::{
    Constraint, NodeMembership, PoseGraphSnapshot, SensorLogCounts, SensorLogs, StateExport,
    SubmapData, TrajectoryData, TrajectoryNode,
};

/// Owner of submaps, nodes, constraints and landmark poses.
///
/// Implementations are internally synchronized: every method takes `&self`
/// and may be called from any thread, concurrently with a background
/// optimization. Readers see poses from before or after a pass, never a mix.
pub trait PoseGraph: Send + Sync {
    /// Mode fixed at construction.
    fn mode(&self) -> MapMode;

    /// Make a trajectory known to the graph, even before it has content.
    fn add_trajectory(&self, trajectory_id: i32);

    /// Ids of every known trajectory, ascending.
    fn trajectory_ids(&self) -> Vec<i32>;

    /// Add a node produced by local SLAM.
    ///
    /// `insertion_submaps` are `(submap_index, content)` pairs for the
    /// submaps the node was inserted into, oldest first. Returns `None` if
    /// the trajectory is frozen or finished.
    fn add_node(
        &self,
        trajectory_id: i32,
        node: TrajectoryNode,
        insertion_submaps: Vec<(i32, Submap)>,
    ) -> Option<NodeId>;

    /// Record an IMU reading.
    fn add_imu_data(&self, trajectory_id: i32, data: ImuData);

    /// Record an odometry pose.
    fn add_odometry_data(&self, trajectory_id: i32, data: OdometryData);

    /// Record a fixed-frame pose.
    fn add_fixed_frame_pose_data(&self, trajectory_id: i32, data: FixedFramePoseData);

    /// Record landmark observations.
    fn add_landmark_data(&self, trajectory_id: i32, data: LandmarkData);

    /// No more data will arrive for the trajectory. Its submaps finish.
    fn finish_trajectory(&self, trajectory_id: i32);

    /// Make the trajectory read-only.
    fn freeze_trajectory(&self, trajectory_id: i32);

    /// Whether the trajectory is frozen.
    fn is_trajectory_frozen(&self, trajectory_id: i32) -> bool;

    /// Whether the trajectory is finished.
    fn is_trajectory_finished(&self, trajectory_id: i32) -> bool;

    /// Declare `from`'s origin as `relative_pose` in `to`'s frame.
    fn set_initial_trajectory_pose(
        &self,
        from_trajectory_id: i32,
        to_trajectory_id: i32,
        relative_pose: &Rigid3d,
        timestamp_us: u64,
    );

    /// Set or replace a landmark's global pose.
    fn set_landmark_pose(&self, landmark_id: &str, global_pose: &Rigid3d);

    /// All landmark poses.
    fn landmark_poses(&self) -> BTreeMap<String, Rigid3d>;

    /// Materialize a deserialized submap. It is always finished.
    fn add_submap_from_payload(&self, global_pose: &Rigid3d, submap_id: SubmapId, submap: Submap);

    /// Materialize a deserialized node.
    fn add_node_from_payload(&self, global_pose: &Rigid3d, node_id: NodeId, node: TrajectoryNode);

    /// Replace a trajectory's accumulated data.
    fn set_trajectory_data(&self, trajectory_id: i32, data: TrajectoryData);

    /// Append deserialized observations to the trajectory's history.
    ///
    /// Unlike the `add_*_data` methods nothing is derived from them: landmark
    /// poses and trajectory data arrive with the rest of the stored state.
    fn extend_sensor_logs(&self, trajectory_id: i32, logs: SensorLogs);

    /// Register that a node belongs to a submap, without a constraint.
    fn add_node_to_submap(&self, node_id: NodeId, submap_id: SubmapId);

    /// Bulk-ingest constraints. Intra-submap ones also establish membership.
    fn add_serialized_constraints(&self, constraints: Vec<Constraint>);

    /// Register a trimmer.
    fn add_trimmer(&self, trimmer: Box<dyn Trimmer>);

    /// Configurations of the registered, unfinished trimmers.
    fn trimmer_kinds(&self) -> Vec<TrimmerKind>;

    /// Submap content and global pose, if the submap is live.
    fn submap_data(&self, submap_id: SubmapId) -> Option<SubmapData>;

    /// Newest submap local SLAM inserted into.
    fn local_current_submap(&self) -> Option<(SubmapId, Submap)>;

    /// Global pose of every live submap.
    fn submap_poses(&self) -> BTreeMap<SubmapId, Rigid3d>;

    /// Global pose of every live node.
    fn node_poses(&self) -> BTreeMap<NodeId, Rigid3d>;

    /// Every constraint.
    fn constraints(&self) -> Vec<Constraint>;

    /// Nodes belonging to each live submap.
    fn node_membership(&self) -> NodeMembership;

    /// Accumulated data per trajectory.
    fn trajectory_data(&self) -> BTreeMap<i32, TrajectoryData>;

    /// Stored observation counts of one trajectory.
    fn sensor_log_counts(&self, trajectory_id: i32) -> SensorLogCounts;

    /// Stored observations of every trajectory.
    fn sensor_logs(&self) -> BTreeMap<i32, SensorLogs>;

    /// Install or remove the loop-closure search.
    fn set_constraint_finder(&self, finder: Option<Arc<dyn ConstraintFinder>>);

    /// Wait for background work, then optimize once synchronously.
    fn run_final_optimization(&self) -> OptimizationSummary;

    /// Optimizations run so far.
    fn num_optimizations(&self) -> usize;

    /// Structure of the graph without content.
    fn to_snapshot(&self) -> PoseGraphSnapshot;

    /// Content of every live submap.
    fn submap_payloads(&self) -> Vec<(SubmapId, Submap)>;

    /// Content of every live node.
    fn node_payloads(&self) -> Vec<(NodeId, TrajectoryNode)>;

    /// Snapshot, payloads and observation history in one consistent read.
    fn export_state(&self) -> StateExport;
}
