//! Pose graph backed by an injected optimization problem.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::config::{InitialTrajectoryPose, MapMode, PoseGraphOptions};
use crate::core::{
    FixedFramePoseData, ImuData, LandmarkData, NodeId, OdometryData, Rigid3d, SubmapId,
    TrajectoryIndexed,
};
use crate::engine::submap::Submap;
use crate::engine::thread_pool::ThreadPool;

use super::constraint_finder::{ConstraintFinder, NodeContext};
use super::data::{InternalNode, InternalSubmap, PoseGraphData};
use super::optimization::{
    OptimizationProblem, OptimizationProblem2D, OptimizationProblem3D, OptimizationSummary,
};
use super::pose_graph::PoseGraph;
use super::trimmer::{SubmapView, Trimmable, Trimmer, TrimmerKind};
use super::types::{
    Constraint, LandmarkPose, NodeMembership, NodePose, PoseGraphSnapshot, SensorLogCounts,
    SensorLogs, StateExport, SubmapData, SubmapPose, TrajectoryData, TrajectoryNode,
    TrajectorySnapshot,
};

/// 2D pose graph.
pub type PoseGraph2D = OptimizingPoseGraph<OptimizationProblem2D>;

/// 3D pose graph.
pub type PoseGraph3D = OptimizingPoseGraph<OptimizationProblem3D>;

/// Pose graph whose optimization runs on a shared worker pool.
pub struct OptimizingPoseGraph<O: OptimizationProblem> {
    options: PoseGraphOptions,
    data: Arc<Mutex<PoseGraphData>>,
    problem: Arc<O>,
    pool: Arc<ThreadPool>,
    constraint_finder: RwLock<Option<Arc<dyn ConstraintFinder>>>,
}

impl<O: OptimizationProblem> OptimizingPoseGraph<O> {
    /// Create an empty graph.
    pub fn new(options: PoseGraphOptions, problem: O, pool: Arc<ThreadPool>) -> Self {
        let mode = problem.mode();
        Self {
            options,
            data: Arc::new(Mutex::new(PoseGraphData::new(mode))),
            problem: Arc::new(problem),
            pool,
            constraint_finder: RwLock::new(None),
        }
    }

    /// Options the graph was built with.
    pub fn options(&self) -> &PoseGraphOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, PoseGraphData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn constraint_finder(&self) -> Option<Arc<dyn ConstraintFinder>> {
        self.constraint_finder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn schedule_optimization(&self) {
        let data = Arc::clone(&self.data);
        let problem = Arc::clone(&self.problem);
        self.pool.schedule(move || {
            let mut data = data.lock().unwrap_or_else(PoisonError::into_inner);
            let summary = problem.solve(&mut data);
            log::debug!(
                "Background optimization: {} nodes, error {:.4} -> {:.4}",
                summary.nodes_updated,
                summary.initial_error,
                summary.final_error
            );
        });
    }

    /// Whether observation data may still be attributed to the trajectory.
    fn accepts_observations(data: &PoseGraphData, trajectory_id: i32, kind: &str) -> bool {
        if data.is_frozen(trajectory_id) {
            log::debug!(
                "Dropping {} data for frozen trajectory {}",
                kind,
                trajectory_id
            );
            return false;
        }
        true
    }

    fn latest_node_pose(data: &PoseGraphData, trajectory_id: i32) -> Option<Rigid3d> {
        data.nodes
            .last_of(trajectory_id)
            .map(|(_, node)| node.global_pose)
    }
}

impl<O: OptimizationProblem> PoseGraph for OptimizingPoseGraph<O> {
    fn mode(&self) -> MapMode {
        self.problem.mode()
    }

    fn add_trajectory(&self, trajectory_id: i32) {
        self.lock().trajectory_mut(trajectory_id);
    }

    fn trajectory_ids(&self) -> Vec<i32> {
        self.lock().trajectories.keys().copied().collect()
    }

    fn add_node(
        &self,
        trajectory_id: i32,
        node: TrajectoryNode,
        insertion_submaps: Vec<(i32, Submap)>,
    ) -> Option<NodeId> {
        let finder = self.constraint_finder();
        let mut data = self.lock();
        if data.is_frozen(trajectory_id) || data.is_trajectory_finished(trajectory_id) {
            log::warn!(
                "Dropping node for trajectory {}: frozen or finished",
                trajectory_id
            );
            return None;
        }
        data.trajectory_mut(trajectory_id);

        let local_to_global = data.local_to_global(trajectory_id);
        let mut live_submaps = Vec::with_capacity(insertion_submaps.len());
        for (index, submap) in insertion_submaps {
            let submap_id = SubmapId::new(trajectory_id, index);
            if let Some(existing) = data.submaps.get_mut(&submap_id) {
                existing.submap = submap;
            } else if index >= data.submaps.next_index(trajectory_id) {
                let global_pose = data.canonical(&(local_to_global * submap.local_pose));
                let inserted = data.submaps.insert(
                    submap_id,
                    InternalSubmap {
                        submap,
                        global_pose,
                        node_ids: BTreeSet::new(),
                    },
                );
                if inserted.is_err() {
                    continue;
                }
            } else {
                // Already trimmed.
                continue;
            }
            live_submaps.push(submap_id);
        }

        let mut node = node;
        node.local_pose = data.canonical(&node.local_pose);
        let global_pose = data.canonical(&(local_to_global * node.local_pose));
        let local_pose = node.local_pose;
        let node_id = data.nodes.append(
            trajectory_id,
            InternalNode {
                node,
                global_pose,
            },
        );

        for submap_id in &live_submaps {
            let Some(submap) = data.submaps.get(submap_id) else {
                continue;
            };
            let relative_pose = submap.submap.local_pose.inverse() * local_pose;
            data.add_constraint(Constraint::intra(*submap_id, node_id, relative_pose));
        }
        if let Some(newest) = live_submaps.last() {
            data.current_local_submap = Some(*newest);
        }

        if let Some(finder) = finder {
            let found = {
                let views: Vec<SubmapView<'_>> = data
                    .submap_views()
                    .into_iter()
                    .filter(|view| view.submap.is_finished())
                    .collect();
                match data.nodes.get(&node_id) {
                    Some(internal) => finder.find_constraints(
                        &NodeContext {
                            node_id,
                            global_pose,
                            node: &internal.node,
                        },
                        &views,
                    ),
                    None => Vec::new(),
                }
            };
            for constraint in found {
                data.add_constraint(constraint);
            }
        }

        data.run_trimmers();

        data.num_nodes_since_optimization += 1;
        let every_n = self.options.optimize_every_n_nodes;
        let should_optimize = every_n > 0 && data.num_nodes_since_optimization >= every_n;
        if should_optimize {
            data.num_nodes_since_optimization = 0;
        }
        drop(data);

        if should_optimize {
            self.schedule_optimization();
        }
        Some(node_id)
    }

    fn add_imu_data(&self, trajectory_id: i32, imu: ImuData) {
        let mut data = self.lock();
        if !Self::accepts_observations(&data, trajectory_id, "IMU") {
            return;
        }
        let magnitude = imu.linear_acceleration.norm();
        let logs = data.sensor_logs.entry(trajectory_id).or_default();
        logs.imu.push(imu);
        let count = logs.imu.len() as f64;
        let entry = data.trajectory_data.entry(trajectory_id).or_default();
        entry.gravity_constant += (magnitude - entry.gravity_constant) / count;
    }

    fn add_odometry_data(&self, trajectory_id: i32, odometry: OdometryData) {
        let mut data = self.lock();
        if !Self::accepts_observations(&data, trajectory_id, "odometry") {
            return;
        }
        data.sensor_logs
            .entry(trajectory_id)
            .or_default()
            .odometry
            .push(odometry);
    }

    fn add_fixed_frame_pose_data(&self, trajectory_id: i32, fixed_frame: FixedFramePoseData) {
        let mut data = self.lock();
        if !Self::accepts_observations(&data, trajectory_id, "fixed frame pose") {
            return;
        }
        if let Some(pose) = fixed_frame.pose
            && let Some(tracking) = Self::latest_node_pose(&data, trajectory_id)
        {
            let entry = data.trajectory_data.entry(trajectory_id).or_default();
            if entry.fixed_frame_origin_in_map.is_none() {
                entry.fixed_frame_origin_in_map = Some(tracking * pose.inverse());
            }
        }
        data.sensor_logs
            .entry(trajectory_id)
            .or_default()
            .fixed_frame_pose
            .push(fixed_frame);
    }

    fn add_landmark_data(&self, trajectory_id: i32, landmark: LandmarkData) {
        let mut data = self.lock();
        if !Self::accepts_observations(&data, trajectory_id, "landmark") {
            return;
        }
        if let Some(tracking) = Self::latest_node_pose(&data, trajectory_id) {
            for observation in &landmark.observations {
                data.landmark_poses
                    .entry(observation.id.clone())
                    .or_insert(tracking * observation.landmark_to_tracking_transform);
            }
        }
        data.sensor_logs
            .entry(trajectory_id)
            .or_default()
            .landmark
            .push(landmark);
    }

    fn finish_trajectory(&self, trajectory_id: i32) {
        let mut data = self.lock();
        data.trajectory_mut(trajectory_id).finished = true;
        let ids: Vec<SubmapId> = data.submap_ids(trajectory_id);
        for submap_id in ids {
            if let Some(internal) = data.submaps.get_mut(&submap_id) {
                internal.submap.finish();
            }
        }
        data.run_trimmers();
    }

    fn freeze_trajectory(&self, trajectory_id: i32) {
        self.lock().trajectory_mut(trajectory_id).frozen = true;
    }

    fn is_trajectory_frozen(&self, trajectory_id: i32) -> bool {
        self.lock().is_frozen(trajectory_id)
    }

    fn is_trajectory_finished(&self, trajectory_id: i32) -> bool {
        self.lock().is_trajectory_finished(trajectory_id)
    }

    fn set_initial_trajectory_pose(
        &self,
        from_trajectory_id: i32,
        to_trajectory_id: i32,
        relative_pose: &Rigid3d,
        timestamp_us: u64,
    ) {
        let mut data = self.lock();
        let relative_pose = data.canonical(relative_pose);
        data.trajectory_mut(from_trajectory_id).initial_pose = Some(InitialTrajectoryPose {
            to_trajectory_id,
            relative_pose,
            timestamp_us,
        });
    }

    fn set_landmark_pose(&self, landmark_id: &str, global_pose: &Rigid3d) {
        self.lock()
            .landmark_poses
            .insert(landmark_id.to_string(), *global_pose);
    }

    fn landmark_poses(&self) -> BTreeMap<String, Rigid3d> {
        self.lock().landmark_poses.clone()
    }

    fn add_submap_from_payload(&self, global_pose: &Rigid3d, submap_id: SubmapId, submap: Submap) {
        let mut data = self.lock();
        data.trajectory_mut(submap_id.trajectory_id());
        let mut submap = submap;
        submap.finish();
        let global_pose = data.canonical(global_pose);
        let inserted = data.submaps.insert(
            submap_id,
            InternalSubmap {
                submap,
                global_pose,
                node_ids: BTreeSet::new(),
            },
        );
        if let Err(e) = inserted {
            log::error!("Submap payload rejected: {}", e);
        }
    }

    fn add_node_from_payload(&self, global_pose: &Rigid3d, node_id: NodeId, node: TrajectoryNode) {
        let mut data = self.lock();
        data.trajectory_mut(node_id.trajectory_id());
        let global_pose = data.canonical(global_pose);
        let inserted = data
            .nodes
            .insert(node_id, InternalNode { node, global_pose });
        if let Err(e) = inserted {
            log::error!("Node payload rejected: {}", e);
        }
    }

    fn set_trajectory_data(&self, trajectory_id: i32, trajectory_data: TrajectoryData) {
        self.lock()
            .trajectory_data
            .insert(trajectory_id, trajectory_data);
    }

    fn extend_sensor_logs(&self, trajectory_id: i32, logs: SensorLogs) {
        let mut data = self.lock();
        let stored = data.sensor_logs.entry(trajectory_id).or_default();
        stored.imu.extend(logs.imu);
        stored.odometry.extend(logs.odometry);
        stored.fixed_frame_pose.extend(logs.fixed_frame_pose);
        stored.landmark.extend(logs.landmark);
    }

    fn add_node_to_submap(&self, node_id: NodeId, submap_id: SubmapId) {
        self.lock().add_node_to_submap(node_id, submap_id);
    }

    fn add_serialized_constraints(&self, constraints: Vec<Constraint>) {
        let mut data = self.lock();
        let count = constraints.len();
        for constraint in constraints {
            data.add_constraint(constraint);
        }
        log::debug!("Ingested {} serialized constraints", count);
    }

    fn add_trimmer(&self, trimmer: Box<dyn Trimmer>) {
        log::info!("Registered trimmer {:?}", trimmer.kind());
        self.lock().trimmers.push(trimmer);
    }

    fn trimmer_kinds(&self) -> Vec<TrimmerKind> {
        self.lock()
            .trimmers
            .iter()
            .map(|trimmer| trimmer.kind())
            .collect()
    }

    fn submap_data(&self, submap_id: SubmapId) -> Option<SubmapData> {
        self.lock()
            .submaps
            .get(&submap_id)
            .map(|internal| SubmapData {
                submap: internal.submap.clone(),
                pose: internal.global_pose,
            })
    }

    fn local_current_submap(&self) -> Option<(SubmapId, Submap)> {
        let data = self.lock();
        let submap_id = data.current_local_submap?;
        data.submaps
            .get(&submap_id)
            .map(|internal| (submap_id, internal.submap.clone()))
    }

    fn submap_poses(&self) -> BTreeMap<SubmapId, Rigid3d> {
        self.lock()
            .submaps
            .iter()
            .map(|(id, internal)| (*id, internal.global_pose))
            .collect()
    }

    fn node_poses(&self) -> BTreeMap<NodeId, Rigid3d> {
        self.lock()
            .nodes
            .iter()
            .map(|(id, internal)| (*id, internal.global_pose))
            .collect()
    }

    fn constraints(&self) -> Vec<Constraint> {
        self.lock().constraints.clone()
    }

    fn node_membership(&self) -> NodeMembership {
        self.lock()
            .submaps
            .iter()
            .map(|(id, internal)| (*id, internal.node_ids.clone()))
            .collect()
    }

    fn trajectory_data(&self) -> BTreeMap<i32, TrajectoryData> {
        self.lock().trajectory_data.clone()
    }

    fn sensor_log_counts(&self, trajectory_id: i32) -> SensorLogCounts {
        self.lock()
            .sensor_logs
            .get(&trajectory_id)
            .map(SensorLogs::counts)
            .unwrap_or_default()
    }

    fn sensor_logs(&self) -> BTreeMap<i32, SensorLogs> {
        self.lock().sensor_logs.clone()
    }

    fn set_constraint_finder(&self, finder: Option<Arc<dyn ConstraintFinder>>) {
        *self
            .constraint_finder
            .write()
            .unwrap_or_else(PoisonError::into_inner) = finder;
    }

    fn run_final_optimization(&self) -> OptimizationSummary {
        self.pool.wait_until_idle();
        let mut data = self.lock();
        let summary = self.problem.solve(&mut data);
        log::info!(
            "Final optimization: {} iterations, {} nodes, error {:.4} -> {:.4}",
            summary.iterations,
            summary.nodes_updated,
            summary.initial_error,
            summary.final_error
        );
        summary
    }

    fn num_optimizations(&self) -> usize {
        self.lock().num_optimizations
    }

    fn to_snapshot(&self) -> PoseGraphSnapshot {
        snapshot_of(&self.lock())
    }

    fn submap_payloads(&self) -> Vec<(SubmapId, Submap)> {
        submap_payloads_of(&self.lock())
    }

    fn node_payloads(&self) -> Vec<(NodeId, TrajectoryNode)> {
        node_payloads_of(&self.lock())
    }

    fn export_state(&self) -> StateExport {
        let data = self.lock();
        StateExport {
            snapshot: snapshot_of(&data),
            submaps: submap_payloads_of(&data),
            nodes: node_payloads_of(&data),
            trajectory_data: data.trajectory_data.clone(),
            sensor_logs: data.sensor_logs.clone(),
        }
    }
}

fn snapshot_of(data: &PoseGraphData) -> PoseGraphSnapshot {
    let trajectories = data
        .trajectories
        .keys()
        .map(|&trajectory_id| TrajectorySnapshot {
            trajectory_id,
            submaps: data
                .submaps
                .trajectory(trajectory_id)
                .map(|(id, internal)| SubmapPose {
                    submap_index: id.submap_index,
                    pose: internal.global_pose,
                })
                .collect(),
            nodes: data
                .nodes
                .trajectory(trajectory_id)
                .map(|(id, internal)| NodePose {
                    node_index: id.node_index,
                    timestamp_us: internal.node.timestamp_us,
                    pose: internal.global_pose,
                })
                .collect(),
        })
        .collect();
    PoseGraphSnapshot {
        trajectories,
        constraints: data.constraints.clone(),
        landmark_poses: data
            .landmark_poses
            .iter()
            .map(|(landmark_id, global_pose)| LandmarkPose {
                landmark_id: landmark_id.clone(),
                global_pose: *global_pose,
            })
            .collect(),
    }
}

fn submap_payloads_of(data: &PoseGraphData) -> Vec<(SubmapId, Submap)> {
    data.submaps
        .iter()
        .map(|(id, internal)| (*id, internal.submap.clone()))
        .collect()
}

fn node_payloads_of(data: &PoseGraphData) -> Vec<(NodeId, TrajectoryNode)> {
    data.nodes
        .iter()
        .map(|(id, internal)| (*id, internal.node.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizationProblemOptions;
    use crate::core::{LandmarkObservation, rigid3_from_parts};
    use crate::engine::graph::{ConstraintTag, PureLocalizationTrimmer};
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    fn at(x: f64, y: f64) -> Rigid3d {
        rigid3_from_parts(Vector3::new(x, y, 0.0), UnitQuaternion::identity())
    }

    fn node(timestamp_us: u64, local_pose: Rigid3d) -> TrajectoryNode {
        TrajectoryNode {
            timestamp_us,
            local_pose,
            gravity_alignment: UnitQuaternion::identity(),
            filtered_points: vec![Vector3::new(1.0, 0.0, 0.0)],
        }
    }

    fn graph_2d(optimize_every_n_nodes: usize) -> PoseGraph2D {
        let options = PoseGraphOptions {
            optimize_every_n_nodes,
            optimization_problem: OptimizationProblemOptions::default(),
        };
        PoseGraph2D::new(
            options,
            OptimizationProblem2D::new(OptimizationProblemOptions::default()),
            Arc::new(ThreadPool::new(0)),
        )
    }

    fn finished_submap(local_pose: Rigid3d) -> Submap {
        let mut submap = Submap::new(local_pose, 0.05);
        submap.finish();
        submap
    }

    #[test]
    fn test_add_node_creates_submap_and_intra_constraint() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        let submap = Submap::new(Rigid3d::identity(), 0.05);
        let node_id = graph
            .add_node(0, node(1, at(1.0, 0.0)), vec![(0, submap)])
            .unwrap();

        assert_eq!(node_id, NodeId::new(0, 0));
        assert_eq!(graph.submap_poses().len(), 1);
        let constraints = graph.constraints();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].tag, ConstraintTag::IntraSubmap);
        assert_relative_eq!(constraints[0].relative_pose.translation.vector.x, 1.0);

        let membership = graph.node_membership();
        assert!(membership[&SubmapId::new(0, 0)].contains(&node_id));
        assert_eq!(
            graph.local_current_submap().map(|(id, _)| id),
            Some(SubmapId::new(0, 0))
        );
    }

    #[test]
    fn test_new_trajectory_anchors_on_initial_pose() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        graph.add_node(0, node(1, Rigid3d::identity()), vec![(0, Submap::new(at(0.0, 0.0), 0.05))]);
        graph.set_initial_trajectory_pose(1, 0, &at(0.0, 3.0), 0);
        let node_id = graph
            .add_node(1, node(2, at(1.0, 0.0)), vec![(0, Submap::new(Rigid3d::identity(), 0.05))])
            .unwrap();

        let pose = graph.node_poses()[&node_id];
        assert_relative_eq!(pose.translation.vector.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(pose.translation.vector.y, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frozen_trajectory_drops_observations() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        graph.freeze_trajectory(0);
        graph.add_imu_data(0, ImuData::default());
        graph.add_odometry_data(0, OdometryData::identity(1));
        assert_eq!(graph.sensor_log_counts(0).total(), 0);
        assert!(graph.add_node(0, node(1, Rigid3d::identity()), Vec::new()).is_none());
    }

    #[test]
    fn test_observations_recorded() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        graph.add_node(0, node(1, at(2.0, 0.0)), vec![(0, Submap::new(Rigid3d::identity(), 0.05))]);
        graph.add_imu_data(0, ImuData::default());
        graph.add_landmark_data(
            0,
            LandmarkData {
                timestamp_us: 2,
                observations: vec![LandmarkObservation {
                    id: "door".to_string(),
                    landmark_to_tracking_transform: at(1.0, 0.0),
                    translation_weight: 1.0,
                    rotation_weight: 1.0,
                }],
            },
        );

        let counts = graph.sensor_log_counts(0);
        assert_eq!(counts.imu, 1);
        assert_eq!(counts.landmark, 1);
        assert_relative_eq!(graph.trajectory_data()[&0].gravity_constant, 9.81, epsilon = 1e-9);
        assert_relative_eq!(graph.landmark_poses()["door"].translation.vector.x, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_payload_ingestion_and_membership() {
        let graph = graph_2d(0);
        let submap_id = SubmapId::new(3, 0);
        let node_id = NodeId::new(3, 0);
        graph.add_submap_from_payload(&at(1.0, 1.0), submap_id, Submap::new(Rigid3d::identity(), 0.05));
        graph.add_node_from_payload(&at(1.5, 1.0), node_id, node(1, Rigid3d::identity()));
        graph.add_node_to_submap(node_id, submap_id);

        let data = graph.submap_data(submap_id).unwrap();
        assert!(data.submap.is_finished());
        assert!(graph.constraints().is_empty());
        assert!(graph.node_membership()[&submap_id].contains(&node_id));
        assert_eq!(graph.trajectory_ids(), vec![3]);
    }

    #[test]
    fn test_finish_runs_pure_localization_trimmer() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        graph.add_trimmer(Box::new(PureLocalizationTrimmer::new(0, 3)));
        for index in 0..4 {
            graph.add_submap_from_payload(
                &at(index as f64, 0.0),
                SubmapId::new(0, index),
                finished_submap(Rigid3d::identity()),
            );
        }
        assert_eq!(graph.trimmer_kinds().len(), 1);

        graph.finish_trajectory(0);
        assert!(graph.submap_poses().is_empty());
        assert!(graph.trimmer_kinds().is_empty());
    }

    #[test]
    fn test_background_optimization_scheduled() {
        let graph = graph_2d(2);
        graph.add_trajectory(0);
        for i in 0..4 {
            graph.add_node(
                0,
                node(i, at(i as f64, 0.0)),
                vec![(0, Submap::new(Rigid3d::identity(), 0.05))],
            );
        }
        assert_eq!(graph.num_optimizations(), 2);
        graph.run_final_optimization();
        assert_eq!(graph.num_optimizations(), 3);
    }

    #[test]
    fn test_snapshot_lists_empty_trajectories() {
        let graph = graph_2d(0);
        graph.add_trajectory(0);
        graph.add_trajectory(1);
        graph.add_node(1, node(5, Rigid3d::identity()), vec![(0, Submap::new(Rigid3d::identity(), 0.05))]);

        let snapshot = graph.to_snapshot();
        assert_eq!(snapshot.trajectories.len(), 2);
        assert!(snapshot.trajectories[0].nodes.is_empty());
        assert_eq!(snapshot.trajectories[1].nodes[0].timestamp_us, 5);
        assert_eq!(snapshot.num_submaps(), 1);
    }
}
