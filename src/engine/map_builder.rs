//! The map builder: owns the pose graph, the collator and every trajectory.
//!
//! Trajectory ids are assigned sequentially from 0 by this instance. Every id
//! indexes one [`TrajectoryEntry`] holding both the builder (if any) and the
//! options it was registered with, so the two can never diverge.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{
    AllTrajectoryBuilderOptions, ConfigError, MapBuilderOptions, MapMode,
    TrajectoryBuilderOptions, TrajectoryBuilderOptionsWithSensorIds,
};
use crate::core::{Rigid3d, SensorId, SubmapId};
use crate::error::Result;
use crate::io::{self, LoadPlan, LoadSummary};
use crate::sensor::{Collator, GlobalCollator, TrajectoryCollator};

use super::graph::{
    OptimizationProblem2D, OptimizationProblem3D, OverlappingSubmapsTrimmer2D, PoseGraph,
    PoseGraph2D, PoseGraph3D, PureLocalizationTrimmer,
};
use super::submap::{CellIndex, Submap};
use super::thread_pool::ThreadPool;
use super::trajectory::{
    CollatedTrajectoryBuilder, GlobalTrajectoryBuilder, LocalSlamResultCallback,
    LocalTrajectoryBuilder, SharedCollator,
};

/// Submaps a pure localization trajectory keeps while live.
const PURE_LOCALIZATION_SUBMAPS_TO_KEEP: usize = 3;

/// Submap content and pose returned by submap queries.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmapQueryResponse {
    /// Range data inserted so far.
    pub submap_version: usize,
    /// Pose of the submap origin.
    pub global_pose: Rigid3d,
    /// Grid resolution (m).
    pub resolution: f64,
    /// Whether the submap is finished.
    pub finished: bool,
    /// Hit cells in submap coordinates.
    pub cells: Vec<(CellIndex, u32)>,
}

impl Default for SubmapQueryResponse {
    fn default() -> Self {
        Self {
            submap_version: 0,
            global_pose: Rigid3d::identity(),
            resolution: 0.0,
            finished: false,
            cells: Vec::new(),
        }
    }
}

impl SubmapQueryResponse {
    fn fill(&mut self, submap: &Submap, global_pose: Rigid3d) {
        self.submap_version = submap.num_range_data();
        self.global_pose = global_pose;
        self.resolution = submap.grid().resolution();
        self.finished = submap.is_finished();
        self.cells = submap.grid().cells().collect();
    }
}

struct TrajectoryEntry {
    builder: Option<CollatedTrajectoryBuilder>,
    options: TrajectoryBuilderOptionsWithSensorIds,
    finished: bool,
}

/// Orchestrates trajectories, the pose graph and state persistence.
///
/// # Example
///
/// ```rust,ignore
/// use naksha::config::{MapBuilderOptions, TrajectoryBuilderOptions};
/// use naksha::engine::MapBuilder;
///
/// let mut map_builder = MapBuilder::new(MapBuilderOptions::new_2d())?;
/// let id = map_builder.add_trajectory_builder(&sensor_ids, &TrajectoryBuilderOptions::default(), None);
/// // feed data through map_builder.trajectory_builder(id)
/// map_builder.finish_trajectory(id);
/// map_builder.save_state_to_file("map.naksha")?;
/// ```
pub struct MapBuilder {
    options: MapBuilderOptions,
    mode: MapMode,
    thread_pool: Arc<ThreadPool>,
    pose_graph: Arc<dyn PoseGraph>,
    collator: SharedCollator,
    trajectories: Vec<TrajectoryEntry>,
}

impl MapBuilder {
    /// Build the worker pool, the pose graph for the configured mode and
    /// the selected collator.
    ///
    /// Fails if not exactly one mode is set.
    pub fn new(options: MapBuilderOptions) -> std::result::Result<Self, ConfigError> {
        let mode = options.mode()?;
        let thread_pool = Arc::new(ThreadPool::new(options.num_background_threads));

        let problem_options = options.pose_graph.optimization_problem.clone();
        let pose_graph: Arc<dyn PoseGraph> = match mode {
            MapMode::TwoD => Arc::new(PoseGraph2D::new(
                options.pose_graph.clone(),
                OptimizationProblem2D::new(problem_options),
                Arc::clone(&thread_pool),
            )),
            MapMode::ThreeD => Arc::new(PoseGraph3D::new(
                options.pose_graph.clone(),
                OptimizationProblem3D::new(problem_options),
                Arc::clone(&thread_pool),
            )),
        };

        let collator: Box<dyn Collator> = if options.collate_by_trajectory {
            Box::new(TrajectoryCollator::new())
        } else {
            Box::new(GlobalCollator::new())
        };

        log::info!(
            "Map builder started: {} mode, {} background workers, {} collation",
            mode,
            thread_pool.num_workers(),
            if options.collate_by_trajectory {
                "per-trajectory"
            } else {
                "global"
            }
        );

        Ok(Self {
            options,
            mode,
            thread_pool,
            pose_graph,
            collator: Arc::new(Mutex::new(collator)),
            trajectories: Vec::new(),
        })
    }

    /// Active mode.
    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Options the builder was created with.
    pub fn options(&self) -> &MapBuilderOptions {
        &self.options
    }

    /// The pose graph.
    pub fn pose_graph(&self) -> &Arc<dyn PoseGraph> {
        &self.pose_graph
    }

    /// Worker pool shared with the pose graph.
    pub fn thread_pool(&self) -> &Arc<ThreadPool> {
        &self.thread_pool
    }

    /// Register a live trajectory and return its id.
    ///
    /// Local SLAM runs only if `trajectory_options` configures a local
    /// builder for the active mode. Trimmers and the initial pose requested
    /// by the options are registered with the pose graph.
    pub fn add_trajectory_builder(
        &mut self,
        expected_sensor_ids: &BTreeSet<SensorId>,
        trajectory_options: &TrajectoryBuilderOptions,
        local_slam_result_callback: Option<LocalSlamResultCallback>,
    ) -> i32 {
        let trajectory_id = self.next_trajectory_id();
        self.pose_graph.add_trajectory(trajectory_id);

        let local = trajectory_options
            .local_builder_options(self.mode)
            .map(|local_options| LocalTrajectoryBuilder::new(local_options.clone(), self.mode));
        let global = GlobalTrajectoryBuilder::new(
            trajectory_id,
            Arc::clone(&self.pose_graph),
            local,
            local_slam_result_callback,
        );
        let has_local_slam = global.has_local_slam();
        let builder = CollatedTrajectoryBuilder::new(
            trajectory_id,
            expected_sensor_ids,
            Arc::clone(&self.collator),
            global,
        );

        if let Some(trimmer_options) = &trajectory_options.overlapping_submaps_trimmer_2d {
            match self.mode {
                MapMode::TwoD => {
                    let resolution = trajectory_options.grid_resolution_2d();
                    self.pose_graph
                        .add_trimmer(Box::new(OverlappingSubmapsTrimmer2D::new(
                            trimmer_options.fresh_submaps_count,
                            trimmer_options.min_covered_area / (resolution * resolution),
                            trimmer_options.min_added_submaps_count,
                        )));
                }
                MapMode::ThreeD => log::warn!(
                    "Trajectory {}: overlapping submaps trimmer is 2D only, ignored",
                    trajectory_id
                ),
            }
        }

        if trajectory_options.pure_localization {
            self.pose_graph.add_trimmer(Box::new(PureLocalizationTrimmer::new(
                trajectory_id,
                PURE_LOCALIZATION_SUBMAPS_TO_KEEP,
            )));
        }

        if let Some(initial) = &trajectory_options.initial_trajectory_pose {
            self.pose_graph.set_initial_trajectory_pose(
                trajectory_id,
                initial.to_trajectory_id,
                &initial.relative_pose,
                initial.timestamp_us,
            );
        }

        log::info!(
            "Added trajectory {} with {} sensors (local SLAM: {})",
            trajectory_id,
            expected_sensor_ids.len(),
            has_local_slam
        );

        self.trajectories.push(TrajectoryEntry {
            builder: Some(builder),
            options: TrajectoryBuilderOptionsWithSensorIds {
                sensor_ids: expected_sensor_ids.clone(),
                trajectory_builder_options: trajectory_options.clone(),
            },
            finished: false,
        });
        trajectory_id
    }

    /// Register a trajectory whose content comes from persisted state.
    ///
    /// The slot has no builder; sensor data cannot be fed to it.
    pub fn add_trajectory_for_deserialization(
        &mut self,
        options_with_sensor_ids: &TrajectoryBuilderOptionsWithSensorIds,
    ) -> i32 {
        let trajectory_id = self.next_trajectory_id();
        self.pose_graph.add_trajectory(trajectory_id);
        self.trajectories.push(TrajectoryEntry {
            builder: None,
            options: options_with_sensor_ids.clone(),
            finished: false,
        });
        log::debug!("Added trajectory {} for deserialization", trajectory_id);
        trajectory_id
    }

    /// Builder of a live trajectory. `None` for unknown ids and for
    /// deserialized trajectories.
    pub fn trajectory_builder(&self, trajectory_id: i32) -> Option<&CollatedTrajectoryBuilder> {
        self.entry(trajectory_id)
            .and_then(|entry| entry.builder.as_ref())
    }

    /// No more sensor data will arrive for `trajectory_id`.
    ///
    /// Calling it again for the same trajectory only logs.
    pub fn finish_trajectory(&mut self, trajectory_id: i32) {
        let Some(entry) = usize::try_from(trajectory_id)
            .ok()
            .and_then(|index| self.trajectories.get_mut(index))
        else {
            log::warn!("Cannot finish unknown trajectory {}", trajectory_id);
            return;
        };
        if entry.finished {
            log::warn!("Trajectory {} already finished", trajectory_id);
            return;
        }
        entry.finished = true;

        if entry.builder.is_some() {
            self.collator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .finish_trajectory(trajectory_id);
        }
        self.pose_graph.finish_trajectory(trajectory_id);
        log::info!("Finished trajectory {}", trajectory_id);
    }

    /// Dispatch every observation still held by the collator.
    ///
    /// Every sensor queue is marked finished, so observations added
    /// afterwards, for any trajectory, are dropped. Call it once no more
    /// data is coming.
    pub fn flush_sensor_data(&self) {
        self.collator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush();
    }

    /// Fill `response` with a submap's content and global pose.
    ///
    /// Returns an empty string on success, otherwise a description of the
    /// failure, in which case `response` is untouched.
    pub fn submap_to_response(
        &self,
        submap_id: SubmapId,
        response: &mut SubmapQueryResponse,
    ) -> String {
        let num_trajectories = self.num_trajectory_builders();
        if submap_id.trajectory_id < 0 || submap_id.trajectory_id as usize >= num_trajectories {
            return format!(
                "Requested submap from trajectory {} but there are only {} trajectories.",
                submap_id.trajectory_id, num_trajectories
            );
        }

        match self.pose_graph.submap_data(submap_id) {
            Some(data) => {
                response.fill(&data.submap, data.pose);
                String::new()
            }
            None => format!(
                "Requested submap {} from trajectory {} but it does not exist: maybe it has been trimmed.",
                submap_id.submap_index, submap_id.trajectory_id
            ),
        }
    }

    /// Fill `response` with the newest submap local SLAM inserted into,
    /// at identity pose.
    pub fn local_submap_to_response(&self, response: &mut SubmapQueryResponse) -> String {
        match self.pose_graph.local_current_submap() {
            Some((_, submap)) => {
                response.fill(&submap, Rigid3d::identity());
                String::new()
            }
            None => "Requested local submap but it does not exist: maybe it has not been set."
                .to_string(),
        }
    }

    /// Number of registered trajectories.
    pub fn num_trajectory_builders(&self) -> usize {
        self.trajectories.len()
    }

    /// Options of every trajectory, indexed by trajectory id.
    pub fn all_trajectory_builder_options(&self) -> AllTrajectoryBuilderOptions {
        AllTrajectoryBuilderOptions {
            options_with_sensor_ids: self
                .trajectories
                .iter()
                .map(|entry| entry.options.clone())
                .collect(),
        }
    }

    /// Write the complete state to `writer`.
    pub fn serialize_state<W: Write>(&self, writer: W) -> Result<()> {
        let export = self.pose_graph.export_state();
        let records = io::write_state(writer, &export, &self.all_trajectory_builder_options())?;
        log::info!(
            "Serialized {} trajectories, {} submaps, {} nodes in {} records",
            export.snapshot.trajectories.len(),
            export.submaps.len(),
            export.nodes.len(),
            records
        );
        Ok(())
    }

    /// Write the complete state to a file.
    pub fn save_state_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(io::StreamError::from)?;
        self.serialize_state(BufWriter::new(file))
    }

    /// Merge persisted state into this builder.
    ///
    /// Loaded trajectories get fresh ids after the ones already present. With
    /// `load_frozen` they are read-only and their observation records are
    /// skipped. A failed load leaves the builder untouched.
    pub fn load_state<R: Read>(&mut self, reader: R, load_frozen: bool) -> Result<LoadSummary> {
        let plan = LoadPlan::read(reader)?;
        Ok(plan.apply(self, load_frozen, &[]))
    }

    /// Merge persisted state from a file.
    pub fn load_state_from_file(
        &mut self,
        path: impl AsRef<Path>,
        load_frozen: bool,
    ) -> Result<LoadSummary> {
        let file = File::open(path.as_ref()).map_err(io::StreamError::from)?;
        self.load_state(BufReader::new(file), load_frozen)
    }

    /// Merge persisted state, then override landmark poses from a text
    /// file of `id tx ty tz qx qy qz qw` lines.
    pub fn load_state_with_landmarks<R: Read, L: Read>(
        &mut self,
        reader: R,
        landmark_poses: L,
        load_frozen: bool,
    ) -> Result<LoadSummary> {
        let overrides = io::read_landmark_poses(BufReader::new(landmark_poses))?;
        let plan = LoadPlan::read(reader)?;
        Ok(plan.apply(self, load_frozen, &overrides))
    }

    fn next_trajectory_id(&self) -> i32 {
        self.trajectories.len() as i32
    }

    fn entry(&self, trajectory_id: i32) -> Option<&TrajectoryEntry> {
        usize::try_from(trajectory_id)
            .ok()
            .and_then(|index| self.trajectories.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        InitialTrajectoryPose, LocalTrajectoryBuilderOptions, OverlappingSubmapsTrimmerOptions,
    };
    use crate::core::{SensorData, SensorType, TimedPointCloudData};
    use crate::engine::graph::TrimmerKind;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn range_sensor() -> BTreeSet<SensorId> {
        [SensorId::new(SensorType::Range, "scan")].into_iter().collect()
    }

    fn local_2d() -> TrajectoryBuilderOptions {
        TrajectoryBuilderOptions {
            trajectory_builder_2d: Some(LocalTrajectoryBuilderOptions::default()),
            ..Default::default()
        }
    }

    fn scan(timestamp_us: u64) -> SensorData {
        SensorData::Range(TimedPointCloudData {
            timestamp_us,
            origin: Vector3::zeros(),
            points: vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 2.0, 0.0)],
        })
    }

    #[test]
    fn test_ambiguous_mode_rejected() {
        let mut options = MapBuilderOptions::new_2d();
        options.use_trajectory_builder_3d = true;
        assert!(matches!(
            MapBuilder::new(options),
            Err(ConfigError::AmbiguousMode { .. })
        ));
    }

    #[test]
    fn test_ids_and_options_in_lockstep() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions::new_2d()).unwrap();
        let live = map_builder.add_trajectory_builder(&range_sensor(), &local_2d(), None);
        let loaded = map_builder
            .add_trajectory_for_deserialization(&TrajectoryBuilderOptionsWithSensorIds::default());
        let again = map_builder.add_trajectory_builder(
            &BTreeSet::new(),
            &TrajectoryBuilderOptions::default(),
            None,
        );

        assert_eq!((live, loaded, again), (0, 1, 2));
        assert_eq!(map_builder.num_trajectory_builders(), 3);
        assert_eq!(
            map_builder
                .all_trajectory_builder_options()
                .options_with_sensor_ids
                .len(),
            3
        );
        assert!(map_builder.trajectory_builder(0).is_some());
        assert!(map_builder.trajectory_builder(1).is_none());
        assert!(map_builder.trajectory_builder(3).is_none());
        assert_eq!(map_builder.pose_graph().trajectory_ids(), vec![0, 1, 2]);
    }

    #[test]
    fn test_range_data_builds_submaps() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions {
            num_background_threads: 0,
            ..MapBuilderOptions::new_2d()
        })
        .unwrap();
        let id = map_builder.add_trajectory_builder(&range_sensor(), &local_2d(), None);
        let builder = map_builder.trajectory_builder(id).unwrap();
        for i in 0..5 {
            builder.add_sensor_data("scan", scan(1_000 * (i + 1)));
        }
        map_builder.flush_sensor_data();

        assert_eq!(map_builder.pose_graph().node_poses().len(), 5);

        let mut response = SubmapQueryResponse::default();
        let error = map_builder.submap_to_response(SubmapId::new(id, 0), &mut response);
        assert!(error.is_empty(), "{}", error);
        assert_eq!(response.submap_version, 5);
        assert!(!response.cells.is_empty());

        let mut local = SubmapQueryResponse::default();
        assert!(map_builder.local_submap_to_response(&mut local).is_empty());
        assert_eq!(local.global_pose, Rigid3d::identity());
    }

    #[test]
    fn test_submap_query_errors_leave_response_untouched() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions::new_2d()).unwrap();
        map_builder.add_trajectory_builder(&range_sensor(), &local_2d(), None);

        let mut response = SubmapQueryResponse::default();
        let error = map_builder.submap_to_response(SubmapId::new(4, 0), &mut response);
        assert_eq!(
            error,
            "Requested submap from trajectory 4 but there are only 1 trajectories."
        );
        let error = map_builder.submap_to_response(SubmapId::new(0, 7), &mut response);
        assert!(error.contains("maybe it has been trimmed"));
        assert!(
            !map_builder
                .local_submap_to_response(&mut response)
                .is_empty()
        );
        assert_eq!(response, SubmapQueryResponse::default());
    }

    #[test]
    fn test_trimmer_threshold_scaled_by_resolution() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions::new_2d()).unwrap();
        let mut options = local_2d();
        if let Some(local) = options.trajectory_builder_2d.as_mut() {
            local.submaps.grid_resolution = 0.1;
        }
        options.overlapping_submaps_trimmer_2d = Some(OverlappingSubmapsTrimmerOptions {
            fresh_submaps_count: 2,
            min_covered_area: 3.0,
            min_added_submaps_count: 5,
        });
        options.pure_localization = true;
        map_builder.add_trajectory_builder(&range_sensor(), &options, None);

        let kinds = map_builder.pose_graph().trimmer_kinds();
        assert_eq!(kinds.len(), 2);
        match &kinds[0] {
            TrimmerKind::OverlappingSubmaps {
                fresh_submaps_count,
                min_covered_cells,
                min_added_submaps_count,
            } => {
                assert_eq!(*fresh_submaps_count, 2);
                assert_relative_eq!(*min_covered_cells, 300.0, epsilon = 1e-9);
                assert_eq!(*min_added_submaps_count, 5);
            }
            other => panic!("unexpected trimmer {:?}", other),
        }
        assert_eq!(
            kinds[1],
            TrimmerKind::PureLocalization {
                trajectory_id: 0,
                max_submaps_to_keep: 3
            }
        );
    }

    #[test]
    fn test_overlapping_trimmer_ignored_in_3d() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions::new_3d()).unwrap();
        let options = TrajectoryBuilderOptions {
            overlapping_submaps_trimmer_2d: Some(OverlappingSubmapsTrimmerOptions {
                fresh_submaps_count: 1,
                min_covered_area: 2.0,
                min_added_submaps_count: 1,
            }),
            ..Default::default()
        };
        map_builder.add_trajectory_builder(&range_sensor(), &options, None);
        assert!(map_builder.pose_graph().trimmer_kinds().is_empty());
    }

    #[test]
    fn test_finish_trajectory_is_idempotent() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions::new_2d()).unwrap();
        let id = map_builder.add_trajectory_builder(&range_sensor(), &local_2d(), None);
        map_builder.finish_trajectory(id);
        map_builder.finish_trajectory(id);
        map_builder.finish_trajectory(9);
        assert!(map_builder.pose_graph().is_trajectory_finished(id));
    }

    #[test]
    fn test_initial_pose_forwarded() {
        let mut map_builder = MapBuilder::new(MapBuilderOptions {
            num_background_threads: 0,
            ..MapBuilderOptions::new_2d()
        })
        .unwrap();
        map_builder.add_trajectory_builder(&BTreeSet::new(), &TrajectoryBuilderOptions::default(), None);

        let mut options = local_2d();
        options.initial_trajectory_pose = Some(InitialTrajectoryPose {
            to_trajectory_id: 0,
            relative_pose: Rigid3d::translation(5.0, 0.0, 0.0),
            timestamp_us: 0,
        });
        let id = map_builder.add_trajectory_builder(&range_sensor(), &options, None);
        map_builder
            .trajectory_builder(id)
            .unwrap()
            .add_sensor_data("scan", scan(1_000));

        let poses = map_builder.pose_graph().submap_poses();
        let pose = poses.get(&SubmapId::new(id, 0)).unwrap();
        assert_relative_eq!(pose.translation.vector.x, 5.0, epsilon = 1e-9);
    }
}
