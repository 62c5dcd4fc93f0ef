//! Minimal local SLAM front end.
//!
//! There is no scan matching: the tracking pose is the latest odometry pose.
//! Range data is filtered by distance, moved into the local frame and
//! inserted into the active submaps.
//!
//! # Active submaps
//!
//! At most two submaps are active. A new one starts every `num_range_data`
//! insertions; the older one finishes once it has seen twice that many and
//! is dropped when the next submap starts.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::{LocalTrajectoryBuilderOptions, MapMode};
use crate::core::{ImuData, OdometryData, Rigid3d, TimedPointCloudData, rigid3_from_parts};
use crate::engine::graph::TrajectoryNode;
use crate::engine::submap::Submap;

/// Node content plus the submaps it was inserted into.
#[derive(Debug, Clone)]
pub struct InsertionResult {
    /// Node to add to the pose graph.
    pub node: TrajectoryNode,
    /// `(submap_index, snapshot)` pairs, oldest first.
    pub insertion_submaps: Vec<(i32, Submap)>,
}

/// Outcome of one range data insertion.
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Range data time.
    pub timestamp_us: u64,
    /// Tracking pose in the local frame.
    pub local_pose: Rigid3d,
    /// Filtered points in the local frame.
    pub range_data_in_local: Vec<Vector3<f32>>,
    /// Present when the data was inserted.
    pub insertion_result: Option<InsertionResult>,
}

#[derive(Debug)]
struct ActiveSubmaps {
    submaps: Vec<(i32, Submap)>,
    next_index: i32,
    num_range_data: usize,
    resolution: f64,
}

impl ActiveSubmaps {
    fn new(num_range_data: usize, resolution: f64) -> Self {
        Self {
            submaps: Vec::with_capacity(2),
            next_index: 0,
            num_range_data: num_range_data.max(1),
            resolution,
        }
    }

    fn insert(&mut self, origin: Rigid3d, points_in_local: &[Vector3<f32>]) -> Vec<(i32, Submap)> {
        let needs_new = self
            .submaps
            .last()
            .is_none_or(|(_, submap)| submap.num_range_data() == self.num_range_data);
        if needs_new {
            self.add_submap(origin);
        }
        for (_, submap) in self.submaps.iter_mut() {
            submap.insert_range_data(points_in_local);
        }
        if let Some((_, front)) = self.submaps.first_mut()
            && front.num_range_data() == 2 * self.num_range_data
        {
            front.finish();
        }
        self.submaps.clone()
    }

    fn add_submap(&mut self, origin: Rigid3d) {
        if self.submaps.len() >= 2 {
            self.submaps.remove(0);
        }
        self.submaps
            .push((self.next_index, Submap::new(origin, self.resolution)));
        self.next_index += 1;
    }
}

/// Local trajectory builder for one trajectory.
#[derive(Debug)]
pub struct LocalTrajectoryBuilder {
    options: LocalTrajectoryBuilderOptions,
    mode: MapMode,
    active_submaps: ActiveSubmaps,
    tracking_pose: Rigid3d,
    gravity_alignment: UnitQuaternion<f64>,
}

impl LocalTrajectoryBuilder {
    /// Create a builder.
    pub fn new(options: LocalTrajectoryBuilderOptions, mode: MapMode) -> Self {
        let active_submaps =
            ActiveSubmaps::new(options.submaps.num_range_data, options.submaps.grid_resolution);
        Self {
            options,
            mode,
            active_submaps,
            tracking_pose: Rigid3d::identity(),
            gravity_alignment: UnitQuaternion::identity(),
        }
    }

    /// Current tracking pose in the local frame.
    pub fn tracking_pose(&self) -> Rigid3d {
        self.tracking_pose
    }

    /// Update gravity alignment from an IMU reading.
    pub fn add_imu_data(&mut self, imu: &ImuData) {
        if let Some(alignment) =
            UnitQuaternion::rotation_between(&imu.linear_acceleration, &Vector3::z())
        {
            self.gravity_alignment = alignment;
        }
    }

    /// Update the tracking pose from odometry.
    pub fn add_odometry_data(&mut self, odometry: &OdometryData) {
        self.tracking_pose = match self.mode {
            MapMode::TwoD => crate::core::project_to_plane(&odometry.pose),
            MapMode::ThreeD => odometry.pose,
        };
    }

    /// Filter and insert range data.
    ///
    /// Returns `None` when every point was filtered out.
    pub fn add_range_data(&mut self, sensor_id: &str, data: &TimedPointCloudData) -> Option<MatchingResult> {
        let min_range = self.options.min_range;
        let max_range = self.options.max_range;
        let filtered: Vec<Vector3<f32>> = data
            .points
            .iter()
            .filter(|point| {
                let range = (*point - data.origin).norm();
                range >= min_range && range <= max_range
            })
            .map(|point| match self.mode {
                MapMode::TwoD => Vector3::new(point.x, point.y, 0.0),
                MapMode::ThreeD => *point,
            })
            .collect();
        if filtered.is_empty() {
            log::warn!(
                "Dropped empty range data from {} at {}",
                sensor_id,
                data.timestamp_us
            );
            return None;
        }

        let range_data_in_local: Vec<Vector3<f32>> = filtered
            .iter()
            .map(|point| {
                let local = self
                    .tracking_pose
                    .transform_point(&Vector3::new(point.x as f64, point.y as f64, point.z as f64).into());
                Vector3::new(local.x as f32, local.y as f32, local.z as f32)
            })
            .collect();

        let origin = rigid3_from_parts(
            self.tracking_pose.translation.vector,
            UnitQuaternion::identity(),
        );
        let insertion_submaps = self.active_submaps.insert(origin, &range_data_in_local);

        Some(MatchingResult {
            timestamp_us: data.timestamp_us,
            local_pose: self.tracking_pose,
            range_data_in_local,
            insertion_result: Some(InsertionResult {
                node: TrajectoryNode {
                    timestamp_us: data.timestamp_us,
                    local_pose: self.tracking_pose,
                    gravity_alignment: self.gravity_alignment,
                    filtered_points: filtered,
                },
                insertion_submaps,
            }),
        })
    }
}
