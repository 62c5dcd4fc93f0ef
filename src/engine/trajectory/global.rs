//! Connects local SLAM to the pose graph.

use std::sync::Arc;

use crate::core::{NodeId, Rigid3d, SensorData};
use crate::engine::graph::PoseGraph;

use super::local::LocalTrajectoryBuilder;

/// Called after every processed range data:
/// `(trajectory_id, timestamp_us, local_pose, node_id)`.
///
/// `node_id` is `None` when the data did not produce a node.
pub type LocalSlamResultCallback = Box<dyn FnMut(i32, u64, &Rigid3d, Option<NodeId>) + Send>;

/// Feeds collated sensor data to local SLAM and the pose graph.
pub struct GlobalTrajectoryBuilder {
    trajectory_id: i32,
    pose_graph: Arc<dyn PoseGraph>,
    local: Option<LocalTrajectoryBuilder>,
    callback: Option<LocalSlamResultCallback>,
}

impl GlobalTrajectoryBuilder {
    /// Create a builder. Without `local`, range data is ignored.
    pub fn new(
        trajectory_id: i32,
        pose_graph: Arc<dyn PoseGraph>,
        local: Option<LocalTrajectoryBuilder>,
        callback: Option<LocalSlamResultCallback>,
    ) -> Self {
        Self {
            trajectory_id,
            pose_graph,
            local,
            callback,
        }
    }

    /// Trajectory this builder feeds.
    pub fn trajectory_id(&self) -> i32 {
        self.trajectory_id
    }

    /// Whether local SLAM is running.
    pub fn has_local_slam(&self) -> bool {
        self.local.is_some()
    }

    /// Route one collated observation.
    pub fn add_sensor_data(&mut self, sensor_id: &str, data: SensorData) {
        match data {
            SensorData::Range(range) => {
                let Some(local) = self.local.as_mut() else {
                    log::warn!(
                        "Trajectory {} has no local SLAM, ignoring range data from {}",
                        self.trajectory_id,
                        sensor_id
                    );
                    return;
                };
                let Some(result) = local.add_range_data(sensor_id, &range) else {
                    return;
                };
                let node_id = result.insertion_result.and_then(|insertion| {
                    self.pose_graph.add_node(
                        self.trajectory_id,
                        insertion.node,
                        insertion.insertion_submaps,
                    )
                });
                if let Some(callback) = self.callback.as_mut() {
                    callback(
                        self.trajectory_id,
                        result.timestamp_us,
                        &result.local_pose,
                        node_id,
                    );
                }
            }
            SensorData::Imu(imu) => {
                if let Some(local) = self.local.as_mut() {
                    local.add_imu_data(&imu);
                }
                self.pose_graph.add_imu_data(self.trajectory_id, imu);
            }
            SensorData::Odometry(odometry) => {
                if let Some(local) = self.local.as_mut() {
                    local.add_odometry_data(&odometry);
                }
                self.pose_graph
                    .add_odometry_data(self.trajectory_id, odometry);
            }
            SensorData::FixedFramePose(fixed_frame) => {
                self.pose_graph
                    .add_fixed_frame_pose_data(self.trajectory_id, fixed_frame);
            }
            SensorData::Landmark(landmark) => {
                self.pose_graph
                    .add_landmark_data(self.trajectory_id, landmark);
            }
        }
    }
}
