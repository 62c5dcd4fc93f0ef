//! Sensor identifiers and observation types.
//!
//! Timestamps are microseconds since epoch.

use std::collections::BTreeSet;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::transform::Rigid3d;

/// Kind of sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SensorType {
    /// Lidar / depth camera point clouds.
    Range,
    /// Inertial measurement unit.
    Imu,
    /// Wheel or visual odometry.
    Odometry,
    /// Absolute poses in a fixed frame (e.g. GPS).
    FixedFramePose,
    /// Landmark observations.
    Landmark,
    /// Already-tracked local SLAM results.
    LocalSlamResult,
}

/// A sensor stream expected on a trajectory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorId {
    /// Stream kind.
    pub sensor_type: SensorType,
    /// Topic-like name, unique per trajectory together with the type.
    pub id: String,
}

impl SensorId {
    /// Create a sensor id.
    pub fn new(sensor_type: SensorType, id: impl Into<String>) -> Self {
        Self {
            sensor_type,
            id: id.into(),
        }
    }
}

/// Names of the range sensors in an expected sensor set.
pub fn select_range_sensor_ids(expected_sensor_ids: &BTreeSet<SensorId>) -> Vec<String> {
    expected_sensor_ids
        .iter()
        .filter(|sensor_id| sensor_id.sensor_type == SensorType::Range)
        .map(|sensor_id| sensor_id.id.clone())
        .collect()
}

/// IMU reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuData {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// Linear acceleration (m/s²), tracking frame.
    pub linear_acceleration: Vector3<f64>,
    /// Angular velocity (rad/s), tracking frame.
    pub angular_velocity: Vector3<f64>,
}

/// Odometry pose of the tracking frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryData {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// Pose in the odometry frame.
    pub pose: Rigid3d,
}

/// Pose in an external fixed frame, if one was available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedFramePoseData {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// Pose, `None` when the source had no fix.
    pub pose: Option<Rigid3d>,
}

/// One landmark seen from the tracking frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    /// Opaque landmark id.
    pub id: String,
    /// Transform from landmark to tracking frame.
    pub landmark_to_tracking_transform: Rigid3d,
    /// Weight of the translational part.
    pub translation_weight: f64,
    /// Weight of the rotational part.
    pub rotation_weight: f64,
}

/// Landmark observations at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkData {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// Landmarks observed.
    pub observations: Vec<LandmarkObservation>,
}

/// Point cloud from a range sensor, in the tracking frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedPointCloudData {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// Sensor origin in the tracking frame.
    pub origin: Vector3<f32>,
    /// Returned points in the tracking frame.
    pub points: Vec<Vector3<f32>>,
}

impl Default for ImuData {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            linear_acceleration: Vector3::new(0.0, 0.0, 9.81),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl OdometryData {
    /// Odometry at identity.
    pub fn identity(timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            pose: Rigid3d::identity(),
        }
    }
}

/// Any observation routed through a collator.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorData {
    /// Range data.
    Range(TimedPointCloudData),
    /// IMU reading.
    Imu(ImuData),
    /// Odometry pose.
    Odometry(OdometryData),
    /// Fixed-frame pose.
    FixedFramePose(FixedFramePoseData),
    /// Landmark observations.
    Landmark(LandmarkData),
}

impl SensorData {
    /// Timestamp of the observation in microseconds.
    pub fn timestamp_us(&self) -> u64 {
        match self {
            SensorData::Range(data) => data.timestamp_us,
            SensorData::Imu(data) => data.timestamp_us,
            SensorData::Odometry(data) => data.timestamp_us,
            SensorData::FixedFramePose(data) => data.timestamp_us,
            SensorData::Landmark(data) => data.timestamp_us,
        }
    }

    /// Stream kind of the observation.
    pub fn sensor_type(&self) -> SensorType {
        match self {
            SensorData::Range(_) => SensorType::Range,
            SensorData::Imu(_) => SensorType::Imu,
            SensorData::Odometry(_) => SensorType::Odometry,
            SensorData::FixedFramePose(_) => SensorType::FixedFramePose,
            SensorData::Landmark(_) => SensorType::Landmark,
        }
    }
}
