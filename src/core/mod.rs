//! Core foundation layer.
//!
//! The bottom of the stack with no internal dependencies. Everything else
//! depends on it.
//!
//! # Contents
//!
//! - [`transform`]: `Rigid3d` helpers and the planar [`Pose2D`]
//! - [`id`]: composite `(trajectory_id, index)` identifiers
//! - [`map_by_id`]: ordered-by-trajectory container
//! - [`sensor`]: sensor ids and observation types

pub mod id;
pub mod map_by_id;
pub mod sensor;
pub mod transform;

pub use id::{NodeId, SubmapId, TrajectoryIndexed};
pub use map_by_id::{DuplicateIdError, MapById};
pub use sensor::{
    FixedFramePoseData, ImuData, LandmarkData, LandmarkObservation, OdometryData, SensorData,
    SensorId, SensorType, TimedPointCloudData, select_range_sensor_ids,
};
pub use transform::{Pose2D, Rigid3d, normalize_angle, project_to_plane, rigid3_from_parts};
