//! Configuration loading for naksha.
//!
//! All options load from YAML with sensible defaults for every field that is
//! not a hard requirement.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use naksha::config::MapBuilderOptions;
//!
//! // Load from default path (configs/map_builder.yaml)
//! let options = MapBuilderOptions::load_default()?;
//!
//! // Or parse inline
//! let options = MapBuilderOptions::from_yaml("use_trajectory_builder_2d: true")?;
//! ```
//!
//! ## Sections
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MapBuilderOptions`] | Mode, worker count, collation strategy, pose graph |
//! | [`PoseGraphOptions`] | Optimization cadence and problem options |
//! | [`TrajectoryBuilderOptions`] | Per-trajectory local builder, trimmers, initial pose |
//!
//! ## Example YAML
//!
//! ```yaml
//! use_trajectory_builder_2d: true
//! use_trajectory_builder_3d: false
//! num_background_threads: 4
//! collate_by_trajectory: false
//! pose_graph:
//!   optimize_every_n_nodes: 90
//! ```
//!
//! Exactly one of the two mode flags must be set; anything else is rejected
//! with [`ConfigError::AmbiguousMode`].

mod defaults;
mod error;
mod map_builder;
mod trajectory;

pub use error::{ConfigError, Result};
pub use map_builder::{MapBuilderOptions, MapMode, OptimizationProblemOptions, PoseGraphOptions};
pub use trajectory::{
    AllTrajectoryBuilderOptions, InitialTrajectoryPose, LocalTrajectoryBuilderOptions,
    OverlappingSubmapsTrimmerOptions, SubmapsOptions, TrajectoryBuilderOptions,
    TrajectoryBuilderOptionsWithSensorIds,
};
