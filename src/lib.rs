//! Naksha - multi-trajectory map builder with exact state persistence
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Persistence
//! │     (stream framing, records, remap-and-merge)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │  (map builder, pose graph, trajectory builders)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    sensor/                          │  ← Collation
//! │        (global and per-trajectory ordering)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    config/                          │  ← Options
//! │          (YAML loading, mode validation)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │         (ids, MapById, transforms, sensors)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! `engine` and `io` reference each other: the map builder exposes save and
//! load, the loader registers trajectories on the map builder.
//!
//! # Identity
//!
//! Trajectory ids are assigned `0, 1, 2, …` by one [`MapBuilder`] and are
//! not stable across files. Submaps and nodes are keyed by
//! `(trajectory_id, index)` with dense per-trajectory indices that are never
//! reused, even after trimming.
//!
//! # Persisted state
//!
//! [`MapBuilder::serialize_state`] writes the pose graph skeleton, the
//! options of every trajectory, then submap, node and observation records.
//! [`MapBuilder::load_state`] merges such a stream into a builder that may
//! already own trajectories, renumbering every loaded trajectory. Loads are
//! validated completely before the builder is touched.
//!
//! # Errors
//!
//! Corrupt streams and contradictory configuration are fatal and returned as
//! [`MapBuilderError`]. Queries for missing submaps report a message string.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Configuration (depends on core)
// ============================================================================
pub mod config;

// ============================================================================
// Layer 3: Sensor collation (depends on core)
// ============================================================================
pub mod sensor;

// ============================================================================
// Layer 4: Engine (depends on core, config, sensor)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: Persistence (depends on all layers)
// ============================================================================
pub mod io;

mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use error::{MapBuilderError, Result};

// Core types
pub use crate::core::{MapById, NodeId, Rigid3d, SensorData, SensorId, SensorType, SubmapId};

// Configuration
pub use config::{
    ConfigError, MapBuilderOptions, MapMode, PoseGraphOptions, TrajectoryBuilderOptions,
    TrajectoryBuilderOptionsWithSensorIds,
};

// Engine
pub use engine::graph::{
    Constraint, ConstraintTag, PoseGraph, PoseGraph2D, PoseGraph3D, PoseGraphSnapshot,
};
pub use engine::{MapBuilder, SubmapQueryResponse};

// I/O
pub use io::{LoadError, LoadSummary, StreamError};
