//! Pose graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      POSE GRAPH                              │
//! │                                                              │
//! │    Submaps: local patches with a global pose                 │
//! │    Nodes:   registered scans with a global pose              │
//! │                                                              │
//! │    Constraints: node pose relative to a submap               │
//! │           - intra-submap (node inserted into the submap)     │
//! │           - inter-submap (found by a ConstraintFinder)       │
//! │                                                              │
//! │    [S0] ◀──intra── N0, N1, N2 ──intra──▶ [S1]                │
//! │                         │                                    │
//! │                         └──── inter ────▶ [S7 of traj 1]     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   OptimizationProblem (2D / 3D) on the worker pool           │
//! │   Trimmers under the graph lock after each insertion         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`PoseGraph`]: capability contract used by the map builder
//! - [`OptimizingPoseGraph`]: implementation, aliased as [`PoseGraph2D`] and [`PoseGraph3D`]
//! - [`Trimmer`]: [`PureLocalizationTrimmer`], [`OverlappingSubmapsTrimmer2D`]
//! - [`ConstraintFinder`]: optional loop-closure search

mod constraint_finder;
mod data;
mod optimization;
mod optimizing;
mod pose_graph;
mod trimmer;
mod types;

pub use constraint_finder::{ConstraintFinder, NodeContext, ProximityConstraintFinder};
pub use data::PoseGraphData;
pub use optimization::{
    OptimizationProblem, OptimizationProblem2D, OptimizationProblem3D, OptimizationSummary,
};
pub use optimizing::{OptimizingPoseGraph, PoseGraph2D, PoseGraph3D};
pub use pose_graph::PoseGraph;
pub use trimmer::{
    OverlappingSubmapsTrimmer2D, PureLocalizationTrimmer, SubmapView, Trimmable, Trimmer,
    TrimmerKind,
};
pub use types::{
    Constraint, ConstraintTag, LandmarkPose, NodeMembership, NodePose, PoseGraphSnapshot,
    SensorLogCounts, SensorLogs, StateExport, SubmapData, SubmapPose, TrajectoryData,
    TrajectoryNode, TrajectorySnapshot,
};
