//! Orchestration layer.
//!
//! Owns the worker pool, the pose graph and every trajectory builder, and
//! wires them together behind [`MapBuilder`].
//!
//! # Contents
//!
//! - [`map_builder`]: the orchestrator, queries and state persistence entry points
//! - [`graph`]: pose graph contract, 2D/3D implementation, trimmers
//! - [`trajectory`]: local, global and collated trajectory builders
//! - [`submap`]: submap content (hit grid)
//! - [`thread_pool`]: background workers for optimization

pub mod graph;
pub mod map_builder;
pub mod submap;
pub mod thread_pool;
pub mod trajectory;

pub use map_builder::{MapBuilder, SubmapQueryResponse};
pub use submap::{CellIndex, Grid, Submap};
pub use thread_pool::ThreadPool;
