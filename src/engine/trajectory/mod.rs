//! Trajectory builders.
//!
//! ```text
//! sensor data ─▶ CollatedTrajectoryBuilder ─▶ Collator ─▶ GlobalTrajectoryBuilder
//!                                                            │
//!                                        LocalTrajectoryBuilder (optional)
//!                                                            │
//!                                                            ▼
//!                                                        PoseGraph
//! ```

mod collated;
mod global;
mod local;

pub use collated::{CollatedTrajectoryBuilder, SharedCollator};
pub use global::{GlobalTrajectoryBuilder, LocalSlamResultCallback};
pub use local::{InsertionResult, LocalTrajectoryBuilder, MatchingResult};
