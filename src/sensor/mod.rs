//! Sensor collation layer.
//!
//! Observations from several sensors and trajectories arrive interleaved and
//! unordered. A [`Collator`] buffers them and hands each trajectory one
//! strictly time-ordered stream.
//!
//! | Strategy | Ordering |
//! |----------|----------|
//! | [`GlobalCollator`] | one time order across every trajectory |
//! | [`TrajectoryCollator`] | independent time order per trajectory |
//!
//! Both are built on [`OrderedMultiQueue`].

mod collator;
mod ordered_multi_queue;

pub use collator::{Collator, GlobalCollator, TrajectoryCollator};
pub use ordered_multi_queue::{OrderedMultiQueue, QueueKey, SensorCallback};
