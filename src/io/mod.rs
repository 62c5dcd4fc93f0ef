//! Persisted map state.
//!
//! A state stream is a header followed by typed records:
//!
//! ```text
//! PoseGraph ─ AllTrajectoryBuilderOptions ─ Submap* ─ Node* ─ TrajectoryData*
//!           ─ ImuData* ─ OdometryData* ─ FixedFramePoseData* ─ LandmarkData* ─ Footer
//! ```
//!
//! The first two records form the skeleton. Trajectory ids inside a stream
//! are only meaningful within that stream; loading assigns fresh ids and
//! rewrites every reference (see [`LoadPlan`]).
//!
//! # Example
//!
//! ```ignore
//! let mut bytes = Vec::new();
//! source.serialize_state(&mut bytes)?;
//!
//! let summary = target.load_state(bytes.as_slice(), true)?;
//! println!("Remapped trajectories: {:?}", summary.trajectory_remapping);
//! ```

mod error;
mod landmark_file;
mod load;
mod records;
mod serialize;
mod stream;

pub use error::{LoadError, Result, StreamError, StreamResult};
pub use landmark_file::read_landmark_poses;
pub use load::{LoadPlan, LoadSummary};
pub use records::{
    Footer, NodeRecord, SerializedData, SubmapRecord, TrajectoryRecord, kind,
};
pub use serialize::write_state;
pub use stream::{HEADER_SIZE, MAX_FRAME_LEN, STATE_MAGIC, STATE_VERSION, StateReader, StateWriter};
