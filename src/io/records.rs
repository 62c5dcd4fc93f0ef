//! Typed records of the persisted-state stream.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::AllTrajectoryBuilderOptions;
use crate::core::{FixedFramePoseData, ImuData, LandmarkData, NodeId, OdometryData, SubmapId};
use crate::engine::graph::{PoseGraphSnapshot, TrajectoryData, TrajectoryNode};
use crate::engine::submap::Submap;

use super::error::{StreamError, StreamResult};

/// Record kind tags as written in each frame.
pub mod kind {
    /// Pose graph snapshot.
    pub const POSE_GRAPH: u16 = 1;
    /// Options of every trajectory.
    pub const ALL_TRAJECTORY_BUILDER_OPTIONS: u16 = 2;
    /// Submap content.
    pub const SUBMAP: u16 = 3;
    /// Node content.
    pub const NODE: u16 = 4;
    /// Per-trajectory accumulated data.
    pub const TRAJECTORY_DATA: u16 = 5;
    /// IMU reading.
    pub const IMU_DATA: u16 = 6;
    /// Odometry pose.
    pub const ODOMETRY_DATA: u16 = 7;
    /// Fixed-frame pose.
    pub const FIXED_FRAME_POSE_DATA: u16 = 8;
    /// Landmark observations.
    pub const LANDMARK_DATA: u16 = 9;
    /// End of stream.
    pub const FOOTER: u16 = 0xFFFF;
}

/// Submap content keyed by its id in the writing graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmapRecord {
    /// Id in the writing graph.
    pub submap_id: SubmapId,
    /// Content.
    pub submap: Submap,
}

/// Node content keyed by its id in the writing graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Id in the writing graph.
    pub node_id: NodeId,
    /// Content.
    pub node: TrajectoryNode,
}

/// Data attributed to one trajectory of the writing graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord<T> {
    /// Trajectory id in the writing graph.
    pub trajectory_id: i32,
    /// Attached data.
    pub data: T,
}

/// Last record of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    /// Records written before the footer.
    pub record_count: u64,
}

/// One record of a persisted-state stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedData {
    /// Graph structure and global poses.
    PoseGraph(PoseGraphSnapshot),
    /// Options of every trajectory, indexed by trajectory id.
    AllTrajectoryBuilderOptions(AllTrajectoryBuilderOptions),
    /// Submap content.
    Submap(SubmapRecord),
    /// Node content.
    Node(NodeRecord),
    /// Accumulated per-trajectory data.
    TrajectoryData(TrajectoryRecord<TrajectoryData>),
    /// IMU reading.
    ImuData(TrajectoryRecord<ImuData>),
    /// Odometry pose.
    OdometryData(TrajectoryRecord<OdometryData>),
    /// Fixed-frame pose.
    FixedFramePoseData(TrajectoryRecord<FixedFramePoseData>),
    /// Landmark observations.
    LandmarkData(TrajectoryRecord<LandmarkData>),
    /// End of stream.
    Footer(Footer),
    /// Kind this version does not know. The payload is skipped.
    Unknown {
        /// Kind tag
        kind: u16,
        /// Payload length in bytes
        len: usize,
    },
}

impl SerializedData {
    /// Kind tag written in the frame.
    pub fn kind(&self) -> u16 {
        match self {
            SerializedData::PoseGraph(_) => kind::POSE_GRAPH,
            SerializedData::AllTrajectoryBuilderOptions(_) => kind::ALL_TRAJECTORY_BUILDER_OPTIONS,
            SerializedData::Submap(_) => kind::SUBMAP,
            SerializedData::Node(_) => kind::NODE,
            SerializedData::TrajectoryData(_) => kind::TRAJECTORY_DATA,
            SerializedData::ImuData(_) => kind::IMU_DATA,
            SerializedData::OdometryData(_) => kind::ODOMETRY_DATA,
            SerializedData::FixedFramePoseData(_) => kind::FIXED_FRAME_POSE_DATA,
            SerializedData::LandmarkData(_) => kind::LANDMARK_DATA,
            SerializedData::Footer(_) => kind::FOOTER,
            SerializedData::Unknown { kind, .. } => *kind,
        }
    }

    /// Human-readable kind name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SerializedData::PoseGraph(_) => "PoseGraph",
            SerializedData::AllTrajectoryBuilderOptions(_) => "AllTrajectoryBuilderOptions",
            SerializedData::Submap(_) => "Submap",
            SerializedData::Node(_) => "Node",
            SerializedData::TrajectoryData(_) => "TrajectoryData",
            SerializedData::ImuData(_) => "ImuData",
            SerializedData::OdometryData(_) => "OdometryData",
            SerializedData::FixedFramePoseData(_) => "FixedFramePoseData",
            SerializedData::LandmarkData(_) => "LandmarkData",
            SerializedData::Footer(_) => "Footer",
            SerializedData::Unknown { .. } => "Unknown",
        }
    }

    /// Encode the payload (without the frame header).
    pub fn encode_payload(&self) -> StreamResult<Vec<u8>> {
        let encoded = match self {
            SerializedData::PoseGraph(data) => postcard::to_allocvec(data),
            SerializedData::AllTrajectoryBuilderOptions(data) => postcard::to_allocvec(data),
            SerializedData::Submap(data) => postcard::to_allocvec(data),
            SerializedData::Node(data) => postcard::to_allocvec(data),
            SerializedData::TrajectoryData(data) => postcard::to_allocvec(data),
            SerializedData::ImuData(data) => postcard::to_allocvec(data),
            SerializedData::OdometryData(data) => postcard::to_allocvec(data),
            SerializedData::FixedFramePoseData(data) => postcard::to_allocvec(data),
            SerializedData::LandmarkData(data) => postcard::to_allocvec(data),
            SerializedData::Footer(data) => postcard::to_allocvec(data),
            SerializedData::Unknown { kind, .. } => {
                return Err(StreamError::Encode(format!(
                    "cannot encode unknown record kind {}",
                    kind
                )));
            }
        };
        encoded.map_err(|e| StreamError::Encode(e.to_string()))
    }

    /// Decode a payload of the given kind.
    pub fn decode(kind: u16, payload: &[u8]) -> StreamResult<Self> {
        Ok(match kind {
            kind::POSE_GRAPH => SerializedData::PoseGraph(from_payload(kind, payload)?),
            kind::ALL_TRAJECTORY_BUILDER_OPTIONS => {
                SerializedData::AllTrajectoryBuilderOptions(from_payload(kind, payload)?)
            }
            kind::SUBMAP => SerializedData::Submap(from_payload(kind, payload)?),
            kind::NODE => SerializedData::Node(from_payload(kind, payload)?),
            kind::TRAJECTORY_DATA => SerializedData::TrajectoryData(from_payload(kind, payload)?),
            kind::IMU_DATA => SerializedData::ImuData(from_payload(kind, payload)?),
            kind::ODOMETRY_DATA => SerializedData::OdometryData(from_payload(kind, payload)?),
            kind::FIXED_FRAME_POSE_DATA => {
                SerializedData::FixedFramePoseData(from_payload(kind, payload)?)
            }
            kind::LANDMARK_DATA => SerializedData::LandmarkData(from_payload(kind, payload)?),
            kind::FOOTER => SerializedData::Footer(from_payload(kind, payload)?),
            other => SerializedData::Unknown {
                kind: other,
                len: payload.len(),
            },
        })
    }
}

fn from_payload<T: DeserializeOwned>(kind: u16, payload: &[u8]) -> StreamResult<T> {
    postcard::from_bytes(payload).map_err(|e| StreamError::Decode {
        kind,
        message: e.to_string(),
    })
}
