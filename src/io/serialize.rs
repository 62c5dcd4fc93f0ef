//! Serialize path: graph export to record stream.

use std::io::Write;

use crate::config::AllTrajectoryBuilderOptions;
use crate::engine::graph::StateExport;

use super::error::StreamResult;
use super::records::{NodeRecord, SerializedData, SubmapRecord, TrajectoryRecord};
use super::stream::StateWriter;

/// Write a complete state stream and return the number of records.
///
/// The skeleton (pose graph, then options) comes first, so a reader can
/// resolve every later record against it. Order after that: submaps,
/// nodes, trajectory data, IMU, odometry, fixed-frame poses, landmarks.
pub fn write_state<W: Write>(
    writer: W,
    export: &StateExport,
    options: &AllTrajectoryBuilderOptions,
) -> StreamResult<u64> {
    let mut writer = StateWriter::new(writer)?;

    writer.write(&SerializedData::PoseGraph(export.snapshot.clone()))?;
    writer.write(&SerializedData::AllTrajectoryBuilderOptions(options.clone()))?;

    for (submap_id, submap) in &export.submaps {
        writer.write(&SerializedData::Submap(SubmapRecord {
            submap_id: *submap_id,
            submap: submap.clone(),
        }))?;
    }
    for (node_id, node) in &export.nodes {
        writer.write(&SerializedData::Node(NodeRecord {
            node_id: *node_id,
            node: node.clone(),
        }))?;
    }
    for (&trajectory_id, data) in &export.trajectory_data {
        writer.write(&SerializedData::TrajectoryData(TrajectoryRecord {
            trajectory_id,
            data: data.clone(),
        }))?;
    }

    for (&trajectory_id, logs) in &export.sensor_logs {
        for data in &logs.imu {
            writer.write(&SerializedData::ImuData(TrajectoryRecord {
                trajectory_id,
                data: data.clone(),
            }))?;
        }
    }
    for (&trajectory_id, logs) in &export.sensor_logs {
        for data in &logs.odometry {
            writer.write(&SerializedData::OdometryData(TrajectoryRecord {
                trajectory_id,
                data: data.clone(),
            }))?;
        }
    }
    for (&trajectory_id, logs) in &export.sensor_logs {
        for data in &logs.fixed_frame_pose {
            writer.write(&SerializedData::FixedFramePoseData(TrajectoryRecord {
                trajectory_id,
                data: data.clone(),
            }))?;
        }
    }
    for (&trajectory_id, logs) in &export.sensor_logs {
        for data in &logs.landmark {
            writer.write(&SerializedData::LandmarkData(TrajectoryRecord {
                trajectory_id,
                data: data.clone(),
            }))?;
        }
    }

    writer.finish()
}
