//! Deserialize path: remap-and-merge of a state stream into a map builder.
//!
//! Loading runs in two phases:
//!
//! 1. **Plan** ([`LoadPlan::read`]): read the skeleton (pose graph and
//!    options), then every payload record, validating everything in the
//!    stream's own trajectory id space. Corruption is reported here.
//! 2. **Apply** ([`LoadPlan::apply`]): register one trajectory per
//!    serialized trajectory, rewrite every id through the remap table and
//!    hand content to the pose graph. This phase cannot fail.
//!
//! A failed load therefore never leaves a partial graph behind.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::Arc;

use crate::config::{AllTrajectoryBuilderOptions, TrajectoryBuilderOptionsWithSensorIds};
use crate::core::{
    FixedFramePoseData, ImuData, LandmarkData, NodeId, OdometryData, Rigid3d, SubmapId,
};
use crate::engine::MapBuilder;
use crate::engine::graph::{
    Constraint, ConstraintTag, PoseGraph, PoseGraphSnapshot, SensorLogs, TrajectoryData,
    TrajectoryNode,
};
use crate::engine::submap::Submap;

use super::error::{LoadError, Result};
use super::records::{NodeRecord, SerializedData, SubmapRecord, TrajectoryRecord};
use super::stream::StateReader;

/// Outcome of a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Serialized trajectory id → id assigned by the map builder.
    pub trajectory_remapping: BTreeMap<i32, i32>,
    /// Submaps materialized.
    pub submaps_loaded: usize,
    /// Nodes materialized.
    pub nodes_loaded: usize,
    /// Observation records skipped because the load was frozen.
    pub skipped_frozen_records: usize,
    /// Records of unknown kind, skipped.
    pub unknown_records: usize,
    /// Extra pose graph or options records, skipped.
    pub duplicate_skeleton_records: usize,
    /// Loaded nodes that no intra-submap constraint attaches to a submap,
    /// in the new id space. Their membership is missing after the load.
    pub nodes_without_submap: Vec<NodeId>,
}

enum Observation {
    Imu(ImuData),
    Odometry(OdometryData),
    FixedFramePose(FixedFramePoseData),
    Landmark(LandmarkData),
}

enum Payload {
    Submap {
        submap_id: SubmapId,
        pose: Rigid3d,
        submap: Submap,
    },
    Node {
        node_id: NodeId,
        pose: Rigid3d,
        node: TrajectoryNode,
    },
    TrajectoryData {
        trajectory_id: i32,
        data: TrajectoryData,
    },
    Observation {
        trajectory_id: i32,
        observation: Observation,
    },
}

#[derive(Default)]
struct Counters {
    unknown_records: usize,
    duplicate_skeleton_records: usize,
}

impl Counters {
    fn duplicate(&mut self, name: &str) {
        log::error!(
            "Found multiple serialized `{}`. Serialized stream likely corrupt!",
            name
        );
        self.duplicate_skeleton_records += 1;
    }

    fn unknown(&mut self, kind: u16, len: usize) {
        log::warn!("Skipping unknown record kind {} ({} bytes)", kind, len);
        self.unknown_records += 1;
    }
}

/// Pose graph snapshot and options, indexed for payload lookups.
struct Skeleton {
    snapshot: PoseGraphSnapshot,
    options: Vec<TrajectoryBuilderOptionsWithSensorIds>,
    trajectory_ids: BTreeSet<i32>,
    submap_poses: BTreeMap<SubmapId, Rigid3d>,
    node_poses: BTreeMap<NodeId, Rigid3d>,
}

impl Skeleton {
    fn build(
        snapshot: PoseGraphSnapshot,
        all_options: AllTrajectoryBuilderOptions,
    ) -> Result<Self> {
        let mut trajectory_ids = BTreeSet::new();
        let mut options = Vec::with_capacity(snapshot.trajectories.len());
        let mut submap_poses = BTreeMap::new();
        let mut node_poses = BTreeMap::new();

        for trajectory in &snapshot.trajectories {
            let trajectory_id = trajectory.trajectory_id;
            if !trajectory_ids.insert(trajectory_id) {
                return Err(LoadError::DuplicateTrajectoryId(trajectory_id));
            }
            let entry = usize::try_from(trajectory_id)
                .ok()
                .and_then(|index| all_options.options_with_sensor_ids.get(index))
                .ok_or(LoadError::MissingOptions(trajectory_id))?;
            options.push(entry.clone());

            for submap in &trajectory.submaps {
                let submap_id = SubmapId::new(trajectory_id, submap.submap_index);
                if submap_poses.insert(submap_id, submap.pose).is_some() {
                    return Err(LoadError::DuplicateId(submap_id.to_string()));
                }
            }
            for node in &trajectory.nodes {
                let node_id = NodeId::new(trajectory_id, node.node_index);
                if node_poses.insert(node_id, node.pose).is_some() {
                    return Err(LoadError::DuplicateId(node_id.to_string()));
                }
            }
        }

        let skeleton = Self {
            snapshot,
            options,
            trajectory_ids,
            submap_poses,
            node_poses,
        };
        for constraint in &skeleton.snapshot.constraints {
            skeleton.require_trajectory("Constraint submap", constraint.submap_id.trajectory_id)?;
            skeleton.require_trajectory("Constraint node", constraint.node_id.trajectory_id)?;
            if !skeleton.submap_poses.contains_key(&constraint.submap_id) {
                return Err(LoadError::UnknownConstraintEndpoint(
                    constraint.submap_id.to_string(),
                ));
            }
            if !skeleton.node_poses.contains_key(&constraint.node_id) {
                return Err(LoadError::UnknownConstraintEndpoint(
                    constraint.node_id.to_string(),
                ));
            }
        }
        Ok(skeleton)
    }

    fn require_trajectory(&self, context: &'static str, trajectory_id: i32) -> Result<()> {
        if self.trajectory_ids.contains(&trajectory_id) {
            Ok(())
        } else {
            Err(LoadError::UnmappedTrajectoryId {
                context,
                trajectory_id,
            })
        }
    }
}

/// A fully read and validated state stream, ready to merge.
pub struct LoadPlan {
    skeleton: Skeleton,
    payloads: Vec<Payload>,
    counters: Counters,
}

impl LoadPlan {
    /// Read and validate a whole stream.
    ///
    /// Fails on any framing error, on a stream whose first known records
    /// are not the pose graph and the options, and on any payload that does
    /// not match the skeleton.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut reader = StateReader::new(reader)?;
        let mut counters = Counters::default();
        let skeleton = read_skeleton(&mut reader, &mut counters)?;

        let mut payloads = Vec::new();
        let mut seen_submaps = BTreeSet::new();
        let mut seen_nodes = BTreeSet::new();
        while let Some(record) = reader.next()? {
            let payload = match record {
                SerializedData::PoseGraph(_) | SerializedData::AllTrajectoryBuilderOptions(_) => {
                    counters.duplicate(record.name());
                    continue;
                }
                SerializedData::Unknown { kind, len } => {
                    counters.unknown(kind, len);
                    continue;
                }
                // Consumed by the reader.
                SerializedData::Footer(_) => continue,
                SerializedData::Submap(SubmapRecord { submap_id, submap }) => {
                    skeleton.require_trajectory("Submap payload", submap_id.trajectory_id)?;
                    let pose = *skeleton.submap_poses.get(&submap_id).ok_or(
                        LoadError::MissingSubmapPose {
                            trajectory_id: submap_id.trajectory_id,
                            submap_index: submap_id.submap_index,
                        },
                    )?;
                    if !seen_submaps.insert(submap_id) {
                        return Err(LoadError::DuplicatePayload(submap_id.to_string()));
                    }
                    Payload::Submap {
                        submap_id,
                        pose,
                        submap,
                    }
                }
                SerializedData::Node(NodeRecord { node_id, node }) => {
                    skeleton.require_trajectory("Node payload", node_id.trajectory_id)?;
                    let pose = *skeleton.node_poses.get(&node_id).ok_or(
                        LoadError::MissingNodePose {
                            trajectory_id: node_id.trajectory_id,
                            node_index: node_id.node_index,
                        },
                    )?;
                    if !seen_nodes.insert(node_id) {
                        return Err(LoadError::DuplicatePayload(node_id.to_string()));
                    }
                    Payload::Node { node_id, pose, node }
                }
                SerializedData::TrajectoryData(TrajectoryRecord {
                    trajectory_id,
                    data,
                }) => {
                    skeleton.require_trajectory("Trajectory data", trajectory_id)?;
                    Payload::TrajectoryData {
                        trajectory_id,
                        data,
                    }
                }
                SerializedData::ImuData(record) => {
                    observation(&skeleton, "IMU data", record, Observation::Imu)?
                }
                SerializedData::OdometryData(record) => {
                    observation(&skeleton, "Odometry data", record, Observation::Odometry)?
                }
                SerializedData::FixedFramePoseData(record) => observation(
                    &skeleton,
                    "Fixed frame pose data",
                    record,
                    Observation::FixedFramePose,
                )?,
                SerializedData::LandmarkData(record) => {
                    observation(&skeleton, "Landmark data", record, Observation::Landmark)?
                }
            };
            payloads.push(payload);
        }
        reader.expect_end()?;

        if let Some(submap_id) = skeleton
            .submap_poses
            .keys()
            .find(|id| !seen_submaps.contains(*id))
        {
            return Err(LoadError::MissingPayload(submap_id.to_string()));
        }
        if let Some(node_id) = skeleton.node_poses.keys().find(|id| !seen_nodes.contains(*id)) {
            return Err(LoadError::MissingPayload(node_id.to_string()));
        }

        log::debug!(
            "Planned load: {} trajectories, {} payload records",
            skeleton.snapshot.trajectories.len(),
            payloads.len()
        );
        Ok(Self {
            skeleton,
            payloads,
            counters,
        })
    }

    /// Trajectories in the stream, serialized ids in stream order.
    pub fn trajectory_ids(&self) -> Vec<i32> {
        self.skeleton
            .snapshot
            .trajectories
            .iter()
            .map(|trajectory| trajectory.trajectory_id)
            .collect()
    }

    /// Merge into `map_builder`.
    ///
    /// Every serialized trajectory is registered for deserialization and
    /// gets the next free id. With `load_frozen` the new trajectories are
    /// frozen before any content arrives, observation records are skipped
    /// and membership is rebuilt from intra-submap constraints only.
    /// `landmark_overrides` replace skeleton landmark poses.
    pub fn apply(
        self,
        map_builder: &mut MapBuilder,
        load_frozen: bool,
        landmark_overrides: &[(String, Rigid3d)],
    ) -> LoadSummary {
        let pose_graph: Arc<dyn PoseGraph> = Arc::clone(map_builder.pose_graph());
        let Self {
            skeleton,
            payloads,
            counters,
        } = self;

        let mut remapping = BTreeMap::new();
        for (trajectory, options) in skeleton.snapshot.trajectories.iter().zip(&skeleton.options) {
            let new_id = map_builder.add_trajectory_for_deserialization(options);
            remapping.insert(trajectory.trajectory_id, new_id);
            if load_frozen {
                pose_graph.freeze_trajectory(new_id);
            }
            log::info!(
                "Loading serialized trajectory {} as trajectory {}{}",
                trajectory.trajectory_id,
                new_id,
                if load_frozen { " (frozen)" } else { "" }
            );
        }
        // Every id was checked against the skeleton while planning.
        let remap = |trajectory_id: i32| {
            remapping
                .get(&trajectory_id)
                .copied()
                .unwrap_or(trajectory_id)
        };

        let constraints: Vec<Constraint> = skeleton
            .snapshot
            .constraints
            .iter()
            .map(|constraint| {
                constraint.remapped(
                    remap(constraint.submap_id.trajectory_id),
                    remap(constraint.node_id.trajectory_id),
                )
            })
            .collect();

        for landmark in &skeleton.snapshot.landmark_poses {
            pose_graph.set_landmark_pose(&landmark.landmark_id, &landmark.global_pose);
        }
        for (landmark_id, global_pose) in landmark_overrides {
            pose_graph.set_landmark_pose(landmark_id, global_pose);
        }

        let mut summary = LoadSummary {
            unknown_records: counters.unknown_records,
            duplicate_skeleton_records: counters.duplicate_skeleton_records,
            ..Default::default()
        };
        let mut observations: BTreeMap<i32, SensorLogs> = BTreeMap::new();
        for payload in payloads {
            match payload {
                Payload::Submap {
                    submap_id,
                    pose,
                    submap,
                } => {
                    let submap_id =
                        SubmapId::new(remap(submap_id.trajectory_id), submap_id.submap_index);
                    pose_graph.add_submap_from_payload(&pose, submap_id, submap);
                    summary.submaps_loaded += 1;
                }
                Payload::Node {
                    node_id,
                    pose,
                    node,
                } => {
                    let node_id = NodeId::new(remap(node_id.trajectory_id), node_id.node_index);
                    pose_graph.add_node_from_payload(&pose, node_id, node);
                    summary.nodes_loaded += 1;
                }
                Payload::TrajectoryData {
                    trajectory_id,
                    data,
                } => pose_graph.set_trajectory_data(remap(trajectory_id), data),
                Payload::Observation { .. } if load_frozen => {
                    summary.skipped_frozen_records += 1;
                }
                Payload::Observation {
                    trajectory_id,
                    observation,
                } => {
                    let logs = observations.entry(remap(trajectory_id)).or_default();
                    match observation {
                        Observation::Imu(data) => logs.imu.push(data),
                        Observation::Odometry(data) => logs.odometry.push(data),
                        Observation::FixedFramePose(data) => logs.fixed_frame_pose.push(data),
                        Observation::Landmark(data) => logs.landmark.push(data),
                    }
                }
            }
        }
        for (trajectory_id, logs) in observations {
            pose_graph.extend_sensor_logs(trajectory_id, logs);
        }

        let attached: BTreeSet<NodeId> = constraints
            .iter()
            .filter(|constraint| constraint.tag == ConstraintTag::IntraSubmap)
            .map(|constraint| constraint.node_id)
            .collect();
        summary.nodes_without_submap = skeleton
            .node_poses
            .keys()
            .map(|node_id| NodeId::new(remap(node_id.trajectory_id), node_id.node_index))
            .filter(|node_id| !attached.contains(node_id))
            .collect();
        if !summary.nodes_without_submap.is_empty() {
            log::warn!(
                "{} loaded nodes have no intra-submap constraint, their submap membership is missing (first: {})",
                summary.nodes_without_submap.len(),
                summary.nodes_without_submap[0]
            );
        }

        if load_frozen {
            for constraint in &constraints {
                if constraint.tag == ConstraintTag::IntraSubmap {
                    pose_graph.add_node_to_submap(constraint.node_id, constraint.submap_id);
                }
            }
        } else {
            pose_graph.add_serialized_constraints(constraints);
        }

        summary.trajectory_remapping = remapping;
        log::info!(
            "Loaded {} trajectories: {} submaps, {} nodes, {} observation records skipped",
            summary.trajectory_remapping.len(),
            summary.submaps_loaded,
            summary.nodes_loaded,
            summary.skipped_frozen_records
        );
        summary
    }
}

fn read_skeleton<R: Read>(reader: &mut StateReader<R>, counters: &mut Counters) -> Result<Skeleton> {
    let mut snapshot = None;
    let mut options = None;
    while snapshot.is_none() || options.is_none() {
        let Some(record) = reader.next()? else {
            break;
        };
        match record {
            SerializedData::PoseGraph(data) if snapshot.is_none() => snapshot = Some(data),
            SerializedData::AllTrajectoryBuilderOptions(data) if options.is_none() => {
                options = Some(data)
            }
            SerializedData::PoseGraph(_) | SerializedData::AllTrajectoryBuilderOptions(_) => {
                counters.duplicate(record.name())
            }
            SerializedData::Unknown { kind, len } => counters.unknown(kind, len),
            _ => break,
        }
    }
    match (snapshot, options) {
        (Some(snapshot), Some(options)) => Skeleton::build(snapshot, options),
        (None, _) => Err(LoadError::MissingSkeleton("PoseGraph")),
        (_, None) => Err(LoadError::MissingSkeleton("AllTrajectoryBuilderOptions")),
    }
}

fn observation<T>(
    skeleton: &Skeleton,
    context: &'static str,
    record: TrajectoryRecord<T>,
    wrap: fn(T) -> Observation,
) -> Result<Payload> {
    skeleton.require_trajectory(context, record.trajectory_id)?;
    Ok(Payload::Observation {
        trajectory_id: record.trajectory_id,
        observation: wrap(record.data),
    })
}
