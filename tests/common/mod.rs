//! Shared fixtures for naksha integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use naksha::config::{LocalTrajectoryBuilderOptions, MapBuilderOptions, SubmapsOptions};
use naksha::core::{
    FixedFramePoseData, ImuData, LandmarkData, LandmarkObservation, OdometryData, Rigid3d,
    SensorData, SensorId, SensorType, TimedPointCloudData,
};
use naksha::engine::trajectory::CollatedTrajectoryBuilder;
use naksha::{ConstraintTag, MapBuilder, MapMode, NodeId, SubmapId, TrajectoryBuilderOptions};
use nalgebra::Vector3;

/// Microseconds between two steps of a fixture trajectory.
pub const STEP_US: u64 = 10_000;

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Options with per-trajectory collation so trajectories can be fed
/// one after another.
pub fn map_builder_options(mode: MapMode, num_background_threads: usize) -> MapBuilderOptions {
    let mut options = match mode {
        MapMode::TwoD => MapBuilderOptions::new_2d(),
        MapMode::ThreeD => MapBuilderOptions::new_3d(),
    };
    options.num_background_threads = num_background_threads;
    options.collate_by_trajectory = true;
    options.pose_graph.optimize_every_n_nodes = 4;
    options
}

pub fn all_sensors() -> BTreeSet<SensorId> {
    [
        SensorId::new(SensorType::Range, "scan"),
        SensorId::new(SensorType::Odometry, "odom"),
        SensorId::new(SensorType::Imu, "imu"),
        SensorId::new(SensorType::FixedFramePose, "gps"),
        SensorId::new(SensorType::Landmark, "landmarks"),
    ]
    .into_iter()
    .collect()
}

/// Local SLAM in `mode`, a new submap every 3 scans.
pub fn trajectory_options(mode: MapMode) -> TrajectoryBuilderOptions {
    let local = LocalTrajectoryBuilderOptions {
        min_range: 0.1,
        max_range: 20.0,
        submaps: SubmapsOptions {
            num_range_data: 3,
            grid_resolution: 0.1,
        },
    };
    match mode {
        MapMode::TwoD => TrajectoryBuilderOptions {
            trajectory_builder_2d: Some(local),
            ..Default::default()
        },
        MapMode::ThreeD => TrajectoryBuilderOptions {
            trajectory_builder_3d: Some(local),
            ..Default::default()
        },
    }
}

fn scan_points(step: usize) -> Vec<Vector3<f32>> {
    let shift = step as f32 * 0.05;
    vec![
        Vector3::new(2.0 + shift, 0.5, 0.2),
        Vector3::new(-1.5, 3.0 - shift, 0.0),
        Vector3::new(0.0, -2.5, 0.4),
        Vector3::new(4.0, 4.0, 0.0),
        // Filtered out by min_range.
        Vector3::new(0.01, 0.0, 0.0),
    ]
}

/// Feed `steps` time steps of every sensor, driving along x from `start_x`.
pub fn drive(builder: &CollatedTrajectoryBuilder, steps: usize, start_x: f64) {
    let landmark_id = (100 + builder.trajectory_id()).to_string();
    for step in 0..steps {
        let timestamp_us = (step as u64 + 1) * STEP_US;
        let pose = Rigid3d::translation(start_x + 0.2 * step as f64, 0.0, 0.0);
        builder.add_sensor_data(
            "odom",
            SensorData::Odometry(OdometryData { timestamp_us, pose }),
        );
        builder.add_sensor_data(
            "imu",
            SensorData::Imu(ImuData {
                timestamp_us,
                linear_acceleration: Vector3::new(0.0, 0.0, 9.7 + 0.01 * step as f64),
                angular_velocity: Vector3::zeros(),
            }),
        );
        builder.add_sensor_data(
            "gps",
            SensorData::FixedFramePose(FixedFramePoseData {
                timestamp_us,
                pose: Some(Rigid3d::translation(100.0 + 0.2 * step as f64, 50.0, 0.0)),
            }),
        );
        builder.add_sensor_data(
            "landmarks",
            SensorData::Landmark(LandmarkData {
                timestamp_us,
                observations: vec![LandmarkObservation {
                    id: landmark_id.clone(),
                    landmark_to_tracking_transform: Rigid3d::translation(1.0, 0.0, 0.0),
                    translation_weight: 1.0,
                    rotation_weight: 1.0,
                }],
            }),
        );
        builder.add_sensor_data(
            "scan",
            SensorData::Range(TimedPointCloudData {
                timestamp_us,
                origin: Vector3::zeros(),
                points: scan_points(step),
            }),
        );
    }
}

/// A map builder with `num_trajectories` finished trajectories of
/// `steps` scans each, optimized once at the end.
pub fn build_map(mode: MapMode, num_trajectories: usize, steps: usize) -> MapBuilder {
    let mut map_builder = MapBuilder::new(map_builder_options(mode, 2)).unwrap();
    populate(&mut map_builder, num_trajectories, steps);
    map_builder
}

/// Add and finish `num_trajectories` trajectories, 10 m apart along x.
pub fn populate(map_builder: &mut MapBuilder, num_trajectories: usize, steps: usize) {
    let mode = map_builder.mode();
    for index in 0..num_trajectories {
        let trajectory_id =
            map_builder.add_trajectory_builder(&all_sensors(), &trajectory_options(mode), None);
        drive(
            map_builder.trajectory_builder(trajectory_id).unwrap(),
            steps,
            10.0 * index as f64,
        );
        map_builder.finish_trajectory(trajectory_id);
    }
    map_builder.pose_graph().run_final_optimization();
}

/// Serialize into memory.
pub fn serialize(map_builder: &MapBuilder) -> Vec<u8> {
    let mut bytes = Vec::new();
    map_builder.serialize_state(&mut bytes).unwrap();
    bytes
}

pub fn fresh(mode: MapMode) -> MapBuilder {
    MapBuilder::new(map_builder_options(mode, 0)).unwrap()
}

pub fn assert_pose_eq(a: &Rigid3d, b: &Rigid3d) {
    let delta = a.inverse() * b;
    assert!(
        delta.translation.vector.norm() < 1e-9 && delta.rotation.angle() < 1e-9,
        "poses differ: {:?} vs {:?}",
        a,
        b
    );
}

/// `(submap, node, tag)` of every constraint, trajectory ids shifted by
/// `offset`.
pub fn constraint_topology(
    map_builder: &MapBuilder,
    offset: i32,
) -> BTreeSet<(SubmapId, NodeId, bool)> {
    map_builder
        .pose_graph()
        .constraints()
        .iter()
        .map(|constraint| {
            (
                SubmapId::new(
                    constraint.submap_id.trajectory_id + offset,
                    constraint.submap_id.submap_index,
                ),
                NodeId::new(
                    constraint.node_id.trajectory_id + offset,
                    constraint.node_id.node_index,
                ),
                constraint.tag == ConstraintTag::IntraSubmap,
            )
        })
        .collect()
}

/// Node membership restricted to `trajectory_ids`.
pub fn membership_of(
    map_builder: &MapBuilder,
    trajectory_ids: &[i32],
) -> BTreeMap<SubmapId, BTreeSet<NodeId>> {
    map_builder
        .pose_graph()
        .node_membership()
        .into_iter()
        .filter(|(submap_id, _)| trajectory_ids.contains(&submap_id.trajectory_id))
        .collect()
}
