//! Benchmark state serialization and loading.

use std::collections::BTreeSet;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use naksha::config::{LocalTrajectoryBuilderOptions, MapBuilderOptions, SubmapsOptions};
use naksha::core::{
    ImuData, OdometryData, Rigid3d, SensorData, SensorId, SensorType, TimedPointCloudData,
};
use naksha::{MapBuilder, TrajectoryBuilderOptions};
use nalgebra::Vector3;

/// Ring of range points around the sensor.
fn ring(num_points: usize, radius: f32) -> Vec<Vector3<f32>> {
    (0..num_points)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / num_points as f32;
            Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect()
}

/// A finished 2D map with `num_trajectories` trajectories of `steps` scans.
fn mapped(num_trajectories: usize, steps: usize) -> MapBuilder {
    let mut options = MapBuilderOptions::new_2d();
    options.num_background_threads = 2;
    options.collate_by_trajectory = true;
    let mut map_builder = MapBuilder::new(options).expect("valid options");

    let sensors: BTreeSet<SensorId> = [
        SensorId::new(SensorType::Range, "scan"),
        SensorId::new(SensorType::Odometry, "odom"),
        SensorId::new(SensorType::Imu, "imu"),
    ]
    .into_iter()
    .collect();
    let trajectory_options = TrajectoryBuilderOptions {
        trajectory_builder_2d: Some(LocalTrajectoryBuilderOptions {
            submaps: SubmapsOptions {
                num_range_data: 20,
                grid_resolution: 0.05,
            },
            ..Default::default()
        }),
        ..Default::default()
    };
    let points = ring(360, 3.0);

    for t in 0..num_trajectories {
        let id = map_builder.add_trajectory_builder(&sensors, &trajectory_options, None);
        let builder = map_builder.trajectory_builder(id).expect("live trajectory");
        for step in 0..steps {
            let timestamp_us = (step as u64 + 1) * 50_000;
            builder.add_sensor_data(
                "odom",
                SensorData::Odometry(OdometryData {
                    timestamp_us,
                    pose: Rigid3d::translation(0.05 * step as f64, 5.0 * t as f64, 0.0),
                }),
            );
            builder.add_sensor_data(
                "imu",
                SensorData::Imu(ImuData {
                    timestamp_us,
                    linear_acceleration: Vector3::new(0.0, 0.0, 9.81),
                    angular_velocity: Vector3::zeros(),
                }),
            );
            builder.add_sensor_data(
                "scan",
                SensorData::Range(TimedPointCloudData {
                    timestamp_us,
                    origin: Vector3::zeros(),
                    points: points.clone(),
                }),
            );
        }
        map_builder.finish_trajectory(id);
    }
    map_builder.pose_graph().run_final_optimization();
    map_builder
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_state");
    for steps in [100, 400] {
        let map_builder = mapped(2, steps);
        let mut bytes = Vec::new();
        map_builder.serialize_state(&mut bytes).expect("serialize");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(steps), &map_builder, |b, map| {
            b.iter(|| {
                let mut out = Vec::with_capacity(bytes.len());
                map.serialize_state(&mut out).expect("serialize");
                black_box(out)
            })
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_state");
    for (label, frozen) in [("unfrozen", false), ("frozen", true)] {
        let mut bytes = Vec::new();
        mapped(2, 200)
            .serialize_state(&mut bytes)
            .expect("serialize");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new(label, 200), &bytes, |b, bytes| {
            b.iter(|| {
                let mut options = MapBuilderOptions::new_2d();
                options.num_background_threads = 0;
                let mut target = MapBuilder::new(options).expect("valid options");
                let summary = target
                    .load_state(bytes.as_slice(), frozen)
                    .expect("load");
                black_box(summary)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_load);
criterion_main!(benches);
