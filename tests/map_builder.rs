//! Map builder integration tests: trajectory registration, trimming,
//! submap queries and concurrent feeding.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use common::*;
use naksha::config::{OverlappingSubmapsTrimmerOptions, TrajectoryBuilderOptionsWithSensorIds};
use naksha::core::{NodeId, Rigid3d, SensorId, SensorType, SubmapId};
use naksha::engine::graph::TrimmerKind;
use naksha::{MapBuilder, MapMode, SubmapQueryResponse};

#[test]
fn test_trajectory_ids_follow_registration_order() {
    init_logging();
    let mut map_builder = fresh(MapMode::TwoD);

    let live = map_builder.add_trajectory_builder(
        &all_sensors(),
        &trajectory_options(MapMode::TwoD),
        None,
    );
    let restored_options = TrajectoryBuilderOptionsWithSensorIds {
        sensor_ids: [SensorId::new(SensorType::Odometry, "wheel")]
            .into_iter()
            .collect(),
        trajectory_builder_options: Default::default(),
    };
    let restored = map_builder.add_trajectory_for_deserialization(&restored_options);
    let bare = map_builder.add_trajectory_builder(&BTreeSet::new(), &Default::default(), None);

    assert_eq!((live, restored, bare), (0, 1, 2));
    assert_eq!(map_builder.num_trajectory_builders(), 3);
    assert!(map_builder.trajectory_builder(0).is_some());
    assert!(map_builder.trajectory_builder(1).is_none());
    assert!(map_builder.trajectory_builder(3).is_none());

    let all = map_builder.all_trajectory_builder_options();
    assert_eq!(all.options_with_sensor_ids.len(), 3);
    assert_eq!(all.options_with_sensor_ids[0].sensor_ids, all_sensors());
    assert_eq!(all.options_with_sensor_ids[1], restored_options);
    assert!(all.options_with_sensor_ids[2].sensor_ids.is_empty());
}

#[test]
fn test_local_slam_callback_reports_nodes() {
    init_logging();
    let mut map_builder = fresh(MapMode::TwoD);
    let reported: Arc<Mutex<Vec<(i32, Option<NodeId>)>>> = Arc::default();
    let sink = Arc::clone(&reported);
    let trajectory_id = map_builder.add_trajectory_builder(
        &all_sensors(),
        &trajectory_options(MapMode::TwoD),
        Some(Box::new(move |trajectory_id: i32, _: u64, _: &Rigid3d, node_id: Option<NodeId>| {
            sink.lock().unwrap().push((trajectory_id, node_id));
        })),
    );

    drive(map_builder.trajectory_builder(trajectory_id).unwrap(), 6, 0.0);
    map_builder.finish_trajectory(trajectory_id);

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 6);
    for (index, (reported_trajectory, node_id)) in reported.iter().enumerate() {
        assert_eq!(*reported_trajectory, trajectory_id);
        assert_eq!(*node_id, Some(NodeId::new(trajectory_id, index as i32)));
    }
}

#[test]
fn test_submap_query_after_mapping() {
    init_logging();
    let map_builder = build_map(MapMode::TwoD, 1, 9);

    let mut response = SubmapQueryResponse::default();
    let error = map_builder.submap_to_response(SubmapId::new(0, 1), &mut response);
    assert!(error.is_empty(), "{}", error);
    assert!(response.finished);
    assert_eq!(response.submap_version, 6);
    assert!(!response.cells.is_empty());
    let expected = map_builder.pose_graph().submap_poses()[&SubmapId::new(0, 1)];
    assert_pose_eq(&response.global_pose, &expected);

    let error = map_builder.submap_to_response(SubmapId::new(0, 7), &mut response);
    assert_eq!(
        error,
        "Requested submap 7 from trajectory 0 but it does not exist: maybe it has been trimmed."
    );
    let error = map_builder.submap_to_response(SubmapId::new(4, 0), &mut response);
    assert_eq!(
        error,
        "Requested submap from trajectory 4 but there are only 1 trajectories."
    );
}

#[test]
fn test_pure_localization_keeps_recent_submaps_then_trims_all() {
    init_logging();
    let mut map_builder = fresh(MapMode::TwoD);
    let mut options = trajectory_options(MapMode::TwoD);
    options.pure_localization = true;
    let trajectory_id = map_builder.add_trajectory_builder(&all_sensors(), &options, None);

    drive(map_builder.trajectory_builder(trajectory_id).unwrap(), 15, 0.0);
    let live = map_builder
        .pose_graph()
        .submap_poses()
        .keys()
        .filter(|id| id.trajectory_id == trajectory_id)
        .count();
    assert!((1..=3).contains(&live), "{} live submaps", live);

    let mut response = SubmapQueryResponse::default();
    let error = map_builder.submap_to_response(SubmapId::new(trajectory_id, 0), &mut response);
    assert!(error.ends_with("maybe it has been trimmed."), "{}", error);

    map_builder.finish_trajectory(trajectory_id);
    assert!(map_builder.pose_graph().submap_poses().is_empty());
    assert!(map_builder.pose_graph().node_poses().is_empty());
    assert!(map_builder.pose_graph().constraints().is_empty());
    assert!(
        !map_builder
            .pose_graph()
            .trimmer_kinds()
            .iter()
            .any(|kind| matches!(kind, TrimmerKind::PureLocalization { .. }))
    );
}

#[test]
fn test_overlapping_trimmer_threshold_in_cells() {
    init_logging();
    let mut map_builder = fresh(MapMode::TwoD);
    let mut options = trajectory_options(MapMode::TwoD);
    options.overlapping_submaps_trimmer_2d = Some(OverlappingSubmapsTrimmerOptions {
        fresh_submaps_count: 2,
        min_covered_area: 0.5,
        min_added_submaps_count: 1,
    });
    map_builder.add_trajectory_builder(&all_sensors(), &options, None);

    // 0.5 m² at 0.1 m resolution.
    let kinds = map_builder.pose_graph().trimmer_kinds();
    assert_eq!(kinds.len(), 1);
    match &kinds[0] {
        TrimmerKind::OverlappingSubmaps {
            fresh_submaps_count,
            min_covered_cells,
            min_added_submaps_count,
        } => {
            assert_eq!(*fresh_submaps_count, 2);
            approx::assert_relative_eq!(*min_covered_cells, 50.0, epsilon = 1e-9);
            assert_eq!(*min_added_submaps_count, 1);
        }
        other => panic!("unexpected trimmer {:?}", other),
    }
}

#[test]
fn test_concurrent_feeding_and_queries() {
    init_logging();
    const STEPS: usize = 30;
    let mut map_builder = MapBuilder::new(map_builder_options(MapMode::TwoD, 4)).unwrap();
    let first =
        map_builder.add_trajectory_builder(&all_sensors(), &trajectory_options(MapMode::TwoD), None);
    let second =
        map_builder.add_trajectory_builder(&all_sensors(), &trajectory_options(MapMode::TwoD), None);

    {
        let map_builder = &map_builder;
        std::thread::scope(|scope| {
            for (trajectory_id, start_x) in [(first, 0.0), (second, 20.0)] {
                scope.spawn(move || {
                    drive(
                        map_builder.trajectory_builder(trajectory_id).unwrap(),
                        STEPS,
                        start_x,
                    );
                });
            }
            scope.spawn(move || {
                let mut response = SubmapQueryResponse::default();
                for _ in 0..50 {
                    let snapshot = map_builder.pose_graph().to_snapshot();
                    assert!(snapshot.num_nodes() <= 2 * STEPS);
                    let _ = map_builder.submap_to_response(SubmapId::new(first, 0), &mut response);
                    let _ = map_builder.local_submap_to_response(&mut response);
                    std::thread::yield_now();
                }
            });
        });
    }

    map_builder.finish_trajectory(first);
    map_builder.finish_trajectory(second);
    map_builder.pose_graph().run_final_optimization();

    let node_poses = map_builder.pose_graph().node_poses();
    assert_eq!(node_poses.len(), 2 * STEPS);
    for trajectory_id in [first, second] {
        let indices: Vec<i32> = node_poses
            .keys()
            .filter(|id| id.trajectory_id == trajectory_id)
            .map(|id| id.node_index)
            .collect();
        assert_eq!(indices, (0..STEPS as i32).collect::<Vec<_>>());
    }

    let submap_poses = map_builder.pose_graph().submap_poses();
    for constraint in map_builder.pose_graph().constraints() {
        assert!(submap_poses.contains_key(&constraint.submap_id));
        assert!(node_poses.contains_key(&constraint.node_id));
    }
    for (submap_id, members) in map_builder.pose_graph().node_membership() {
        assert!(!members.is_empty(), "{} has no nodes", submap_id);
    }
}
