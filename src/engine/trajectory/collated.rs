//! Trajectory builder fed through the shared collator.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{SensorData, SensorId};
use crate::sensor::Collator;

use super::global::GlobalTrajectoryBuilder;

/// Shared collator handle.
pub type SharedCollator = Arc<Mutex<Box<dyn Collator>>>;

/// Routes raw sensor data through the collator into a
/// [`GlobalTrajectoryBuilder`].
pub struct CollatedTrajectoryBuilder {
    trajectory_id: i32,
    collator: SharedCollator,
    expected_sensor_ids: BTreeSet<String>,
}

impl CollatedTrajectoryBuilder {
    /// Register `wrapped` with the collator for the expected sensors.
    pub fn new(
        trajectory_id: i32,
        expected_sensor_ids: &BTreeSet<SensorId>,
        collator: SharedCollator,
        wrapped: GlobalTrajectoryBuilder,
    ) -> Self {
        let expected: BTreeSet<String> = expected_sensor_ids
            .iter()
            .map(|sensor_id| sensor_id.id.clone())
            .collect();
        let wrapped = Arc::new(Mutex::new(wrapped));
        collator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_trajectory(
                trajectory_id,
                &expected,
                Box::new(move |sensor_id, data| {
                    wrapped
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .add_sensor_data(sensor_id, data);
                }),
            );
        Self {
            trajectory_id,
            collator,
            expected_sensor_ids: expected,
        }
    }

    /// Trajectory id.
    pub fn trajectory_id(&self) -> i32 {
        self.trajectory_id
    }

    /// Sensor stream names this trajectory accepts.
    pub fn expected_sensor_ids(&self) -> &BTreeSet<String> {
        &self.expected_sensor_ids
    }

    /// Queue one observation from `sensor_id`.
    pub fn add_sensor_data(&self, sensor_id: &str, data: SensorData) {
        self.collator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_sensor_data(self.trajectory_id, sensor_id, data);
    }
}
