//! Collation strategies.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::SensorData;

use super::ordered_multi_queue::{OrderedMultiQueue, SensorCallback};

/// Routes observations to trajectories in a well-defined order.
pub trait Collator: Send {
    /// Register a trajectory and the sensor streams it expects.
    fn add_trajectory(
        &mut self,
        trajectory_id: i32,
        expected_sensor_ids: &BTreeSet<String>,
        callback: SensorCallback,
    );

    /// Queue one observation.
    fn add_sensor_data(&mut self, trajectory_id: i32, sensor_id: &str, data: SensorData);

    /// No more data will arrive for `trajectory_id`.
    fn finish_trajectory(&mut self, trajectory_id: i32);

    /// Dispatch everything still queued. Nothing is accepted afterwards.
    fn flush(&mut self);

    /// Queued observations not yet dispatched.
    fn num_pending(&self) -> usize;
}

/// Orders observations by time across all trajectories.
#[derive(Default)]
pub struct GlobalCollator {
    queue: OrderedMultiQueue,
}

impl GlobalCollator {
    /// Create an empty collator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collator for GlobalCollator {
    fn add_trajectory(
        &mut self,
        trajectory_id: i32,
        expected_sensor_ids: &BTreeSet<String>,
        callback: SensorCallback,
    ) {
        self.queue
            .add_trajectory(trajectory_id, expected_sensor_ids, callback);
    }

    fn add_sensor_data(&mut self, trajectory_id: i32, sensor_id: &str, data: SensorData) {
        self.queue.add(trajectory_id, sensor_id, data);
    }

    fn finish_trajectory(&mut self, trajectory_id: i32) {
        self.queue.mark_trajectory_finished(trajectory_id);
    }

    fn flush(&mut self) {
        self.queue.flush();
    }

    fn num_pending(&self) -> usize {
        self.queue.num_pending()
    }
}

/// Orders observations by time within each trajectory independently.
///
/// A stalled sensor on one trajectory never holds back another.
#[derive(Default)]
pub struct TrajectoryCollator {
    queues: BTreeMap<i32, OrderedMultiQueue>,
}

impl TrajectoryCollator {
    /// Create an empty collator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collator for TrajectoryCollator {
    fn add_trajectory(
        &mut self,
        trajectory_id: i32,
        expected_sensor_ids: &BTreeSet<String>,
        callback: SensorCallback,
    ) {
        let mut queue = OrderedMultiQueue::new();
        queue.add_trajectory(trajectory_id, expected_sensor_ids, callback);
        if self.queues.insert(trajectory_id, queue).is_some() {
            log::warn!("Trajectory {} registered twice with the collator", trajectory_id);
        }
    }

    fn add_sensor_data(&mut self, trajectory_id: i32, sensor_id: &str, data: SensorData) {
        match self.queues.get_mut(&trajectory_id) {
            Some(queue) => queue.add(trajectory_id, sensor_id, data),
            None => log::warn!("Ignored data for unknown trajectory {}", trajectory_id),
        }
    }

    fn finish_trajectory(&mut self, trajectory_id: i32) {
        if let Some(queue) = self.queues.get_mut(&trajectory_id) {
            queue.mark_trajectory_finished(trajectory_id);
        }
    }

    fn flush(&mut self) {
        for queue in self.queues.values_mut() {
            queue.flush();
        }
    }

    fn num_pending(&self) -> usize {
        self.queues.values().map(OrderedMultiQueue::num_pending).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ImuData;
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(i32, u64)>>>;

    fn recorder(trajectory_id: i32, received: &Received) -> SensorCallback {
        let received = Arc::clone(received);
        Box::new(move |_, data| {
            received
                .lock()
                .unwrap()
                .push((trajectory_id, data.timestamp_us()));
        })
    }

    fn imu(timestamp_us: u64) -> SensorData {
        SensorData::Imu(ImuData {
            timestamp_us,
            ..Default::default()
        })
    }

    fn feed(collator: &mut dyn Collator, received: &Received) {
        let sensors: BTreeSet<String> = ["imu".to_string()].into_iter().collect();
        collator.add_trajectory(0, &sensors, recorder(0, received));
        collator.add_trajectory(1, &sensors, recorder(1, received));
        collator.add_sensor_data(0, "imu", imu(10));
        collator.add_sensor_data(0, "imu", imu(30));
        collator.add_sensor_data(1, "imu", imu(20));
    }

    #[test]
    fn test_global_collator_interleaves_trajectories() {
        let received = Received::default();
        let mut collator = GlobalCollator::new();
        feed(&mut collator, &received);
        assert_eq!(*received.lock().unwrap(), vec![(0, 10), (1, 20)]);

        collator.flush();
        assert_eq!(*received.lock().unwrap(), vec![(0, 10), (1, 20), (0, 30)]);
        assert_eq!(collator.num_pending(), 0);

        // Flushed queues stay finished.
        collator.add_sensor_data(1, "imu", imu(50));
        assert_eq!(received.lock().unwrap().len(), 3);
        assert_eq!(collator.num_pending(), 0);
    }

    #[test]
    fn test_trajectory_collator_is_independent() {
        let received = Received::default();
        let mut collator = TrajectoryCollator::new();
        feed(&mut collator, &received);
        assert_eq!(*received.lock().unwrap(), vec![(0, 10), (0, 30), (1, 20)]);
    }

    #[test]
    fn test_finished_trajectory_drops_data() {
        let received = Received::default();
        let mut collator = TrajectoryCollator::new();
        feed(&mut collator, &received);
        collator.finish_trajectory(0);
        collator.add_sensor_data(0, "imu", imu(40));
        collator.add_sensor_data(5, "imu", imu(40));
        assert_eq!(received.lock().unwrap().len(), 3);
    }
}
