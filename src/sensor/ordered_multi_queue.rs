//! Time-ordered merge of several sensor queues.
//!
//! Each queue is keyed by `(trajectory_id, sensor id)`. Data is dispatched
//! in timestamp order across all queues, which means nothing leaves until
//! every unfinished queue holds at least one observation. Finished queues
//! drain and are then dropped.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::SensorData;

/// Receives collated observations for one trajectory: `(sensor_id, data)`.
pub type SensorCallback = Box<dyn FnMut(&str, SensorData) + Send>;

/// Key of one queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    /// Owning trajectory.
    pub trajectory_id: i32,
    /// Sensor stream name.
    pub sensor_id: String,
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.trajectory_id, self.sensor_id)
    }
}

#[derive(Default)]
struct Queue {
    data: VecDeque<SensorData>,
    finished: bool,
}

/// Merges queues of observations into one time-ordered stream.
#[derive(Default)]
pub struct OrderedMultiQueue {
    queues: BTreeMap<QueueKey, Queue>,
    callbacks: BTreeMap<i32, SensorCallback>,
    finished_trajectories: BTreeSet<i32>,
    last_dispatched_us: u64,
    blocker: Option<QueueKey>,
}

impl OrderedMultiQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one queue per sensor id of `trajectory_id`.
    pub fn add_trajectory(
        &mut self,
        trajectory_id: i32,
        sensor_ids: &BTreeSet<String>,
        callback: SensorCallback,
    ) {
        for sensor_id in sensor_ids {
            let key = QueueKey {
                trajectory_id,
                sensor_id: sensor_id.clone(),
            };
            if self.queues.insert(key.clone(), Queue::default()).is_some() {
                log::warn!("Queue {} registered twice, previous data dropped", key);
            }
        }
        self.callbacks.insert(trajectory_id, callback);
        self.finished_trajectories.remove(&trajectory_id);
    }

    /// Whether a trajectory has been registered and not yet finished.
    pub fn has_trajectory(&self, trajectory_id: i32) -> bool {
        self.callbacks.contains_key(&trajectory_id)
            && !self.finished_trajectories.contains(&trajectory_id)
    }

    /// Queue one observation and dispatch whatever became ready.
    pub fn add(&mut self, trajectory_id: i32, sensor_id: &str, data: SensorData) {
        let key = QueueKey {
            trajectory_id,
            sensor_id: sensor_id.to_string(),
        };
        match self.queues.get_mut(&key) {
            Some(queue) if !queue.finished => queue.data.push_back(data),
            Some(_) => {
                log::warn!("Queue {} is finished, dropping data", key);
                return;
            }
            None => {
                if self.finished_trajectories.contains(&trajectory_id) {
                    log::warn!("Trajectory {} is finished, dropping data", trajectory_id);
                } else {
                    log::warn!("Ignored data for unexpected sensor {}", key);
                }
                return;
            }
        }
        self.dispatch();
    }

    /// No more data will arrive for any queue of `trajectory_id`.
    pub fn mark_trajectory_finished(&mut self, trajectory_id: i32) {
        for (key, queue) in self.queues.iter_mut() {
            if key.trajectory_id == trajectory_id {
                queue.finished = true;
            }
        }
        self.finished_trajectories.insert(trajectory_id);
        self.dispatch();
    }

    /// Finish every queue and dispatch everything left.
    ///
    /// Queues stay finished: later observations are dropped.
    pub fn flush(&mut self) {
        for queue in self.queues.values_mut() {
            queue.finished = true;
        }
        self.dispatch();
    }

    /// Number of queued observations across all queues.
    pub fn num_pending(&self) -> usize {
        self.queues.values().map(|queue| queue.data.len()).sum()
    }

    /// Queue currently holding back dispatch, if any.
    pub fn blocker(&self) -> Option<&QueueKey> {
        self.blocker.as_ref()
    }

    fn dispatch(&mut self) {
        loop {
            let mut next: Option<(QueueKey, u64)> = None;
            for (key, queue) in &self.queues {
                match queue.data.front() {
                    Some(data) => {
                        let timestamp_us = data.timestamp_us();
                        if next.as_ref().is_none_or(|(_, best)| timestamp_us < *best) {
                            next = Some((key.clone(), timestamp_us));
                        }
                    }
                    None if queue.finished => {}
                    None => {
                        if self.blocker.as_ref() != Some(key) {
                            log::debug!("Waiting for data on queue {}", key);
                            self.blocker = Some(key.clone());
                        }
                        return;
                    }
                }
            }
            self.blocker = None;

            let Some((key, timestamp_us)) = next else {
                self.queues.retain(|_, queue| !queue.finished);
                let live: BTreeSet<i32> = self.queues.keys().map(|k| k.trajectory_id).collect();
                let finished = &self.finished_trajectories;
                self.callbacks
                    .retain(|trajectory_id, _| live.contains(trajectory_id) || !finished.contains(trajectory_id));
                return;
            };

            let Some(data) = self.queues.get_mut(&key).and_then(|q| q.data.pop_front()) else {
                return;
            };
            if timestamp_us < self.last_dispatched_us {
                log::warn!(
                    "Non-sorted data on queue {}: {} < {}, dropping",
                    key,
                    timestamp_us,
                    self.last_dispatched_us
                );
                continue;
            }
            self.last_dispatched_us = timestamp_us;
            if let Some(callback) = self.callbacks.get_mut(&key.trajectory_id) {
                callback(&key.sensor_id, data);
            }
        }
    }
}
