//! Ordered-by-trajectory container.
//!
//! A sorted map keyed by a composite `(trajectory_id, index)` id. Range
//! queries over one trajectory are bounded scans of the underlying
//! `BTreeMap`. Removing an entry never renumbers: the next index handed out
//! by [`MapById::append`] is remembered per trajectory.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::RangeInclusive;

use thiserror::Error;

use super::id::TrajectoryIndexed;

/// Insert attempted on an id that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Duplicate id: trajectory {trajectory_id}, index {index}")]
pub struct DuplicateIdError {
    /// Trajectory of the rejected id.
    pub trajectory_id: i32,
    /// Index of the rejected id.
    pub index: i32,
}

/// Values keyed by a composite id, grouped by trajectory.
#[derive(Debug, Clone)]
pub struct MapById<K, V> {
    data: BTreeMap<K, V>,
    next_index: BTreeMap<i32, i32>,
}

impl<K, V> Default for MapById<K, V> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            next_index: BTreeMap::new(),
        }
    }
}

impl<K: TrajectoryIndexed, V> MapById<K, V> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    fn trajectory_range(trajectory_id: i32) -> RangeInclusive<K> {
        K::from_parts(trajectory_id, i32::MIN)..=K::from_parts(trajectory_id, i32::MAX)
    }

    /// Append at the next dense index of `trajectory_id`.
    pub fn append(&mut self, trajectory_id: i32, value: V) -> K {
        let index = self.next_index.entry(trajectory_id).or_insert(0);
        let id = K::from_parts(trajectory_id, *index);
        *index += 1;
        self.data.insert(id, value);
        id
    }

    /// Insert at an explicit id.
    ///
    /// Fails if the id is already present. The trajectory's next append
    /// index moves past `id` if needed.
    pub fn insert(&mut self, id: K, value: V) -> Result<(), DuplicateIdError> {
        if self.data.contains_key(&id) {
            return Err(DuplicateIdError {
                trajectory_id: id.trajectory_id(),
                index: id.index(),
            });
        }
        let next = self.next_index.entry(id.trajectory_id()).or_insert(0);
        if *next <= id.index() {
            *next = id.index() + 1;
        }
        self.data.insert(id, value);
        Ok(())
    }

    /// Get a value by id.
    pub fn get(&self, id: &K) -> Option<&V> {
        self.data.get(id)
    }

    /// Get a value by id mutably.
    pub fn get_mut(&mut self, id: &K) -> Option<&mut V> {
        self.data.get_mut(id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &K) -> bool {
        self.data.contains_key(id)
    }

    /// Remove an entry. Indices of the remaining entries are untouched.
    pub fn remove(&mut self, id: &K) -> Option<V> {
        self.data.remove(id)
    }

    /// All entries of one trajectory in index order.
    pub fn trajectory(&self, trajectory_id: i32) -> btree_map::Range<'_, K, V> {
        self.data.range(Self::trajectory_range(trajectory_id))
    }

    /// Entry with the smallest index of `trajectory_id`.
    pub fn first_of(&self, trajectory_id: i32) -> Option<(&K, &V)> {
        self.trajectory(trajectory_id).next()
    }

    /// Entry with the largest index of `trajectory_id`.
    pub fn last_of(&self, trajectory_id: i32) -> Option<(&K, &V)> {
        self.trajectory(trajectory_id).next_back()
    }

    /// Index the next [`append`](Self::append) on `trajectory_id` will use.
    pub fn next_index(&self, trajectory_id: i32) -> i32 {
        self.next_index.get(&trajectory_id).copied().unwrap_or(0)
    }

    /// Number of live entries of `trajectory_id`.
    pub fn size_of_trajectory(&self, trajectory_id: i32) -> usize {
        self.trajectory(trajectory_id).count()
    }

    /// Trajectory ids with at least one live entry, ascending.
    pub fn trajectory_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = Vec::new();
        for id in self.data.keys() {
            if ids.last() != Some(&id.trajectory_id()) {
                ids.push(id.trajectory_id());
            }
        }
        ids
    }

    /// All entries in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.data.iter()
    }

    /// All ids in order.
    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.data.keys()
    }

    /// Total number of live entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::{NodeId, SubmapId};

    #[test]
    fn test_append_is_dense_per_trajectory() {
        let mut map: MapById<NodeId, &str> = MapById::new();
        assert_eq!(map.append(0, "a"), NodeId::new(0, 0));
        assert_eq!(map.append(1, "b"), NodeId::new(1, 0));
        assert_eq!(map.append(0, "c"), NodeId::new(0, 1));
        assert_eq!(map.size_of_trajectory(0), 2);
        assert_eq!(map.size_of_trajectory(1), 1);
        assert_eq!(map.size_of_trajectory(7), 0);
    }

    #[test]
    fn test_remove_does_not_renumber() {
        let mut map: MapById<SubmapId, i32> = MapById::new();
        for i in 0..3 {
            map.append(2, i);
        }
        map.remove(&SubmapId::new(2, 2));
        assert_eq!(map.append(2, 10), SubmapId::new(2, 3));
        assert!(!map.contains(&SubmapId::new(2, 2)));
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut map: MapById<SubmapId, i32> = MapById::new();
        map.insert(SubmapId::new(0, 4), 1).unwrap();
        let err = map.insert(SubmapId::new(0, 4), 2).unwrap_err();
        assert_eq!(err.index, 4);
        assert_eq!(map.get(&SubmapId::new(0, 4)), Some(&1));
        assert_eq!(map.next_index(0), 5);
    }

    #[test]
    fn test_trajectory_range_and_bounds() {
        let mut map: MapById<NodeId, i32> = MapById::new();
        map.insert(NodeId::new(1, 3), 13).unwrap();
        map.insert(NodeId::new(0, 0), 0).unwrap();
        map.insert(NodeId::new(1, 1), 11).unwrap();
        map.insert(NodeId::new(2, 0), 20).unwrap();

        let values: Vec<i32> = map.trajectory(1).map(|(_, v)| *v).collect();
        assert_eq!(values, vec![11, 13]);
        assert_eq!(map.first_of(1).map(|(id, _)| *id), Some(NodeId::new(1, 1)));
        assert_eq!(map.last_of(1).map(|(id, _)| *id), Some(NodeId::new(1, 3)));
        assert!(map.first_of(5).is_none());
        assert_eq!(map.trajectory_ids(), vec![0, 1, 2]);
    }
}
