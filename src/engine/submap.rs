//! Submap content.
//!
//! A submap is a local hit grid built from a window of consecutive range
//! data. Once it has seen twice its configured window it is finished and
//! never changes again; only its global pose moves as the pose graph is
//! optimized.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──(2 × num_range_data insertions)──▶ Finished
//! ```

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::Rigid3d;

/// Integer cell index `(x, y, z)`. 2D grids always use `z = 0`.
pub type CellIndex = (i32, i32, i32);

/// Sparse hit-count grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    resolution: f64,
    cells: BTreeMap<CellIndex, u32>,
}

impl Grid {
    /// Create an empty grid with `resolution` meters per cell.
    pub fn new(resolution: f64) -> Self {
        Self {
            resolution,
            cells: BTreeMap::new(),
        }
    }

    /// Meters per cell.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Cell containing `point`.
    pub fn cell_index(&self, point: &Vector3<f64>) -> CellIndex {
        (
            (point.x / self.resolution).floor() as i32,
            (point.y / self.resolution).floor() as i32,
            (point.z / self.resolution).floor() as i32,
        )
    }

    /// Center of a cell in grid coordinates.
    pub fn cell_center(&self, index: CellIndex) -> Vector3<f64> {
        Vector3::new(
            (index.0 as f64 + 0.5) * self.resolution,
            (index.1 as f64 + 0.5) * self.resolution,
            (index.2 as f64 + 0.5) * self.resolution,
        )
    }

    /// Record a hit at `point`.
    pub fn add_hit(&mut self, point: &Vector3<f64>) {
        let index = self.cell_index(point);
        *self.cells.entry(index).or_insert(0) += 1;
    }

    /// Hit count of a cell.
    pub fn hits(&self, index: CellIndex) -> u32 {
        self.cells.get(&index).copied().unwrap_or(0)
    }

    /// Cells with at least one hit.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// All hit cells in index order.
    pub fn cells(&self) -> impl Iterator<Item = (CellIndex, u32)> + '_ {
        self.cells.iter().map(|(index, hits)| (*index, *hits))
    }
}

/// A locally consistent patch of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submap {
    /// Pose of the submap origin in the trajectory's local frame.
    pub local_pose: Rigid3d,
    num_range_data: usize,
    finished: bool,
    grid: Grid,
}

impl Submap {
    /// Create an empty active submap at `local_pose`.
    pub fn new(local_pose: Rigid3d, resolution: f64) -> Self {
        Self {
            local_pose,
            num_range_data: 0,
            finished: false,
            grid: Grid::new(resolution),
        }
    }

    /// The hit grid, in submap coordinates.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Range data inserted so far. Doubles as the submap version.
    pub fn num_range_data(&self) -> usize {
        self.num_range_data
    }

    /// Whether insertion has finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Insert points given in the trajectory's local frame.
    ///
    /// Returns `false` if the submap is already finished.
    pub fn insert_range_data(&mut self, points_in_local: &[Vector3<f32>]) -> bool {
        if self.finished {
            return false;
        }
        let to_submap = self.local_pose.inverse();
        for point in points_in_local {
            let local = Vector3::new(point.x as f64, point.y as f64, point.z as f64);
            let in_submap = to_submap.transform_point(&local.into());
            self.grid.add_hit(&in_submap.coords);
        }
        self.num_range_data += 1;
        true
    }

    /// Stop accepting range data.
    pub fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigid3_from_parts;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_grid_cell_index() {
        let grid = Grid::new(0.5);
        assert_eq!(grid.cell_index(&Vector3::new(0.1, 0.6, 0.0)), (0, 1, 0));
        assert_eq!(grid.cell_index(&Vector3::new(-0.1, -0.6, 0.0)), (-1, -2, 0));
    }

    #[test]
    fn test_insert_in_submap_frame() {
        let origin = rigid3_from_parts(Vector3::new(2.0, 0.0, 0.0), UnitQuaternion::identity());
        let mut submap = Submap::new(origin, 1.0);
        assert!(submap.insert_range_data(&[Vector3::new(2.5, 0.5, 0.0)]));
        assert_eq!(submap.grid().hits((0, 0, 0)), 1);
        assert_eq!(submap.num_range_data(), 1);
    }

    #[test]
    fn test_finished_rejects_data() {
        let mut submap = Submap::new(Rigid3d::identity(), 0.1);
        submap.finish();
        assert!(!submap.insert_range_data(&[Vector3::new(1.0, 0.0, 0.0)]));
        assert_eq!(submap.num_range_data(), 0);
        assert_eq!(submap.grid().num_cells(), 0);
    }
}
