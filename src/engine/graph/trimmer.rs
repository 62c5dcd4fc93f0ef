//! Trimming policies.
//!
//! A trimmer never touches the graph's containers directly. It sees the
//! graph through [`Trimmable`] and removes submaps through
//! [`Trimmable::mark_submap_as_trimmed`], which also drops the submap's
//! constraints and any node left without a submap.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector3;

use crate::core::{Rigid3d, SubmapId};
use crate::engine::submap::Submap;

/// Read-only view of one submap during trimming.
#[derive(Debug, Clone, Copy)]
pub struct SubmapView<'a> {
    /// Submap id.
    pub id: SubmapId,
    /// Current global pose.
    pub global_pose: Rigid3d,
    /// Submap content.
    pub submap: &'a Submap,
}

/// Deletion contract exposed to trimmers.
pub trait Trimmable {
    /// Live submaps of a trajectory.
    fn num_submaps(&self, trajectory_id: i32) -> usize;

    /// Ids of the live submaps of a trajectory, oldest first.
    fn submap_ids(&self, trajectory_id: i32) -> Vec<SubmapId>;

    /// Every live submap of every trajectory.
    fn submap_views(&self) -> Vec<SubmapView<'_>>;

    /// Remove a finished submap.
    fn mark_submap_as_trimmed(&mut self, submap_id: SubmapId);

    /// Whether the trajectory will receive no more data.
    fn is_finished(&self, trajectory_id: i32) -> bool;
}

/// Configuration of a registered trimmer, for introspection.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimmerKind {
    /// Keep only the freshest submaps covering each cell.
    OverlappingSubmaps {
        /// Freshest submaps credited per cell.
        fresh_submaps_count: usize,
        /// Cells a submap must be credited with to survive.
        min_covered_cells: f64,
        /// Submaps to accumulate between passes.
        min_added_submaps_count: usize,
    },
    /// Keep only the most recent submaps of one trajectory.
    PureLocalization {
        /// Trajectory being trimmed.
        trajectory_id: i32,
        /// Submaps kept while the trajectory is live.
        max_submaps_to_keep: usize,
    },
}

/// A policy deciding which submaps to remove.
pub trait Trimmer: Send {
    /// Inspect the graph and trim.
    fn trim(&mut self, graph: &mut dyn Trimmable);

    /// Once true the trimmer is dropped from the graph.
    fn is_finished(&self) -> bool;

    /// Configuration summary.
    fn kind(&self) -> TrimmerKind;
}

/// Keeps the last `max_submaps_to_keep` submaps of a trajectory, and none
/// once the trajectory is finished.
#[derive(Debug, Clone)]
pub struct PureLocalizationTrimmer {
    trajectory_id: i32,
    max_submaps_to_keep: usize,
    num_submaps_to_keep: usize,
    finished: bool,
}

impl PureLocalizationTrimmer {
    /// Create a trimmer for `trajectory_id`.
    pub fn new(trajectory_id: i32, max_submaps_to_keep: usize) -> Self {
        Self {
            trajectory_id,
            max_submaps_to_keep,
            num_submaps_to_keep: max_submaps_to_keep,
            finished: false,
        }
    }
}

impl Trimmer for PureLocalizationTrimmer {
    fn trim(&mut self, graph: &mut dyn Trimmable) {
        if graph.is_finished(self.trajectory_id) {
            self.num_submaps_to_keep = 0;
        }

        let submap_ids = graph.submap_ids(self.trajectory_id);
        let excess = submap_ids.len().saturating_sub(self.num_submaps_to_keep);
        for submap_id in submap_ids.into_iter().take(excess) {
            graph.mark_submap_as_trimmed(submap_id);
        }

        if self.num_submaps_to_keep == 0 {
            self.finished = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn kind(&self) -> TrimmerKind {
        TrimmerKind::PureLocalization {
            trajectory_id: self.trajectory_id,
            max_submaps_to_keep: self.max_submaps_to_keep,
        }
    }
}

/// Removes finished 2D submaps that are the freshest cover of too few cells.
///
/// Every finished submap's hit cells are projected into one global grid.
/// Each global cell credits only its `fresh_submaps_count` freshest covering
/// submaps; a submap credited with fewer than `min_covered_cells` cells is
/// trimmed. Freshness follows submap id order.
#[derive(Debug, Clone)]
pub struct OverlappingSubmapsTrimmer2D {
    fresh_submaps_count: usize,
    min_covered_cells: f64,
    min_added_submaps_count: usize,
    current_submap_count: usize,
}

impl OverlappingSubmapsTrimmer2D {
    /// Create a trimmer. `min_covered_cells` is an area in cells, i.e. the
    /// covered area divided by the squared grid resolution.
    pub fn new(
        fresh_submaps_count: usize,
        min_covered_cells: f64,
        min_added_submaps_count: usize,
    ) -> Self {
        Self {
            fresh_submaps_count,
            min_covered_cells,
            min_added_submaps_count,
            current_submap_count: 0,
        }
    }

    /// Minimum covered cells a submap must keep.
    pub fn min_covered_cells(&self) -> f64 {
        self.min_covered_cells
    }

    fn submaps_to_trim(&self, views: &[SubmapView<'_>]) -> Vec<SubmapId> {
        let finished: Vec<&SubmapView<'_>> =
            views.iter().filter(|view| view.submap.is_finished()).collect();
        let Some(resolution) = finished
            .iter()
            .map(|view| view.submap.grid().resolution())
            .reduce(f64::min)
        else {
            return Vec::new();
        };

        // Global cell -> covering submaps.
        let mut coverage: BTreeMap<(i64, i64), BTreeSet<SubmapId>> = BTreeMap::new();
        for view in &finished {
            let grid = view.submap.grid();
            for (index, _) in grid.cells() {
                let center = grid.cell_center(index);
                let global = view.global_pose.transform_point(&center.into());
                let cell = global_cell(&global.coords, resolution);
                coverage.entry(cell).or_default().insert(view.id);
            }
        }

        let mut credited: BTreeMap<SubmapId, usize> = BTreeMap::new();
        for covering in coverage.values() {
            for submap_id in covering.iter().rev().take(self.fresh_submaps_count) {
                *credited.entry(*submap_id).or_insert(0) += 1;
            }
        }

        finished
            .iter()
            .map(|view| view.id)
            .filter(|id| {
                (credited.get(id).copied().unwrap_or(0) as f64) < self.min_covered_cells
            })
            .collect()
    }
}

fn global_cell(point: &Vector3<f64>, resolution: f64) -> (i64, i64) {
    (
        (point.x / resolution).floor() as i64,
        (point.y / resolution).floor() as i64,
    )
}

impl Trimmer for OverlappingSubmapsTrimmer2D {
    fn trim(&mut self, graph: &mut dyn Trimmable) {
        let to_trim = {
            let views = graph.submap_views();
            if views.len().saturating_sub(self.current_submap_count) < self.min_added_submaps_count
            {
                return;
            }
            let to_trim = self.submaps_to_trim(&views);
            self.current_submap_count = views.len() - to_trim.len();
            to_trim
        };
        if !to_trim.is_empty() {
            log::debug!("Overlapping submaps trimmer removes {} submaps", to_trim.len());
        }
        for submap_id in to_trim {
            graph.mark_submap_as_trimmed(submap_id);
        }
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn kind(&self) -> TrimmerKind {
        TrimmerKind::OverlappingSubmaps {
            fresh_submaps_count: self.fresh_submaps_count,
            min_covered_cells: self.min_covered_cells,
            min_added_submaps_count: self.min_added_submaps_count,
        }
    }
}
