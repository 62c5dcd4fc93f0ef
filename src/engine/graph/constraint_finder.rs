//! Loop-closure search interface.

use crate::core::{NodeId, Rigid3d, TrajectoryIndexed};

use super::trimmer::SubmapView;
use super::types::{Constraint, ConstraintTag, TrajectoryNode};

/// A freshly added node, as seen by a constraint finder.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// Node id.
    pub node_id: NodeId,
    /// Global pose at insertion time.
    pub global_pose: Rigid3d,
    /// Node content.
    pub node: &'a TrajectoryNode,
}

/// Finds inter-submap constraints for new nodes.
pub trait ConstraintFinder: Send + Sync {
    /// Constraints between `node` and any of the finished `submaps`.
    fn find_constraints(&self, node: &NodeContext<'_>, submaps: &[SubmapView<'_>]) -> Vec<Constraint>;
}

/// Links a node to the nearest finished submap of another trajectory.
///
/// The relative pose is taken from the current global estimates, so the
/// constraint ties trajectories together without correcting them.
#[derive(Debug, Clone)]
pub struct ProximityConstraintFinder {
    max_distance: f64,
    translation_weight: f64,
    rotation_weight: f64,
}

impl ProximityConstraintFinder {
    /// Match within `max_distance` meters of the submap origin.
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            translation_weight: 1.0,
            rotation_weight: 1.0,
        }
    }

    /// Override the weights of produced constraints.
    pub fn with_weights(mut self, translation_weight: f64, rotation_weight: f64) -> Self {
        self.translation_weight = translation_weight;
        self.rotation_weight = rotation_weight;
        self
    }
}

impl ConstraintFinder for ProximityConstraintFinder {
    fn find_constraints(&self, node: &NodeContext<'_>, submaps: &[SubmapView<'_>]) -> Vec<Constraint> {
        let position = node.global_pose.translation.vector;
        submaps
            .iter()
            .filter(|view| view.id.trajectory_id() != node.node_id.trajectory_id())
            .map(|view| {
                let distance = (view.global_pose.translation.vector - position).norm();
                (distance, view)
            })
            .filter(|(distance, _)| *distance <= self.max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, view)| Constraint {
                submap_id: view.id,
                node_id: node.node_id,
                relative_pose: view.global_pose.inverse() * node.global_pose,
                translation_weight: self.translation_weight,
                rotation_weight: self.rotation_weight,
                tag: ConstraintTag::InterSubmap,
            })
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SubmapId, rigid3_from_parts};
    use crate::engine::submap::Submap;
    use nalgebra::{UnitQuaternion, Vector3};

    fn at(x: f64) -> Rigid3d {
        rigid3_from_parts(Vector3::new(x, 0.0, 0.0), UnitQuaternion::identity())
    }

    #[test]
    fn test_nearest_other_trajectory() {
        let submap = Submap::new(Rigid3d::identity(), 0.05);
        let views = [
            SubmapView { id: SubmapId::new(0, 0), global_pose: at(0.5), submap: &submap },
            SubmapView { id: SubmapId::new(1, 0), global_pose: at(3.0), submap: &submap },
            SubmapView { id: SubmapId::new(1, 1), global_pose: at(1.5), submap: &submap },
        ];
        let node = TrajectoryNode {
            timestamp_us: 0,
            local_pose: Rigid3d::identity(),
            gravity_alignment: UnitQuaternion::identity(),
            filtered_points: Vec::new(),
        };
        let context = NodeContext { node_id: NodeId::new(0, 4), global_pose: at(1.0), node: &node };

        let found = ProximityConstraintFinder::new(2.0).find_constraints(&context, &views);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].submap_id, SubmapId::new(1, 1));
        assert_eq!(found[0].tag, ConstraintTag::InterSubmap);

        let none = ProximityConstraintFinder::new(0.1).find_constraints(&context, &views);
        assert!(none.is_empty());
    }
}
