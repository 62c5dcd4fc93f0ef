//! Global optimization pass.
//!
//! Not a least-squares solver. Each iteration relaxes every node of a
//! non-frozen trajectory towards the poses its constraints predict:
//!
//! ```text
//! candidate(c) = submap_global(c.submap) * c.relative_pose
//! node_global  = weighted_mean(candidate(c) for c in constraints(node))
//! ```
//!
//! Weights are the constraint's translation weight, down-weighted Huber-style
//! when the candidate lies further than `huber_scale` from the current pose.
//! Submap poses act as anchors and are not moved.

use std::collections::BTreeMap;

use nalgebra::{Quaternion, UnitQuaternion, Vector3, Vector4};

use crate::config::{MapMode, OptimizationProblemOptions};
use crate::core::{NodeId, Rigid3d, TrajectoryIndexed, rigid3_from_parts};

use super::data::PoseGraphData;

/// Outcome of one optimization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizationSummary {
    /// Iterations performed.
    pub iterations: usize,
    /// Nodes whose pose was recomputed.
    pub nodes_updated: usize,
    /// Sum of squared translation residuals before.
    pub initial_error: f64,
    /// Sum of squared translation residuals after.
    pub final_error: f64,
}

/// Mode-specific optimization problem injected into the pose graph.
pub trait OptimizationProblem: Send + Sync + 'static {
    /// Mode this problem optimizes for.
    fn mode(&self) -> MapMode;

    /// Problem options.
    fn options(&self) -> &OptimizationProblemOptions;

    /// Run one optimization over the graph.
    fn solve(&self, data: &mut PoseGraphData) -> OptimizationSummary;
}

/// Planar optimization problem.
#[derive(Debug, Clone)]
pub struct OptimizationProblem2D {
    options: OptimizationProblemOptions,
}

impl OptimizationProblem2D {
    /// Create with options.
    pub fn new(options: OptimizationProblemOptions) -> Self {
        Self { options }
    }
}

impl OptimizationProblem for OptimizationProblem2D {
    fn mode(&self) -> MapMode {
        MapMode::TwoD
    }

    fn options(&self) -> &OptimizationProblemOptions {
        &self.options
    }

    fn solve(&self, data: &mut PoseGraphData) -> OptimizationSummary {
        relax(data, &self.options)
    }
}

/// Full 6-DoF optimization problem.
#[derive(Debug, Clone)]
pub struct OptimizationProblem3D {
    options: OptimizationProblemOptions,
}

impl OptimizationProblem3D {
    /// Create with options.
    pub fn new(options: OptimizationProblemOptions) -> Self {
        Self { options }
    }
}

impl OptimizationProblem for OptimizationProblem3D {
    fn mode(&self) -> MapMode {
        MapMode::ThreeD
    }

    fn options(&self) -> &OptimizationProblemOptions {
        &self.options
    }

    fn solve(&self, data: &mut PoseGraphData) -> OptimizationSummary {
        relax(data, &self.options)
    }
}

/// Candidate global poses per node, with constraint weights.
fn candidates(data: &PoseGraphData) -> BTreeMap<NodeId, Vec<(Rigid3d, f64)>> {
    let mut candidates: BTreeMap<NodeId, Vec<(Rigid3d, f64)>> = BTreeMap::new();
    for constraint in &data.constraints {
        let Some(submap) = data.submaps.get(&constraint.submap_id) else {
            continue;
        };
        candidates
            .entry(constraint.node_id)
            .or_default()
            .push((
                submap.global_pose * constraint.relative_pose,
                constraint.translation_weight,
            ));
    }
    candidates
}

fn residual_error(data: &PoseGraphData, candidates: &BTreeMap<NodeId, Vec<(Rigid3d, f64)>>) -> f64 {
    candidates
        .iter()
        .filter_map(|(node_id, poses)| data.nodes.get(node_id).map(|node| (node, poses)))
        .flat_map(|(node, poses)| {
            poses.iter().map(move |(pose, _)| {
                (pose.translation.vector - node.global_pose.translation.vector).norm_squared()
            })
        })
        .sum()
}

fn weighted_mean(current: &Rigid3d, poses: &[(Rigid3d, f64)], huber_scale: f64) -> Option<Rigid3d> {
    let mut translation = Vector3::zeros();
    let mut rotation = Vector4::zeros();
    let mut total_weight = 0.0;
    let reference = current.rotation.coords;

    for (pose, weight) in poses {
        let residual = (pose.translation.vector - current.translation.vector).norm();
        let robust = if residual <= huber_scale || residual == 0.0 {
            1.0
        } else {
            huber_scale / residual
        };
        let w = weight.max(f64::EPSILON) * robust;
        translation += pose.translation.vector * w;
        let coords = pose.rotation.coords;
        let sign = if coords.dot(&reference) < 0.0 { -1.0 } else { 1.0 };
        rotation += coords * (sign * w);
        total_weight += w;
    }

    if total_weight <= 0.0 {
        return None;
    }
    let rotation = if rotation.norm() > f64::EPSILON {
        UnitQuaternion::new_normalize(Quaternion::from_vector(rotation))
    } else {
        current.rotation
    };
    Some(rigid3_from_parts(translation / total_weight, rotation))
}

fn relax(data: &mut PoseGraphData, options: &OptimizationProblemOptions) -> OptimizationSummary {
    let mut summary = OptimizationSummary {
        initial_error: residual_error(data, &candidates(data)),
        ..Default::default()
    };

    for _ in 0..options.max_num_iterations.max(1) {
        let candidates = candidates(data);
        let mut updates = Vec::new();
        for (node_id, poses) in &candidates {
            if data.is_frozen(node_id.trajectory_id()) {
                continue;
            }
            let Some(node) = data.nodes.get(node_id) else {
                continue;
            };
            if let Some(pose) = weighted_mean(&node.global_pose, poses, options.huber_scale) {
                updates.push((*node_id, data.canonical(&pose)));
            }
        }
        summary.nodes_updated = updates.len();
        for (node_id, pose) in updates {
            if let Some(node) = data.nodes.get_mut(&node_id) {
                node.global_pose = pose;
            }
        }
        summary.iterations += 1;
    }

    summary.final_error = residual_error(data, &candidates(data));
    data.num_optimizations += 1;
    summary
}
