//! Map builder and pose graph options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::defaults;
use super::error::{ConfigError, Result};

/// Operating mode, fixed for the lifetime of a map builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapMode {
    /// Planar mapping: every stored pose is projected onto the plane.
    TwoD,
    /// Full 6-DoF mapping.
    ThreeD,
}

impl std::fmt::Display for MapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapMode::TwoD => write!(f, "2D"),
            MapMode::ThreeD => write!(f, "3D"),
        }
    }
}

/// Options of the optimization pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationProblemOptions {
    /// Residual (meters) above which a constraint is down-weighted.
    #[serde(default = "defaults::huber_scale")]
    pub huber_scale: f64,

    /// Relaxation passes per optimization.
    #[serde(default = "defaults::max_num_iterations")]
    pub max_num_iterations: usize,
}

impl Default for OptimizationProblemOptions {
    fn default() -> Self {
        Self {
            huber_scale: defaults::huber_scale(),
            max_num_iterations: defaults::max_num_iterations(),
        }
    }
}

/// Pose graph options, forwarded to the pose graph untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseGraphOptions {
    /// Schedule a background optimization after this many new nodes.
    /// 0 disables background optimization.
    #[serde(default = "defaults::optimize_every_n_nodes")]
    pub optimize_every_n_nodes: usize,

    /// Optimization problem options.
    #[serde(default)]
    pub optimization_problem: OptimizationProblemOptions,
}

impl Default for PoseGraphOptions {
    fn default() -> Self {
        Self {
            optimize_every_n_nodes: defaults::optimize_every_n_nodes(),
            optimization_problem: OptimizationProblemOptions::default(),
        }
    }
}

/// Top-level map builder options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapBuilderOptions {
    /// Build 2D trajectories.
    #[serde(default)]
    pub use_trajectory_builder_2d: bool,

    /// Build 3D trajectories.
    #[serde(default)]
    pub use_trajectory_builder_3d: bool,

    /// Background worker count (0 runs background work inline).
    #[serde(default = "defaults::num_background_threads")]
    pub num_background_threads: usize,

    /// Collate each trajectory independently instead of globally by time.
    #[serde(default)]
    pub collate_by_trajectory: bool,

    /// Pose graph options.
    #[serde(default)]
    pub pose_graph: PoseGraphOptions,
}

impl MapBuilderOptions {
    /// Options for a 2D map builder with defaults elsewhere.
    pub fn new_2d() -> Self {
        Self {
            use_trajectory_builder_2d: true,
            use_trajectory_builder_3d: false,
            num_background_threads: defaults::num_background_threads(),
            collate_by_trajectory: false,
            pose_graph: PoseGraphOptions::default(),
        }
    }

    /// Options for a 3D map builder with defaults elsewhere.
    pub fn new_3d() -> Self {
        Self {
            use_trajectory_builder_2d: false,
            use_trajectory_builder_3d: true,
            ..Self::new_2d()
        }
    }

    /// Load options from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load from the default path (configs/map_builder.yaml), falling back
    /// to 2D defaults when the file is absent.
    pub fn load_default() -> Result<Self> {
        let path = Path::new("configs/map_builder.yaml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new_2d())
        }
    }

    /// Parse and validate from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.mode()?;
        Ok(options)
    }

    /// The single active mode.
    pub fn mode(&self) -> Result<MapMode> {
        match (self.use_trajectory_builder_2d, self.use_trajectory_builder_3d) {
            (true, false) => Ok(MapMode::TwoD),
            (false, true) => Ok(MapMode::ThreeD),
            (two_d, three_d) => Err(ConfigError::AmbiguousMode { two_d, three_d }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_exclusivity() {
        assert_eq!(MapBuilderOptions::new_2d().mode(), Ok(MapMode::TwoD));
        assert_eq!(MapBuilderOptions::new_3d().mode(), Ok(MapMode::ThreeD));

        let mut both = MapBuilderOptions::new_2d();
        both.use_trajectory_builder_3d = true;
        assert!(matches!(
            both.mode(),
            Err(ConfigError::AmbiguousMode {
                two_d: true,
                three_d: true
            })
        ));

        let mut neither = MapBuilderOptions::new_2d();
        neither.use_trajectory_builder_2d = false;
        assert!(neither.mode().is_err());
    }

    #[test]
    fn test_from_yaml_defaults() {
        let options = MapBuilderOptions::from_yaml("use_trajectory_builder_3d: true").unwrap();
        assert_eq!(options.mode(), Ok(MapMode::ThreeD));
        assert_eq!(options.num_background_threads, 4);
        assert!(!options.collate_by_trajectory);
        assert_eq!(options.pose_graph.optimize_every_n_nodes, 90);
    }

    #[test]
    fn test_from_yaml_rejects_both_modes() {
        let yaml = "use_trajectory_builder_2d: true\nuse_trajectory_builder_3d: true\n";
        assert!(matches!(
            MapBuilderOptions::from_yaml(yaml),
            Err(ConfigError::AmbiguousMode { .. })
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut options = MapBuilderOptions::new_2d();
        options.num_background_threads = 2;
        options.collate_by_trajectory = true;
        let yaml = serde_yaml::to_string(&options).unwrap();
        let parsed = MapBuilderOptions::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, options);
    }
}
