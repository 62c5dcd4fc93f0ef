//! Per-trajectory options.
//!
//! These travel inside persisted state: every field must stay readable by
//! postcard, so no `flatten`, `untagged` or `skip_serializing_if`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::defaults;
use super::map_builder::MapMode;
use crate::core::{Rigid3d, SensorId};

/// Submap options of a local trajectory builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmapsOptions {
    /// Range data insertions before the next submap is started.
    /// The older submap finishes after twice this many.
    #[serde(default = "defaults::num_range_data")]
    pub num_range_data: usize,

    /// Grid resolution in meters per cell.
    #[serde(default = "defaults::grid_resolution")]
    pub grid_resolution: f64,
}

impl Default for SubmapsOptions {
    fn default() -> Self {
        Self {
            num_range_data: defaults::num_range_data(),
            grid_resolution: defaults::grid_resolution(),
        }
    }
}

/// Local trajectory builder options (shared shape for 2D and 3D).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTrajectoryBuilderOptions {
    /// Points closer than this to the sensor origin are dropped (meters).
    #[serde(default = "defaults::min_range")]
    pub min_range: f32,

    /// Points further than this from the sensor origin are dropped (meters).
    #[serde(default = "defaults::max_range")]
    pub max_range: f32,

    /// Submap options.
    #[serde(default)]
    pub submaps: SubmapsOptions,
}

impl Default for LocalTrajectoryBuilderOptions {
    fn default() -> Self {
        Self {
            min_range: defaults::min_range(),
            max_range: defaults::max_range(),
            submaps: SubmapsOptions::default(),
        }
    }
}

/// Overlapping submaps trimmer (2D only).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlappingSubmapsTrimmerOptions {
    /// Most recent submaps that are never trimmed.
    #[serde(default = "defaults::fresh_submaps_count")]
    pub fresh_submaps_count: usize,

    /// Area (m²) a submap must be the freshest cover of to survive.
    #[serde(default)]
    pub min_covered_area: f64,

    /// Finished submaps that must accumulate between trimming passes.
    #[serde(default = "defaults::min_added_submaps_count")]
    pub min_added_submaps_count: usize,
}

/// Spatial origin of a trajectory relative to another one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialTrajectoryPose {
    /// Trajectory the pose is relative to.
    pub to_trajectory_id: i32,
    /// Pose of the new trajectory's origin in that trajectory's frame.
    pub relative_pose: Rigid3d,
    /// Time at which the relation holds (microseconds).
    pub timestamp_us: u64,
}

/// Options of one trajectory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryBuilderOptions {
    /// Local builder for 2D map builders. `None` means no local SLAM.
    #[serde(default)]
    pub trajectory_builder_2d: Option<LocalTrajectoryBuilderOptions>,

    /// Local builder for 3D map builders. `None` means no local SLAM.
    #[serde(default)]
    pub trajectory_builder_3d: Option<LocalTrajectoryBuilderOptions>,

    /// Overlapping submaps trimmer, honored in 2D only.
    #[serde(default)]
    pub overlapping_submaps_trimmer_2d: Option<OverlappingSubmapsTrimmerOptions>,

    /// Keep only the most recent submaps of this trajectory.
    #[serde(default)]
    pub pure_localization: bool,

    /// Origin relative to another trajectory.
    #[serde(default)]
    pub initial_trajectory_pose: Option<InitialTrajectoryPose>,
}

impl TrajectoryBuilderOptions {
    /// Local builder options for `mode`, if configured.
    pub fn local_builder_options(&self, mode: MapMode) -> Option<&LocalTrajectoryBuilderOptions> {
        match mode {
            MapMode::TwoD => self.trajectory_builder_2d.as_ref(),
            MapMode::ThreeD => self.trajectory_builder_3d.as_ref(),
        }
    }

    /// 2D grid resolution, falling back to the default when no 2D local
    /// builder is configured.
    pub fn grid_resolution_2d(&self) -> f64 {
        self.trajectory_builder_2d
            .as_ref()
            .map(|options| options.submaps.grid_resolution)
            .unwrap_or_else(defaults::grid_resolution)
    }
}

/// Options of one trajectory together with its declared sensors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryBuilderOptionsWithSensorIds {
    /// Expected sensors, fixed at registration.
    pub sensor_ids: BTreeSet<SensorId>,
    /// Trajectory options.
    pub trajectory_builder_options: TrajectoryBuilderOptions,
}

/// Options of every trajectory, indexed by trajectory id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllTrajectoryBuilderOptions {
    /// One entry per trajectory id.
    pub options_with_sensor_ids: Vec<TrajectoryBuilderOptionsWithSensorIds>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_builder_options_follow_mode() {
        let options = TrajectoryBuilderOptions {
            trajectory_builder_3d: Some(LocalTrajectoryBuilderOptions::default()),
            ..Default::default()
        };
        assert!(options.local_builder_options(MapMode::TwoD).is_none());
        assert!(options.local_builder_options(MapMode::ThreeD).is_some());
    }

    #[test]
    fn test_grid_resolution_2d_fallback() {
        let mut options = TrajectoryBuilderOptions::default();
        assert_eq!(options.grid_resolution_2d(), 0.05);

        let mut local = LocalTrajectoryBuilderOptions::default();
        local.submaps.grid_resolution = 0.1;
        options.trajectory_builder_2d = Some(local);
        assert_eq!(options.grid_resolution_2d(), 0.1);
    }

    #[test]
    fn test_options_from_yaml() {
        let yaml = "\
trajectory_builder_2d:
  max_range: 12.0
  submaps:
    num_range_data: 20
overlapping_submaps_trimmer_2d:
  fresh_submaps_count: 2
  min_covered_area: 1.5
pure_localization: true
";
        let options: TrajectoryBuilderOptions = serde_yaml::from_str(yaml).unwrap();
        let local = options.trajectory_builder_2d.as_ref().unwrap();
        assert_eq!(local.max_range, 12.0);
        assert_eq!(local.submaps.num_range_data, 20);
        assert_eq!(local.submaps.grid_resolution, 0.05);

        let trimmer = options.overlapping_submaps_trimmer_2d.as_ref().unwrap();
        assert_eq!(trimmer.fresh_submaps_count, 2);
        assert_eq!(trimmer.min_added_submaps_count, 1);
        assert!(options.pure_localization);
        assert!(options.initial_trajectory_pose.is_none());
    }
}
