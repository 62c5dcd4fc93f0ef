//! Rigid transforms.
//!
//! Global and local poses are full 3D rigid transforms (`Rigid3d`) in both
//! operating modes. The 2D mode keeps them planar by running every pose it
//! stores through [`project_to_plane`].

use std::f64::consts::PI;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Rigid 3D transform (rotation + translation), f64 precision.
pub type Rigid3d = Isometry3<f64>;

/// Build a `Rigid3d` from a translation and a rotation.
#[inline]
pub fn rigid3_from_parts(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Rigid3d {
    Isometry3::from_parts(Translation3::from(translation), rotation)
}

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Drop z, roll and pitch, keeping x, y and yaw.
#[inline]
pub fn project_to_plane(pose: &Rigid3d) -> Rigid3d {
    Pose2D::from_rigid3(pose).to_rigid3()
}

/// Robot pose in the plane.
///
/// Position (x, y) in meters and heading (theta) in radians, normalized to
/// [-π, π].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Heading in radians
    pub theta: f64,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Planar part of a 3D transform.
    pub fn from_rigid3(pose: &Rigid3d) -> Self {
        let (_, _, yaw) = pose.rotation.euler_angles();
        Pose2D::new(pose.translation.x, pose.translation.y, yaw)
    }

    /// Lift into a 3D transform with z = 0 and rotation about +Z only.
    pub fn to_rigid3(&self) -> Rigid3d {
        rigid3_from_parts(
            Vector3::new(self.x, self.y, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.theta),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rigid3_round_trip() {
        let p = Pose2D::new(-3.0, 0.25, FRAC_PI_2);
        let back = Pose2D::from_rigid3(&p.to_rigid3());
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        assert_relative_eq!(back.theta, p.theta, epsilon = 1e-9);
    }

    #[test]
    fn test_project_to_plane_drops_height_and_tilt() {
        let tilted = rigid3_from_parts(
            Vector3::new(1.0, 2.0, 5.0),
            UnitQuaternion::from_euler_angles(0.2, -0.1, 0.7),
        );
        let flat = project_to_plane(&tilted);
        let (roll, pitch, yaw) = flat.rotation.euler_angles();

        assert_relative_eq!(flat.translation.z, 0.0);
        assert_relative_eq!(roll, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pitch, 0.0, epsilon = 1e-9);
        assert_relative_eq!(yaw, 0.7, epsilon = 1e-9);
        assert_relative_eq!(flat.translation.x, 1.0);
    }
}
