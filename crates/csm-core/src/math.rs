//! Linear algebra type aliases and small rotation helpers.

use nalgebra::{Isometry3, Matrix3, Point2, Point3, Rotation3, Unit, Vector2, Vector3};

/// Scalar type used throughout the workspace (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Rotation matrix for `angle` radians about `axis`.
///
/// The axis is normalized internally; returns `None` when it is (numerically) zero.
pub fn rotation_about_axis(axis: &Vec3, angle: Real) -> Option<Mat3> {
    let axis = Unit::try_new(*axis, 1e-12)?;
    Some(*Rotation3::from_axis_angle(&axis, angle).matrix())
}

/// Deviation of `m` from a proper rotation.
///
/// Returns the max-abs entry of `mᵀm - I`, or infinity when `det(m) <= 0`
/// or any entry is not finite.
pub fn rotation_deviation(m: &Mat3) -> Real {
    if m.iter().any(|v| !v.is_finite()) || m.determinant() <= 0.0 {
        return Real::INFINITY;
    }
    (m.transpose() * m - Mat3::identity()).amax()
}

/// Returns true if `m` is orthonormal with positive determinant within `tol`.
pub fn is_rotation(m: &Mat3, tol: Real) -> bool {
    rotation_deviation(m) <= tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn quarter_turn_about_z() {
        let r = rotation_about_axis(&Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2).unwrap();
        let p = r * Vec3::x();
        assert!((p - Vec3::y()).norm() < 1e-12, "rotated {:?}", p);
        assert!(is_rotation(&r, 1e-12));
    }

    #[test]
    fn zero_axis_is_rejected() {
        assert!(rotation_about_axis(&Vec3::zeros(), 0.3).is_none());
    }

    #[test]
    fn reflections_and_scales_are_not_rotations() {
        let reflect = Mat3::from_diagonal(&Vec3::new(1.0, 1.0, -1.0));
        assert!(!is_rotation(&reflect, 1e-6));
        assert!(rotation_deviation(&reflect).is_infinite());

        let scaled = Mat3::identity() * 1.01;
        assert!(!is_rotation(&scaled, 1e-6));
        assert!(is_rotation(&scaled, 0.1));
    }
}
