//! Small 3-D helpers shared by the frame and panel code.
//!
//! Global convention: the beam propagates along +y, the manipulator rotates about z, and the
//! plane seen by the beam is x-z.

use crate::error::GeometryError;
use nalgebra::{Matrix3, Rotation3, Vector2, Vector3};

pub type Vec3 = Vector3<f64>;
pub type Vec2 = Vector2<f64>;

/// Relative tolerance used to reject near-collinear basis points.
pub const DEGENERACY_TOLERANCE: f64 = 1e-9;

pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Rotates `v` by `theta` radians about the vertical (z) axis.
pub fn rotate_about_vertical(v: &Vec3, theta: f64) -> Vec3 {
    Rotation3::from_axis_angle(&Vec3::z_axis(), theta) * v
}

/// Orthonormal change of basis between a local frame and its parent.
///
/// `a` maps local -> parent and has the local axes as columns. Because the columns are
/// orthonormal, the inverse is just the transpose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    a: Matrix3<f64>,
    a_inv: Matrix3<f64>,
}

impl Basis {
    pub fn identity() -> Self {
        Self {
            a: Matrix3::identity(),
            a_inv: Matrix3::identity(),
        }
    }

    /// Builds a basis from three points.
    ///
    /// `p1` is the origin, `p3 - p1` points along local x (the width of a panel), `p2 - p1`
    /// along local y (its height), and local z = x × y is the surface normal. The y axis is kept
    /// exactly along `p2 - p1`; x is re-derived so that the set is right-handed and orthonormal
    /// even when `p3 - p1` is not exactly perpendicular to it.
    pub fn from_points(p1: &Vec3, p2: &Vec3, p3: &Vec3) -> Result<Self, GeometryError> {
        if !(p1.iter().chain(p2.iter()).chain(p3.iter())).all(|c| c.is_finite()) {
            return Err(GeometryError::DegenerateBasis);
        }
        let edge_y = p2 - p1;
        let edge_x = p3 - p1;
        let len_y = edge_y.norm();
        let len_x = edge_x.norm();
        if len_y <= f64::EPSILON || len_x <= f64::EPSILON {
            return Err(GeometryError::DegenerateBasis);
        }

        let normal = edge_x.cross(&edge_y);
        if normal.norm() <= DEGENERACY_TOLERANCE * len_x * len_y {
            return Err(GeometryError::DegenerateBasis);
        }

        let n2 = edge_y / len_y;
        let n3 = normal.normalize();
        let n1 = n2.cross(&n3);

        let a = Matrix3::from_columns(&[n1, n2, n3]);
        Ok(Self {
            a,
            a_inv: a.transpose(),
        })
    }

    /// Local -> parent (rotation only).
    pub fn to_parent(&self, v: &Vec3) -> Vec3 {
        self.a * v
    }

    /// Parent -> local (rotation only).
    pub fn to_local(&self, v: &Vec3) -> Vec3 {
        self.a_inv * v
    }

    /// The local x, y and z axes expressed in the parent frame.
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.a.column(0).into_owned(),
            self.a.column(1).into_owned(),
            self.a.column(2).into_owned(),
        ]
    }

    pub fn determinant(&self) -> f64 {
        self.a.determinant()
    }
}

/// Angle of the (x, y) direction in [0, 2π), resolved by quadrant.
///
/// Quadrants: x ≥ 0, y ≥ 0 keeps atan(y/x); x < 0 adds π; x > 0, y < 0 adds 2π. The axes are
/// handled explicitly so the result never depends on the sign of a zero.
pub fn quadrant_angle(x: f64, y: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};

    if y == 0.0 {
        return if x < 0.0 { PI } else { 0.0 };
    }
    if x == 0.0 {
        return if y > 0.0 { FRAC_PI_2 } else { 3.0 * FRAC_PI_2 };
    }
    let theta = (y / x).atan();
    if x > 0.0 && y > 0.0 {
        theta
    } else if x < 0.0 {
        theta + PI
    } else {
        theta + 2.0 * PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn basis_from_axis_aligned_points_is_identity() {
        let basis = Basis::from_points(
            &vec3(0.0, 0.0, 0.0),
            &vec3(0.0, 2.0, 0.0),
            &vec3(3.0, 0.0, 0.0),
        )
        .expect("basis");
        assert_abs_diff_eq!(basis.to_parent(&vec3(1.0, 2.0, 3.0)), vec3(1.0, 2.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn basis_uses_p3_for_width_and_p2_for_height() {
        let basis = Basis::from_points(
            &vec3(0.5, -0.5, 0.0),
            &vec3(0.5, -0.5, 1.0),
            &vec3(0.5, 0.5, 0.0),
        )
        .expect("basis");
        let [x, y, z] = basis.axes();
        assert_abs_diff_eq!(x, vec3(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(y, vec3(0.0, 0.0, 1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(z, vec3(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(basis.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn basis_is_orthonormal_for_skewed_points() {
        let basis = Basis::from_points(
            &vec3(1.0, 2.0, 3.0),
            &vec3(1.5, 2.2, 4.0),
            &vec3(3.0, 1.0, 3.3),
        )
        .expect("basis");
        let v = vec3(0.3, -1.2, 2.5);
        assert_abs_diff_eq!(basis.to_local(&basis.to_parent(&v)), v, epsilon = 1e-12);
        assert_abs_diff_eq!(basis.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let err = Basis::from_points(
            &vec3(0.0, 0.0, 0.0),
            &vec3(1.0, 1.0, 1.0),
            &vec3(2.0, 2.0, 2.0 + 1e-13),
        )
        .expect_err("collinear points should fail");
        assert_eq!(err, GeometryError::DegenerateBasis);

        let err = Basis::from_points(
            &vec3(0.0, 0.0, 0.0),
            &vec3(0.0, 0.0, 0.0),
            &vec3(1.0, 0.0, 0.0),
        )
        .expect_err("coincident points should fail");
        assert_eq!(err, GeometryError::DegenerateBasis);
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let result = Basis::from_points(
            &vec3(f64::NAN, 0.0, 0.0),
            &vec3(0.0, 1.0, 0.0),
            &vec3(1.0, 0.0, 0.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rotate_about_vertical_quarter_turn() {
        let rotated = rotate_about_vertical(&vec3(1.0, 0.0, 2.0), FRAC_PI_2);
        assert_abs_diff_eq!(rotated, vec3(0.0, 1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn quadrant_angle_covers_full_circle() {
        assert_abs_diff_eq!(quadrant_angle(1.0, 0.0), 0.0);
        assert_abs_diff_eq!(quadrant_angle(1.0, 1.0), PI / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quadrant_angle(0.0, 1.0), FRAC_PI_2);
        assert_abs_diff_eq!(quadrant_angle(-1.0, 1.0), 3.0 * PI / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quadrant_angle(-1.0, 0.0), PI);
        assert_abs_diff_eq!(quadrant_angle(-1.0, -1.0), 5.0 * PI / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quadrant_angle(0.0, -1.0), 3.0 * FRAC_PI_2);
        assert_abs_diff_eq!(quadrant_angle(1.0, -1.0), 7.0 * PI / 4.0, epsilon = 1e-12);
        // -0.0 must land on the same branch as +0.0
        assert_abs_diff_eq!(quadrant_angle(-0.0, -1.0), 3.0 * FRAC_PI_2);
    }
}
