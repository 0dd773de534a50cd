use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// Minimum cross-product magnitude below which three points are treated as
/// collinear.
const COLLINEAR_EPS: f64 = 1e-9;

/// Plane in Hessian normal form: `normal . p + d = 0`.
///
/// The normal is unit length; this is established at construction and
/// asserted on every distance query, since a non-unit normal reaching a
/// distance computation is a programming error, not a data error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Fit the plane through three sensor-space points (meters).
    ///
    /// Fails with [`GeometryError::DegeneratePlane`] when the points are
    /// collinear or coincident.
    pub fn from_three_points(
        p0: Point3<f64>,
        p1: Point3<f64>,
        p2: Point3<f64>,
    ) -> Result<Self, GeometryError> {
        let v1 = p1 - p0;
        let v2 = p2 - p0;
        let cross = v1.cross(&v2);
        if cross.norm() < COLLINEAR_EPS {
            log::debug!("plane fit rejected: points are collinear");
            return Err(GeometryError::DegeneratePlane);
        }

        let normal = normalize_or_up(cross);
        let d = -normal.dot(&p0.coords);
        log::debug!(
            "plane fit ok: normal=({:.4},{:.4},{:.4}) d={:.4}",
            normal.x,
            normal.y,
            normal.z,
            d
        );
        Ok(Self { normal, d })
    }

    /// Signed distance from `p` to the plane, positive on the normal side.
    #[inline]
    pub fn signed_distance_to(&self, p: Point3<f64>) -> f64 {
        assert!(
            (self.normal.norm() - 1.0).abs() < 1e-6,
            "plane normal must be unit length"
        );
        self.normal.dot(&p.coords) + self.d
    }

    /// Unsigned distance from `p` to the plane.
    #[inline]
    pub fn distance_to(&self, p: Point3<f64>) -> f64 {
        self.signed_distance_to(p).abs()
    }
}

/// Normalize `v`, falling back to the +Z unit vector for near-zero input.
///
/// Downstream consumers assume a well-formed unit vector; a NaN must never
/// escape this function.
pub fn normalize_or_up(v: Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();
    if n < COLLINEAR_EPS {
        Vector3::z()
    } else {
        v / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fitted_plane_has_unit_normal_and_contains_points() {
        let p0 = Point3::new(0.1, 0.2, 1.5);
        let p1 = Point3::new(0.8, 0.1, 1.4);
        let p2 = Point3::new(0.3, 0.9, 1.6);
        let plane = Plane::from_three_points(p0, p1, p2).expect("non-degenerate");

        assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-6);
        assert!(plane.distance_to(p0) < 1e-6);
        assert!(plane.distance_to(p1) < 1e-6);
        assert!(plane.distance_to(p2) < 1e-6);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let r = Plane::from_three_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(r, Err(GeometryError::DegeneratePlane));
    }

    #[test]
    fn coincident_points_are_rejected() {
        let p = Point3::new(0.5, 0.5, 1.0);
        assert!(Plane::from_three_points(p, p, Point3::new(1.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn signed_distance_changes_sign_across_plane() {
        let plane = Plane::from_three_points(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        )
        .expect("xy plane at z=1");

        let above = plane.signed_distance_to(Point3::new(0.3, 0.3, 1.2));
        let below = plane.signed_distance_to(Point3::new(0.3, 0.3, 0.8));
        assert!(above * below < 0.0);
        assert_relative_eq!(above.abs(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn normalize_or_up_never_returns_nan() {
        let v = normalize_or_up(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(v, Vector3::z());
        let w = normalize_or_up(Vector3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(w.norm(), 1.0, epsilon = 1e-12);
    }
}
