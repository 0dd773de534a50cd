use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::Plane;

/// Per-frame touch predicate against a fitted surface plane.
///
/// Stateless: hysteresis or debouncing belongs to the host, not here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TouchProbe {
    pub plane: Plane,
    /// Maximum plane distance, in meters, still considered a touch.
    pub threshold_m: f64,
}

impl TouchProbe {
    pub fn new(plane: Plane, threshold_m: f64) -> Self {
        Self { plane, threshold_m }
    }

    /// `true` when the tracked point is within the touch threshold of the
    /// surface.
    #[inline]
    pub fn is_touching(&self, p: Point3<f64>) -> bool {
        self.plane.distance_to(p) < self.threshold_m
    }

    /// Signed plane clearance for diagnostics and visualization.
    #[inline]
    pub fn signed_clearance(&self, p: Point3<f64>) -> f64 {
        self.plane.signed_distance_to(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_plane_at(z: f64) -> Plane {
        Plane::from_three_points(
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(0.0, 1.0, z),
        )
        .expect("well formed")
    }

    #[test]
    fn point_on_plane_touches_for_any_positive_threshold() {
        let probe = TouchProbe::new(xy_plane_at(1.0), 1e-6);
        assert!(probe.is_touching(Point3::new(0.2, 0.7, 1.0)));
    }

    #[test]
    fn point_at_twice_threshold_does_not_touch() {
        let probe = TouchProbe::new(xy_plane_at(1.0), 0.02);
        assert!(!probe.is_touching(Point3::new(0.2, 0.7, 1.04)));
    }

    #[test]
    fn clearance_is_signed() {
        let probe = TouchProbe::new(xy_plane_at(1.0), 0.02);
        let a = probe.signed_clearance(Point3::new(0.0, 0.0, 1.1));
        let b = probe.signed_clearance(Point3::new(0.0, 0.0, 0.9));
        assert!(a * b < 0.0);
    }
}
