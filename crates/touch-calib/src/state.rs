use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use touch_calib_core::{Homography, Plane, TouchProbe};

/// The persisted output of one calibration session.
///
/// Plain data with no behavior beyond convenience accessors; the host's
/// persistence collaborator stores it and reloads it verbatim (it is
/// serde-serializable for exactly that purpose). Corner order is TL, TR,
/// BR, BL in both coordinate sets. Instances are immutable: re-calibration
/// replaces the whole record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCalibration {
    /// Working-surface plane in sensor space.
    pub plane: Plane,
    /// Surface corners in normalized `[0,1]^2` color-image coordinates.
    pub corners_norm: [Point2<f32>; 4],
    /// Surface corners in sensor space (meters).
    pub corners_world: [Point3<f64>; 4],
    /// Camera-space to projector-space transform.
    pub homography: Homography,
    /// Touch threshold in meters.
    pub touch_threshold_m: f64,
}

impl SurfaceCalibration {
    /// Touch predicate bound to this calibration.
    pub fn touch_probe(&self) -> TouchProbe {
        TouchProbe::new(self.plane, self.touch_threshold_m)
    }

    /// Map a camera-space point onto projector pixels.
    pub fn project_to_display(&self, camera_point: Point2<f32>) -> Point2<f32> {
        self.homography.apply(camera_point)
    }
}
