//! The calibration session.
//!
//! A session accumulates the inputs of one calibration pass (three surface
//! points for the plane, four corner snapshots, a marker detection report,
//! and the projector-side marker centers) and assembles the final record
//! in one step. Inputs are plain snapshots handed in by the host; the
//! session never subscribes to anything. `finish` either returns a complete
//! [`SurfaceCalibration`] or an error, so a failed attempt can never leave
//! a partially overwritten record behind.

use nalgebra::{Point2, Point3};
use touch_calib_core::{Homography, Plane, ViewportMapping};
use touch_calib_fiducial::DetectionReport;

use crate::error::CalibrationError;
use crate::frame::{DepthProjector, MarkerCanvas};
use crate::state::SurfaceCalibration;

/// Default touch threshold in meters.
pub const DEFAULT_TOUCH_THRESHOLD_M: f64 = 0.025;

/// Marker ids required for the perspective solve.
const REQUIRED_IDS: [u32; 4] = [0, 1, 2, 3];

/// Input accumulator for one calibration pass.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSession {
    plane_points: [Option<Point3<f64>>; 3],
    corners_norm: Option<[Point2<f32>; 4]>,
    corners_world: Option<[Point3<f64>; 4]>,
    detection: Option<DetectionReport>,
    projector_centers: Option<[Point2<f32>; 4]>,
    touch_threshold_m: Option<f64>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_touch_threshold(&mut self, meters: f64) {
        self.touch_threshold_m = Some(meters);
    }

    /// Store a plane point directly (already resolved to sensor space).
    pub fn set_plane_point(&mut self, index: usize, point: Point3<f64>) {
        assert!(index < 3, "plane point index out of range");
        self.plane_points[index] = Some(point);
    }

    /// Resolve a color-image pixel through the depth mapper and store it as
    /// a plane point. A missing depth sample is a recoverable
    /// [`CalibrationError::MappingFailure`]; the slot keeps its previous
    /// value so the host can retry with a newer frame.
    pub fn capture_plane_point(
        &mut self,
        index: usize,
        mapper: &impl DepthProjector,
        pixel: Point2<f32>,
    ) -> Result<(), CalibrationError> {
        assert!(index < 3, "plane point index out of range");
        let point = mapper
            .try_map_pixel(pixel.x, pixel.y)
            .ok_or(CalibrationError::MappingFailure)?;
        self.plane_points[index] = Some(point);
        Ok(())
    }

    /// Store corner snapshots directly.
    pub fn set_corners(&mut self, norm: [Point2<f32>; 4], world: [Point3<f64>; 4]) {
        self.corners_norm = Some(norm);
        self.corners_world = Some(world);
    }

    /// Resolve four source-pixel corners (TL, TR, BR, BL) to normalized and
    /// sensor-space coordinates. All four must map; on failure nothing is
    /// stored.
    pub fn capture_corners(
        &mut self,
        mapper: &impl DepthProjector,
        viewport: &ViewportMapping,
        corner_pixels: [Point2<f32>; 4],
    ) -> Result<(), CalibrationError> {
        let mut world = [Point3::origin(); 4];
        for (slot, px) in world.iter_mut().zip(corner_pixels.iter()) {
            *slot = mapper
                .try_map_pixel(px.x, px.y)
                .ok_or(CalibrationError::MappingFailure)?;
        }
        let norm = corner_pixels.map(|p| viewport.to_normalized(p));
        self.corners_norm = Some(norm);
        self.corners_world = Some(world);
        Ok(())
    }

    /// Attach the latest marker detection report.
    pub fn set_detection(&mut self, report: DetectionReport) {
        self.detection = Some(report);
    }

    /// Read the projector-side marker centers for ids 0..3 off the canvas.
    pub fn capture_projector_centers(
        &mut self,
        canvas: &impl MarkerCanvas,
    ) -> Result<(), CalibrationError> {
        let found = canvas.marker_count().min(4);
        if found < 4 {
            return Err(CalibrationError::InsufficientMarkers { found });
        }
        let mut centers = [Point2::origin(); 4];
        for (i, slot) in centers.iter_mut().enumerate() {
            *slot = canvas.rendered_marker_center(i);
        }
        self.projector_centers = Some(centers);
        Ok(())
    }

    /// Camera-space marker centers for ids 0..3, in id order.
    ///
    /// Counts distinct required ids so the host can show progress; fails
    /// with the count when any are missing.
    fn matched_camera_centers(&self) -> Result<[Point2<f32>; 4], CalibrationError> {
        let report = self
            .detection
            .as_ref()
            .filter(|r| r.success)
            .ok_or(CalibrationError::InsufficientMarkers { found: 0 })?;

        let mut centers = [Point2::origin(); 4];
        let mut found = 0usize;
        for (slot, id) in centers.iter_mut().zip(REQUIRED_IDS.iter()) {
            if let Some(m) = report.marker(*id) {
                *slot = m.center();
                found += 1;
            }
        }
        if found < 4 {
            return Err(CalibrationError::InsufficientMarkers { found });
        }
        Ok(centers)
    }

    /// Validate every input, fit the plane, solve the transform, and return
    /// the complete record.
    ///
    /// Missing plane points or corners surface as
    /// [`CalibrationError::MappingFailure`] (they exist only once depth
    /// mapping has succeeded); missing or failed detection surfaces as
    /// [`CalibrationError::InsufficientMarkers`].
    pub fn finish(&self) -> Result<SurfaceCalibration, CalibrationError> {
        let [p0, p1, p2] = self.plane_points;
        let (p0, p1, p2) = match (p0, p1, p2) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Err(CalibrationError::MappingFailure),
        };
        let plane = Plane::from_three_points(p0, p1, p2)?;

        let (corners_norm, corners_world) = match (self.corners_norm, self.corners_world) {
            (Some(n), Some(w)) => (n, w),
            _ => return Err(CalibrationError::MappingFailure),
        };

        let camera_centers = self.matched_camera_centers()?;
        let projector_centers = self
            .projector_centers
            .ok_or(CalibrationError::InsufficientMarkers { found: 0 })?;

        let homography = Homography::from_quad_correspondence(&camera_centers, &projector_centers)?;

        let state = SurfaceCalibration {
            plane,
            corners_norm,
            corners_world,
            homography,
            touch_threshold_m: self.touch_threshold_m.unwrap_or(DEFAULT_TOUCH_THRESHOLD_M),
        };
        log::info!(
            "calibration complete: plane normal=({:.3},{:.3},{:.3}), threshold={:.3}m",
            state.plane.normal.x,
            state.plane.normal.y,
            state.plane.normal.z,
            state.touch_threshold_m
        );
        Ok(state)
    }
}
