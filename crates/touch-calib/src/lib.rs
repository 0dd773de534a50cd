//! Depth-sensor / projector touch-surface calibration engine.
//!
//! Calibrates a 3D depth/color sensor against a flat physical surface and a
//! projected display: fits the working-surface plane, locates projected
//! fiducial markers in the camera image, solves the camera-to-projector
//! perspective transform, and classifies tracked 3D points as touching the
//! surface.
//!
//! The engine owns no windows, renders nothing, and reads no hardware;
//! hosts feed it frames and snapshots through the traits in [`frame`] and
//! receive a [`SurfaceCalibration`] record plus per-frame touch decisions.

mod error;
mod frame;
mod session;
mod state;

pub use error::CalibrationError;
pub use frame::{
    gray_from_frame, ColorFrame, DepthFrame, DepthProjector, FrameSource, MarkerCanvas,
    PixelFormat,
};
pub use session::{CalibrationSession, DEFAULT_TOUCH_THRESHOLD_M};
pub use state::SurfaceCalibration;

#[cfg(feature = "image")]
pub use frame::{gray_from_luma8, gray_to_luma8};

pub use touch_calib_core::{
    GeometryError, GrayBuffer, GrayView, Homography, Plane, TouchProbe, ViewportMapping,
};
pub use touch_calib_fiducial::{
    detect_markers, spawn_detection, DetectedMarker, DetectionHandle, DetectionReport, SweepConfig,
};

/// Convert a color frame and start a detection sweep on its own thread.
pub fn spawn_frame_detection(frame: &ColorFrame<'_>, cfg: SweepConfig) -> DetectionHandle {
    spawn_detection(gray_from_frame(frame), cfg)
}

/// Pull one color frame from the source and start a detection sweep on it.
///
/// Returns `None` when no frame is available yet; callers retry at their
/// own cadence and must not start a second sweep while one is in flight.
pub fn try_detect_from_source(
    source: &mut impl FrameSource,
    cfg: SweepConfig,
) -> Option<DetectionHandle> {
    let frame = source.try_color_frame()?;
    Some(spawn_frame_detection(&frame, cfg))
}
