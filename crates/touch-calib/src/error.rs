use touch_calib_core::GeometryError;

/// Session-level calibration failures.
///
/// Every variant is a routine outcome of noisy sensor data, returned as a
/// value so the caller can retry or adjust the physical setup. A detection
/// sweep that runs out of time is *not* an error: it surfaces as
/// `DetectionReport { success: false }` before the session is involved.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    /// A pixel had no valid depth sample; retry with another point or a
    /// newer frame.
    #[error("no valid depth sample at the requested pixel")]
    MappingFailure,
    /// The captured surface points are collinear or coincident; re-pick.
    #[error("surface points are collinear or coincident")]
    DegeneratePlane,
    /// Fewer than the four required marker ids were detected.
    #[error("detected {found} of 4 required marker ids")]
    InsufficientMarkers { found: usize },
    /// The camera-to-display transform could not be solved.
    #[error("camera-to-display transform is singular")]
    SingularHomography,
}

impl From<GeometryError> for CalibrationError {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::DegeneratePlane => CalibrationError::DegeneratePlane,
            GeometryError::SingularHomography => CalibrationError::SingularHomography,
        }
    }
}
