//! Geometry core for projected touch-surface calibration.
//!
//! This crate is intentionally small and purely geometric: plane fitting,
//! the 4-point perspective solve, viewport coordinate mapping, and the
//! touch predicate. It does *not* depend on any detector or frame source.

mod error;
mod homography;
mod image;
mod logger;
mod plane;
mod touch;
mod viewport;

pub use error::GeometryError;
pub use homography::Homography;
pub use image::{sample_bilinear, sample_bilinear_u8, GrayBuffer, GrayView};
pub use plane::{normalize_or_up, Plane};
pub use touch::TouchProbe;
pub use viewport::ViewportMapping;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
