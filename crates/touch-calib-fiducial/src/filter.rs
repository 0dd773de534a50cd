//! Geometry acceptance filtering for raw detections.

use serde::{Deserialize, Serialize};

use crate::DetectedMarker;

/// Acceptance thresholds applied to every raw detection, in source-image
/// pixel space.
///
/// The bounds are empirical: the area window rejects noise specks and
/// whole-image false positives, the side floor rejects quads too small to
/// have carried readable bits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryFilter {
    /// Minimum bounding-box area as a fraction of the image area.
    pub min_area_frac: f64,
    /// Maximum bounding-box area as a fraction of the image area.
    pub max_area_frac: f64,
    /// Minimum mean quadrilateral side, in pixels.
    pub min_side_px: f32,
}

impl Default for GeometryFilter {
    fn default() -> Self {
        Self {
            min_area_frac: 0.00002,
            max_area_frac: 0.25,
            min_side_px: 3.0,
        }
    }
}

impl GeometryFilter {
    /// `true` when the marker survives every geometric check against an
    /// image of the given dimensions.
    pub fn accepts(&self, marker: &DetectedMarker, width: usize, height: usize) -> bool {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for c in &marker.corners {
            if !c.x.is_finite() || !c.y.is_finite() {
                return false;
            }
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }

        if min_x < 0.0 || min_y < 0.0 || max_x > width as f32 || max_y > height as f32 {
            return false;
        }

        let area = ((max_x - min_x) as f64) * ((max_y - min_y) as f64);
        let image_area = (width as f64) * (height as f64);
        if image_area <= 0.0 {
            return false;
        }
        let frac = area / image_area;
        if frac < self.min_area_frac || frac > self.max_area_frac {
            return false;
        }

        let mut side_total = 0.0f32;
        for i in 0..4 {
            let a = marker.corners[i];
            let b = marker.corners[(i + 1) % 4];
            side_total += (b - a).norm();
        }
        side_total * 0.25 >= self.min_side_px
    }
}

/// Apply the geometry filter, dedup by id keeping the best score, and sort
/// ascending by id for deterministic downstream consumption.
pub fn accept_markers(
    mut markers: Vec<DetectedMarker>,
    filter: &GeometryFilter,
    width: usize,
    height: usize,
) -> Vec<DetectedMarker> {
    markers.retain(|m| filter.accepts(m, width, height));

    markers.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut out: Vec<DetectedMarker> = Vec::with_capacity(markers.len());
    for m in markers {
        if out.iter().all(|kept| kept.id != m.id) {
            out.push(m);
        }
    }

    out.sort_by_key(|m| m.id);
    out
}
