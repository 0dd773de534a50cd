//! Marker bit decoding from image-space quads.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use touch_calib_core::{GrayView, Homography};

use crate::quad::Quad;
use crate::threshold::otsu_threshold;
use crate::CodeMatcher;

/// One identified marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    /// Corners TL-first clockwise, in source-image pixel coordinates.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns between the observed pattern and its dictionary entry.
    pub rotation: u8,
    /// Hamming distance of the accepted match.
    pub hamming: u8,
    /// Combined decode confidence in `[0, 1]`.
    pub score: f32,
    /// Fraction of border cells that read black.
    pub border_score: f32,
    /// Whether the decoder inverted polarity to read the pattern.
    pub inverted: bool,
}

impl DetectedMarker {
    pub fn center(&self) -> Point2<f32> {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for c in &self.corners {
            cx += c.x;
            cy += c.y;
        }
        Point2::new(cx * 0.25, cy * 0.25)
    }

    /// Map corners found on a rescaled variant back into source pixels.
    pub(crate) fn rescale_corners(&mut self, variant_scale: f32) {
        if variant_scale == 1.0 {
            return;
        }
        for c in self.corners.iter_mut() {
            c.x /= variant_scale;
            c.y /= variant_scale;
        }
    }
}

/// Marker side below which bit sampling is hopeless.
const MIN_DECODE_SIDE_PX: f32 = 10.0;

/// Extra sampling density for the threshold estimate, relative to the cell
/// grid.
const THRESHOLD_SUBDIV: usize = 3;

#[derive(Clone, Copy, Debug)]
struct Observation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

/// Decode the marker inside `quad`, if any.
///
/// Samples `(bits + 2)^2` cell centers through the canonical-square to quad
/// homography, thresholds them with Otsu over a denser patch grid, and
/// matches the resulting code (both polarities) against the dictionary.
pub fn decode_quad(
    img: &GrayView<'_>,
    quad: &Quad,
    matcher: &CodeMatcher,
    min_border_score: f32,
) -> Option<DetectedMarker> {
    let bits = matcher.dictionary().marker_size;
    let cells = bits + 2;

    let side = quad.mean_side();
    if side < MIN_DECODE_SIDE_PX {
        return None;
    }

    let canonical = [
        Point2::new(0.0_f32, 0.0),
        Point2::new(side, 0.0),
        Point2::new(side, side),
        Point2::new(0.0, side),
    ];
    let h = Homography::from_quad_correspondence(&canonical, &quad.corners).ok()?;

    let step = side / cells as f32;
    let mut samples = Vec::with_capacity(cells * cells);
    for cy in 0..cells {
        for cx in 0..cells {
            let p = Point2::new((cx as f32 + 0.5) * step, (cy as f32 + 0.5) * step);
            let q = h.apply(p);
            samples.push(sample_mean_3x3(img, q.x, q.y));
        }
    }

    let grid = cells * THRESHOLD_SUBDIV;
    let tstep = side / grid as f32;
    let mut threshold_samples = Vec::with_capacity(grid * grid);
    for ty in 0..grid {
        for tx in 0..grid {
            let p = Point2::new((tx as f32 + 0.5) * tstep, (ty as f32 + 0.5) * tstep);
            let q = h.apply(p);
            threshold_samples.push(sample_mean_3x3(img, q.x, q.y));
        }
    }

    let obs = decode_samples(&samples, &threshold_samples, cells, bits, min_border_score)?;
    let m = matcher.match_code(obs.code)?;

    let bit_count = matcher.dictionary().bit_count().max(1) as f32;
    let ham_pen = 1.0 - (m.hamming as f32 / bit_count);
    let score = (obs.border_score * ham_pen).clamp(0.0, 1.0);

    Some(DetectedMarker {
        id: m.id,
        corners: quad.corners,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        inverted: obs.inverted,
    })
}

fn decode_samples(
    samples: &[u8],
    threshold_samples: &[u8],
    cells: usize,
    bits: usize,
    min_border_score: f32,
) -> Option<Observation> {
    if samples.len() != cells * cells {
        return None;
    }

    let thr = if threshold_samples.is_empty() {
        otsu_threshold(samples)
    } else {
        otsu_threshold(threshold_samples)
    };

    let mut best: Option<Observation> = None;

    for inverted in [false, true] {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code: u64 = 0;

        for cy in 0..cells {
            for cx in 0..cells {
                let m = samples[cy * cells + cx];
                let mut is_black = m < thr;
                if inverted {
                    is_black = !is_black;
                }

                let is_border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
                if is_border {
                    border_total += 1;
                    if is_black {
                        border_ok += 1;
                    }
                } else {
                    let bx = cx - 1;
                    let by = cy - 1;
                    if is_black {
                        code |= 1u64 << (by * bits + bx);
                    }
                }
            }
        }

        let border_score = border_ok as f32 / border_total.max(1) as f32;
        if border_score < min_border_score {
            continue;
        }

        if best
            .as_ref()
            .map(|b| border_score > b.border_score)
            .unwrap_or(true)
        {
            best = Some(Observation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

fn sample_mean_3x3(img: &GrayView<'_>, x: f32, y: f32) -> u8 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.pixel(ix + dx, iy + dy) as u32;
        }
    }
    (sum / 9) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::render::render_marker;

    fn quad_for(marker: &touch_calib_core::GrayBuffer, x0: f32, y0: f32) -> Quad {
        let s = marker.width as f32;
        Quad {
            corners: [
                Point2::new(x0, y0),
                Point2::new(x0 + s, y0),
                Point2::new(x0 + s, y0 + s),
                Point2::new(x0, y0 + s),
            ],
        }
    }

    #[test]
    fn decodes_a_rendered_marker() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        let matcher = CodeMatcher::new(dict, 0);

        let marker = render_marker(&dict, 9, 12).expect("render");
        let quad = quad_for(&marker, 0.0, 0.0);

        let det = decode_quad(&marker.view(), &quad, &matcher, 0.85).expect("decode");
        assert_eq!(det.id, 9);
        assert_eq!(det.hamming, 0);
        assert!(det.border_score > 0.95);
        assert!(det.score > 0.9);
    }

    #[test]
    fn inverted_marker_decodes_via_polarity_trial() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        let matcher = CodeMatcher::new(dict, 0);

        let mut marker = render_marker(&dict, 4, 12).expect("render");
        for v in marker.data.iter_mut() {
            *v = 255 - *v;
        }
        let quad = quad_for(&marker, 0.0, 0.0);

        let det = decode_quad(&marker.view(), &quad, &matcher, 0.85).expect("decode");
        assert_eq!(det.id, 4);
        assert!(det.inverted);
    }

    #[test]
    fn blank_patch_does_not_decode() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        let matcher = CodeMatcher::new(dict, 0);

        let blank = touch_calib_core::GrayBuffer::filled(80, 80, 255);
        let quad = Quad {
            corners: [
                Point2::new(10.0, 10.0),
                Point2::new(70.0, 10.0),
                Point2::new(70.0, 70.0),
                Point2::new(10.0, 70.0),
            ],
        };
        assert!(decode_quad(&blank.view(), &quad, &matcher, 0.85).is_none());
    }

    #[test]
    fn tiny_quad_is_skipped() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        let matcher = CodeMatcher::new(dict, 0);
        let blank = touch_calib_core::GrayBuffer::filled(20, 20, 128);
        let quad = Quad {
            corners: [
                Point2::new(2.0, 2.0),
                Point2::new(8.0, 2.0),
                Point2::new(8.0, 8.0),
                Point2::new(2.0, 8.0),
            ],
        };
        assert!(decode_quad(&blank.view(), &quad, &matcher, 0.5).is_none());
    }
}
