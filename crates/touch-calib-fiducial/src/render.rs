//! Marker rasterization.
//!
//! Used by the tests and the synthetic-calibration example; the projector
//! side of a real installation renders its own marker imagery.

use touch_calib_core::GrayBuffer;

use crate::Dictionary;

/// Border ring thickness in cells.
const BORDER_BITS: usize = 1;

/// Render marker `id` from `dict` at `cell_px` pixels per cell, black ring
/// included. Returns `None` for an unknown id.
pub fn render_marker(dict: &Dictionary, id: usize, cell_px: usize) -> Option<GrayBuffer> {
    let &code = dict.codes.get(id)?;
    let bits = dict.marker_size;
    let cells = bits + 2 * BORDER_BITS;
    let side = cells * cell_px;
    let mut img = GrayBuffer::filled(side, side, 255);

    for cy in 0..cells {
        for cx in 0..cells {
            let is_border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let is_black = if is_border {
                true
            } else {
                let bx = cx - BORDER_BITS;
                let by = cy - BORDER_BITS;
                ((code >> (by * bits + bx)) & 1) == 1
            };
            if !is_black {
                continue;
            }
            for yy in 0..cell_px {
                for xx in 0..cell_px {
                    img.put(cx * cell_px + xx, cy * cell_px + yy, 0);
                }
            }
        }
    }

    Some(img)
}

/// Stamp `marker` onto `canvas` with its top-left corner at `(x, y)`,
/// clipped to the canvas.
pub fn place_marker(canvas: &mut GrayBuffer, marker: &GrayBuffer, x: usize, y: usize) {
    for my in 0..marker.height {
        let cy = y + my;
        if cy >= canvas.height {
            break;
        }
        for mx in 0..marker.width {
            let cx = x + mx;
            if cx >= canvas.width {
                break;
            }
            canvas.put(cx, cy, marker.data[my * marker.width + mx]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    #[test]
    fn rendered_marker_has_black_ring_and_white_margin_cells() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        let img = render_marker(&dict, 0, 10).expect("valid id");
        assert_eq!(img.width, 60);
        assert_eq!(img.height, 60);
        // Ring cell.
        assert_eq!(img.data[5 * 60 + 5], 0);
        // First payload cell follows bit 0 of the code.
        let expect = if dict.codes[0] & 1 == 1 { 0 } else { 255 };
        assert_eq!(img.data[15 * 60 + 15], expect);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
        assert!(render_marker(&dict, 5000, 10).is_none());
    }
}
