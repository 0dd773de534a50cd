//! Thresholding utilities shared by the decoder, the quad extractor, and
//! the preprocessing variants.

use touch_calib_core::GrayView;

/// Summed-area table with a zero row/column prefix: dimensions
/// `(width + 1) x (height + 1)`, entry `(x, y)` holding the sum over the
/// rectangle `[0, x) x [0, y)`.
pub(crate) fn integral_image(src: &GrayView<'_>) -> Vec<u64> {
    let w = src.width;
    let h = src.height;
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += src.data[y * w + x] as u64;
            integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
        }
    }
    integral
}

/// Mean intensity over the window centered at `(x, y)` with the given
/// radius, clipped to the image bounds.
pub(crate) fn window_mean(integral: &[u64], width: usize, height: usize, x: usize, y: usize, radius: usize) -> u32 {
    let stride = width + 1;
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius + 1).min(width);
    let y1 = (y + radius + 1).min(height);
    let area = ((x1 - x0) * (y1 - y0)) as u64;
    let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
        - integral[y0 * stride + x1]
        - integral[y1 * stride + x0];
    (sum / area.max(1)) as u32
}

/// Compute an Otsu threshold from a set of sample intensities.
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total: f64 = samples.len() as f64;
    let mut sum_total = 0f64;
    for (i, &h) in hist.iter().enumerate() {
        sum_total += (i as f64) * (h as f64);
    }

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![20u8; 100];
        samples.extend(std::iter::repeat(220u8).take(100));
        let t = otsu_threshold(&samples);
        assert!(t > 20 && t < 220, "threshold {t} outside the valley");
    }

    #[test]
    fn flat_samples_return_their_value() {
        assert_eq!(otsu_threshold(&[80u8; 32]), 80);
        assert_eq!(otsu_threshold(&[]), 127);
    }
}
