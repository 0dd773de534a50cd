//! Preprocessing variants tried by the detection sweep.
//!
//! Each variant turns the source grayscale image into a new image the quad
//! extractor may have better luck with under projector glare, washed-out
//! contrast, or soft focus. The sweep consumes an explicit ordered list of
//! these; ordering favors cheap, high-yield strategies first.

use serde::{Deserialize, Serialize};
use touch_calib_core::{sample_bilinear_u8, GrayBuffer, GrayView};

use crate::threshold::{integral_image, otsu_threshold, window_mean};

/// One preprocessing strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum VariantKind {
    /// Untouched source image.
    Identity,
    /// Percentile-based linear contrast stretch (2nd..98th).
    ContrastStretch,
    /// Power-law intensity remap.
    Gamma { exponent: f32 },
    /// Local mean normalization, lifting detail out of uneven lighting.
    Equalize,
    /// 3x3 box blur.
    BoxBlur,
    /// 3x3 median.
    Median,
    /// Unsharp masking.
    Sharpen,
    /// Global Otsu binarization (threshold shifted by `offset`) followed by
    /// a 3x3 morphological open and close.
    Binarize { offset: i16 },
    /// Intensity inversion, for markers rendered white-on-black.
    Invert,
    /// Bilinear rescale; detections must be mapped back by `1 / factor`.
    Rescale { factor: f32 },
}

impl VariantKind {
    /// The default sweep order.
    pub fn default_order() -> Vec<VariantKind> {
        vec![
            VariantKind::ContrastStretch,
            VariantKind::Equalize,
            VariantKind::Gamma { exponent: 0.5 },
            VariantKind::Gamma { exponent: 2.2 },
            VariantKind::BoxBlur,
            VariantKind::Sharpen,
            VariantKind::Median,
            VariantKind::Binarize { offset: -16 },
            VariantKind::Binarize { offset: 0 },
            VariantKind::Binarize { offset: 16 },
            VariantKind::Invert,
            VariantKind::Rescale { factor: 0.5 },
            VariantKind::Rescale { factor: 2.0 },
        ]
    }

    /// Stable name used in strategy reports and logs.
    pub fn label(&self) -> String {
        match self {
            VariantKind::Identity => "identity".to_string(),
            VariantKind::ContrastStretch => "stretch".to_string(),
            VariantKind::Gamma { exponent } => format!("gamma-{exponent:.1}"),
            VariantKind::Equalize => "equalize".to_string(),
            VariantKind::BoxBlur => "blur".to_string(),
            VariantKind::Median => "median".to_string(),
            VariantKind::Sharpen => "sharpen".to_string(),
            VariantKind::Binarize { offset } => format!("binary{offset:+}"),
            VariantKind::Invert => "invert".to_string(),
            VariantKind::Rescale { factor } => format!("scale-{factor:.1}"),
        }
    }

    /// Pixel scale of the produced image relative to the source.
    pub fn scale(&self) -> f32 {
        match self {
            VariantKind::Rescale { factor } => *factor,
            _ => 1.0,
        }
    }

    pub fn apply(&self, src: &GrayView<'_>) -> GrayBuffer {
        match self {
            VariantKind::Identity => GrayBuffer {
                width: src.width,
                height: src.height,
                data: src.data.to_vec(),
            },
            VariantKind::ContrastStretch => contrast_stretch(src),
            VariantKind::Gamma { exponent } => gamma_remap(src, *exponent),
            VariantKind::Equalize => local_equalize(src),
            VariantKind::BoxBlur => box_blur(src),
            VariantKind::Median => median3(src),
            VariantKind::Sharpen => sharpen(src),
            VariantKind::Binarize { offset } => binarize(src, *offset),
            VariantKind::Invert => invert(src),
            VariantKind::Rescale { factor } => rescale(src, *factor),
        }
    }
}

fn apply_lut(src: &GrayView<'_>, lut: &[u8; 256]) -> GrayBuffer {
    GrayBuffer {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| lut[v as usize]).collect(),
    }
}

fn contrast_stretch(src: &GrayView<'_>) -> GrayBuffer {
    let mut hist = [0u32; 256];
    for &v in src.data {
        hist[v as usize] += 1;
    }
    let total = src.data.len() as u32;
    let clip = total / 50; // 2nd / 98th percentile

    let mut lo = 0usize;
    let mut acc = 0u32;
    for (i, &h) in hist.iter().enumerate() {
        acc += h;
        if acc > clip {
            lo = i;
            break;
        }
    }
    let mut hi = 255usize;
    acc = 0;
    for (i, &h) in hist.iter().enumerate().rev() {
        acc += h;
        if acc > clip {
            hi = i;
            break;
        }
    }
    if hi <= lo {
        return VariantKind::Identity.apply(src);
    }

    let span = (hi - lo) as f32;
    let mut lut = [0u8; 256];
    for (i, e) in lut.iter_mut().enumerate() {
        let t = (i as f32 - lo as f32) / span;
        *e = (t * 255.0).clamp(0.0, 255.0) as u8;
    }
    apply_lut(src, &lut)
}

fn gamma_remap(src: &GrayView<'_>, exponent: f32) -> GrayBuffer {
    let mut lut = [0u8; 256];
    for (i, e) in lut.iter_mut().enumerate() {
        *e = ((i as f32 / 255.0).powf(exponent) * 255.0).clamp(0.0, 255.0) as u8;
    }
    apply_lut(src, &lut)
}

/// Recenter every pixel on its local neighborhood mean and amplify the
/// residual. Window radius and gain are fixed; the point is to beat slow
/// illumination gradients, not to be tunable.
fn local_equalize(src: &GrayView<'_>) -> GrayBuffer {
    const RADIUS: usize = 24;
    const GAIN: f32 = 1.8;

    let integral = integral_image(src);
    let mut out = GrayBuffer::filled(src.width, src.height, 0);
    for y in 0..src.height {
        for x in 0..src.width {
            let mean = window_mean(&integral, src.width, src.height, x, y, RADIUS) as f32;
            let v = src.data[y * src.width + x] as f32;
            out.data[y * src.width + x] = (128.0 + (v - mean) * GAIN).clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn box_blur(src: &GrayView<'_>) -> GrayBuffer {
    let mut out = GrayBuffer::filled(src.width, src.height, 0);
    for y in 0..src.height {
        for x in 0..src.width {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let xx = x as i32 + dx;
                    let yy = y as i32 + dy;
                    if xx < 0 || yy < 0 || xx >= src.width as i32 || yy >= src.height as i32 {
                        continue;
                    }
                    sum += src.data[yy as usize * src.width + xx as usize] as u32;
                    count += 1;
                }
            }
            out.data[y * src.width + x] = (sum / count.max(1)) as u8;
        }
    }
    out
}

fn median3(src: &GrayView<'_>) -> GrayBuffer {
    let mut out = GrayBuffer::filled(src.width, src.height, 0);
    let mut window = [0u8; 9];
    for y in 0..src.height {
        for x in 0..src.width {
            let mut n = 0usize;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let xx = x as i32 + dx;
                    let yy = y as i32 + dy;
                    if xx < 0 || yy < 0 || xx >= src.width as i32 || yy >= src.height as i32 {
                        continue;
                    }
                    window[n] = src.data[yy as usize * src.width + xx as usize];
                    n += 1;
                }
            }
            window[..n].sort_unstable();
            out.data[y * src.width + x] = window[n / 2];
        }
    }
    out
}

fn sharpen(src: &GrayView<'_>) -> GrayBuffer {
    let blurred = box_blur(src);
    let mut out = blurred;
    for (o, &v) in out.data.iter_mut().zip(src.data.iter()) {
        let sharpened = 2.0 * v as f32 - *o as f32;
        *o = sharpened.clamp(0.0, 255.0) as u8;
    }
    out
}

fn binarize(src: &GrayView<'_>, offset: i16) -> GrayBuffer {
    let t = (otsu_threshold(src.data) as i16 + offset).clamp(1, 255) as u8;
    let mut out = GrayBuffer {
        width: src.width,
        height: src.height,
        data: src
            .data
            .iter()
            .map(|&v| if v < t { 0u8 } else { 255u8 })
            .collect(),
    };
    // Morphological open (erode, dilate) then close (dilate, erode).
    out = morph3(&out.view(), true);
    out = morph3(&out.view(), false);
    out = morph3(&out.view(), false);
    out = morph3(&out.view(), true);
    out
}

/// 3x3 erosion (`minimum = true`) or dilation over a binary image.
fn morph3(src: &GrayView<'_>, minimum: bool) -> GrayBuffer {
    let mut out = GrayBuffer::filled(src.width, src.height, 0);
    for y in 0..src.height {
        for x in 0..src.width {
            let mut acc = if minimum { 255u8 } else { 0u8 };
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let xx = (x as i32 + dx).clamp(0, src.width as i32 - 1);
                    let yy = (y as i32 + dy).clamp(0, src.height as i32 - 1);
                    let v = src.data[yy as usize * src.width + xx as usize];
                    acc = if minimum { acc.min(v) } else { acc.max(v) };
                }
            }
            out.data[y * src.width + x] = acc;
        }
    }
    out
}

fn invert(src: &GrayView<'_>) -> GrayBuffer {
    GrayBuffer {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| 255 - v).collect(),
    }
}

fn rescale(src: &GrayView<'_>, factor: f32) -> GrayBuffer {
    let out_w = ((src.width as f32 * factor).round() as usize).max(1);
    let out_h = ((src.height as f32 * factor).round() as usize).max(1);
    let mut out = GrayBuffer::filled(out_w, out_h, 0);
    for y in 0..out_h {
        for x in 0..out_w {
            let sx = (x as f32 + 0.5) / factor - 0.5;
            let sy = (y as f32 + 0.5) / factor - 0.5;
            out.data[y * out_w + x] = sample_bilinear_u8(src, sx, sy);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(w: usize, h: usize) -> GrayBuffer {
        let mut img = GrayBuffer::filled(w, h, 0);
        for y in 0..h {
            for x in 0..w {
                img.data[y * w + x] = ((x * 255) / w.max(1)) as u8;
            }
        }
        img
    }

    #[test]
    fn non_scaling_variants_preserve_dimensions() {
        let img = gradient_image(40, 30);
        for kind in VariantKind::default_order() {
            if kind.scale() != 1.0 {
                continue;
            }
            let out = kind.apply(&img.view());
            assert_eq!((out.width, out.height), (40, 30), "{}", kind.label());
        }
    }

    #[test]
    fn rescale_reports_its_scale() {
        let img = gradient_image(40, 30);
        let kind = VariantKind::Rescale { factor: 0.5 };
        let out = kind.apply(&img.view());
        assert_eq!((out.width, out.height), (20, 15));
        assert_eq!(kind.scale(), 0.5);
    }

    #[test]
    fn invert_is_an_involution() {
        let img = gradient_image(16, 16);
        let once = VariantKind::Invert.apply(&img.view());
        let twice = VariantKind::Invert.apply(&once.view());
        assert_eq!(twice.data, img.data);
    }

    #[test]
    fn binarize_splits_a_bimodal_image() {
        let mut img = GrayBuffer::filled(32, 32, 230);
        for y in 8..24 {
            for x in 8..24 {
                img.put(x, y, 25);
            }
        }
        let out = VariantKind::Binarize { offset: 0 }.apply(&img.view());
        assert_eq!(out.data[16 * 32 + 16], 0);
        assert_eq!(out.data[2 * 32 + 2], 255);
    }

    #[test]
    fn labels_are_unique_within_default_order() {
        let labels: Vec<String> = VariantKind::default_order()
            .iter()
            .map(|k| k.label())
            .collect();
        let mut dedup = labels.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), labels.len());
    }
}
