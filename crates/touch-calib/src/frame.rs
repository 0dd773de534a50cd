//! Collaborator interfaces and frame conversion.
//!
//! The engine never talks to sensor hardware. Hosts implement these traits
//! and pull frames at whatever cadence suits them; the engine has no
//! opinion on scheduling.

use nalgebra::{Point2, Point3};
use touch_calib_core::GrayBuffer;

/// Pixel layout of a color frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgra8,
    Bgr8,
}

impl PixelFormat {
    #[inline]
    fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Bgr8 => 3,
        }
    }
}

/// One color frame borrowed from the sensor.
#[derive(Clone, Copy, Debug)]
pub struct ColorFrame<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
    /// Row stride in bytes; may exceed `width * bytes_per_pixel`.
    pub stride: usize,
    pub format: PixelFormat,
}

/// One depth frame, values in millimeters, zero meaning "no reading".
#[derive(Clone, Copy, Debug)]
pub struct DepthFrame<'a> {
    pub data: &'a [u16],
    pub width: usize,
    pub height: usize,
}

/// Pull interface over the sensor. `None` means "no frame available yet",
/// which is routine during startup.
pub trait FrameSource {
    fn try_color_frame(&mut self) -> Option<ColorFrame<'_>>;
    fn try_depth_frame(&mut self) -> Option<DepthFrame<'_>>;
}

/// Resolves a color-image pixel to a sensor-space 3D point (meters).
///
/// `None` means no valid depth sample exists at that pixel: "cannot
/// calibrate this point yet", never zero.
pub trait DepthProjector {
    fn try_map_pixel(&self, color_x: f32, color_y: f32) -> Option<Point3<f64>>;
}

/// Read-only view of the projector-side marker layout.
///
/// The engine never draws markers; it only needs to know where the host
/// rendered them, indexed by marker id.
pub trait MarkerCanvas {
    fn marker_count(&self) -> usize;
    fn rendered_marker_center(&self, index: usize) -> Point2<f32>;
}

/// Convert a BGRA/BGR frame to grayscale (BT.601 luma), honoring stride.
pub fn gray_from_frame(frame: &ColorFrame<'_>) -> GrayBuffer {
    let bpp = frame.format.bytes_per_pixel();
    let mut out = GrayBuffer::filled(frame.width, frame.height, 0);
    for y in 0..frame.height {
        let row = &frame.data[y * frame.stride..];
        for x in 0..frame.width {
            let b = row[x * bpp] as f32;
            let g = row[x * bpp + 1] as f32;
            let r = row[x * bpp + 2] as f32;
            let luma = 0.114 * b + 0.587 * g + 0.299 * r;
            out.data[y * frame.width + x] = luma.clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(feature = "image")]
pub fn gray_from_luma8(img: &image::GrayImage) -> GrayBuffer {
    GrayBuffer {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

#[cfg(feature = "image")]
pub fn gray_to_luma8(buf: &GrayBuffer) -> Option<image::GrayImage> {
    image::GrayImage::from_raw(buf.width as u32, buf.height as u32, buf.data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_conversion_weights_channels() {
        // One blue, one green, one red pixel.
        let data = [
            255u8, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255,
        ];
        let frame = ColorFrame {
            data: &data,
            width: 3,
            height: 1,
            stride: 12,
            format: PixelFormat::Bgra8,
        };
        let gray = gray_from_frame(&frame);
        assert_eq!(gray.data.len(), 3);
        assert_eq!(gray.data[0], 29); // 0.114 * 255
        assert_eq!(gray.data[1], 149); // 0.587 * 255
        assert_eq!(gray.data[2], 76); // 0.299 * 255
    }

    #[test]
    fn stride_padding_is_skipped() {
        // 2 BGR pixels per row plus 2 bytes of padding.
        let data = [
            10u8, 10, 10, 200, 200, 200, 0xde, 0xad, //
            30, 30, 30, 40, 40, 40, 0xbe, 0xef,
        ];
        let frame = ColorFrame {
            data: &data,
            width: 2,
            height: 2,
            stride: 8,
            format: PixelFormat::Bgr8,
        };
        let gray = gray_from_frame(&frame);
        assert_eq!(gray.data, vec![10, 200, 30, 40]);
    }
}
