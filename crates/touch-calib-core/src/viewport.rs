use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Uniform fit-and-center mapping between a display container and a source
/// image resolution.
///
/// The source image is scaled by `min(cw/sw, ch/sh)` and centered in the
/// container; these conversions invert or apply that transform. All
/// functions are pure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportMapping {
    pub container_w: f32,
    pub container_h: f32,
    pub source_w: u32,
    pub source_h: u32,
}

impl ViewportMapping {
    pub fn new(container_w: f32, container_h: f32, source_w: u32, source_h: u32) -> Self {
        Self {
            container_w,
            container_h,
            source_w,
            source_h,
        }
    }

    /// Scale and centering offset of the letterboxed source inside the
    /// container. Degenerate container or source dimensions fall back to
    /// the identity instead of dividing by zero.
    fn scale_offset(&self) -> (f32, f32, f32) {
        if self.container_w <= 0.0
            || self.container_h <= 0.0
            || self.source_w == 0
            || self.source_h == 0
        {
            return (1.0, 0.0, 0.0);
        }
        let sw = self.source_w as f32;
        let sh = self.source_h as f32;
        let scale = (self.container_w / sw).min(self.container_h / sh);
        let off_x = (self.container_w - sw * scale) * 0.5;
        let off_y = (self.container_h - sh * scale) * 0.5;
        (scale, off_x, off_y)
    }

    /// Map a container-space point onto the source image, clamped to
    /// `[0, source - 1]` on both axes. Never returns out-of-bounds pixels.
    pub fn to_source_pixel(&self, canvas: Point2<f32>) -> Point2<f32> {
        let (scale, off_x, off_y) = self.scale_offset();
        let x = (canvas.x - off_x) / scale;
        let y = (canvas.y - off_y) / scale;
        let max_x = self.source_w.saturating_sub(1) as f32;
        let max_y = self.source_h.saturating_sub(1) as f32;
        Point2::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// Map a source pixel into container space. Not clamped: overlay points
    /// may land outside the container and visibility is the caller's call.
    pub fn to_container_point(&self, source: Point2<f32>) -> Point2<f32> {
        let (scale, off_x, off_y) = self.scale_offset();
        Point2::new(source.x * scale + off_x, source.y * scale + off_y)
    }

    /// Source pixel to `[0,1]^2` normalized coordinates.
    pub fn to_normalized(&self, source: Point2<f32>) -> Point2<f32> {
        if self.source_w == 0 || self.source_h == 0 {
            return source;
        }
        Point2::new(
            source.x / self.source_w as f32,
            source.y / self.source_h as f32,
        )
    }

    /// Normalized `[0,1]^2` coordinates back to source pixels.
    pub fn from_normalized(&self, norm: Point2<f32>) -> Point2<f32> {
        Point2::new(
            norm.x * self.source_w as f32,
            norm.y * self.source_h as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trip_inside_container() {
        let m = ViewportMapping::new(800.0, 600.0, 1920, 1080);
        for p in [
            Point2::new(400.0_f32, 300.0),
            Point2::new(120.0_f32, 200.0),
            Point2::new(700.0_f32, 400.0),
        ] {
            let src = m.to_source_pixel(p);
            let back = m.to_container_point(src);
            assert_relative_eq!(back.x, p.x, epsilon = 1e-3);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn source_pixel_is_clamped_to_resolution() {
        let m = ViewportMapping::new(800.0, 600.0, 640, 480);
        let src = m.to_source_pixel(Point2::new(-50.0, 10_000.0));
        assert_eq!(src, Point2::new(0.0, 479.0));
    }

    #[test]
    fn forward_transform_is_not_clamped() {
        let m = ViewportMapping::new(800.0, 600.0, 640, 480);
        let out = m.to_container_point(Point2::new(-100.0, -100.0));
        assert!(out.x < 0.0 && out.y < 0.0);
    }

    #[test]
    fn degenerate_container_falls_back_to_identity() {
        let m = ViewportMapping::new(0.0, 600.0, 640, 480);
        let p = m.to_source_pixel(Point2::new(12.0, 34.0));
        assert_eq!(p, Point2::new(12.0, 34.0));
        assert_eq!(
            m.to_container_point(Point2::new(12.0, 34.0)),
            Point2::new(12.0, 34.0)
        );
    }

    #[test]
    fn normalized_round_trip() {
        let m = ViewportMapping::new(800.0, 600.0, 640, 480);
        let n = m.to_normalized(Point2::new(320.0, 120.0));
        assert_relative_eq!(n.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(n.y, 0.25, epsilon = 1e-6);
        let back = m.from_normalized(n);
        assert_relative_eq!(back.x, 320.0, epsilon = 1e-3);
        assert_relative_eq!(back.y, 120.0, epsilon = 1e-3);
    }
}
