//! Quad candidate extraction.
//!
//! Markers appear as compact dark components (border ring plus payload
//! bits) once the image is adaptively binarized. Candidates are labeled by
//! flood fill, filtered on size/aspect/fill, and reduced to their four
//! extremal corner points.

use std::collections::VecDeque;

use nalgebra::Point2;
use touch_calib_core::GrayView;

use crate::params::DetectorProfile;
use crate::threshold::{integral_image, window_mean};

/// A quadrilateral marker candidate, corners TL-first clockwise in pixel
/// coordinates of the image the candidate was found in.
#[derive(Clone, Copy, Debug)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    pub fn center(&self) -> Point2<f32> {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for c in &self.corners {
            cx += c.x;
            cy += c.y;
        }
        Point2::new(cx * 0.25, cy * 0.25)
    }

    /// Mean side length of the quadrilateral.
    pub fn mean_side(&self) -> f32 {
        let mut total = 0.0;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            total += (b - a).norm();
        }
        total * 0.25
    }
}

/// Upper bound on candidates decoded per binarization pass; components are
/// kept largest-first so real markers survive the cut on noisy frames.
const MAX_CANDIDATES_PER_PASS: usize = 64;

/// Extract quad candidates for every adaptive-threshold radius in the
/// profile.
pub fn find_quads(img: &GrayView<'_>, profile: &DetectorProfile) -> Vec<Quad> {
    let min_side = (profile.min_side_frac * img.width.max(img.height) as f32).max(3.0);

    let integral = integral_image(img);
    let mut out: Vec<Quad> = Vec::new();
    for &radius in &profile.adaptive_radii {
        let mask = adaptive_dark_mask(img, &integral, radius as usize, profile.adaptive_offset);
        for quad in quads_from_mask(&mask, img.width, img.height, min_side) {
            // Passes with different radii mostly rediscover the same
            // components; keep one candidate per location.
            let duplicate = out
                .iter()
                .any(|q| (q.center() - quad.center()).norm() < min_side * 0.5);
            if !duplicate {
                out.push(quad);
            }
        }
    }
    out
}

/// Binary dark mask: 1 where the pixel sits below its local window mean
/// minus the profile offset.
fn adaptive_dark_mask(img: &GrayView<'_>, integral: &[u64], radius: usize, offset: i16) -> Vec<u8> {
    let mut mask = vec![0u8; img.width * img.height];
    for y in 0..img.height {
        for x in 0..img.width {
            let mean = window_mean(integral, img.width, img.height, x, y, radius) as i32;
            let v = img.data[y * img.width + x] as i32;
            if v < mean - offset as i32 {
                mask[y * img.width + x] = 1;
            }
        }
    }
    mask
}

struct Component {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    count: usize,
    // Extremal points: min(x+y), max(x-y), max(x+y), min(x-y).
    corner_pts: [Point2<f32>; 4],
    corner_keys: [i32; 4],
}

impl Component {
    fn new(x: i32, y: i32) -> Self {
        let p = Point2::new(x as f32, y as f32);
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            count: 0,
            corner_pts: [p; 4],
            corner_keys: [x + y, x - y, x + y, x - y],
        }
    }

    fn absorb(&mut self, x: i32, y: i32) {
        self.count += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);

        let sum = x + y;
        let diff = x - y;
        let p = Point2::new(x as f32, y as f32);
        if sum < self.corner_keys[0] {
            self.corner_keys[0] = sum;
            self.corner_pts[0] = p;
        }
        if diff > self.corner_keys[1] {
            self.corner_keys[1] = diff;
            self.corner_pts[1] = p;
        }
        if sum > self.corner_keys[2] {
            self.corner_keys[2] = sum;
            self.corner_pts[2] = p;
        }
        if diff < self.corner_keys[3] {
            self.corner_keys[3] = diff;
            self.corner_pts[3] = p;
        }
    }
}

fn quads_from_mask(mask: &[u8], width: usize, height: usize, min_side: f32) -> Vec<Quad> {
    let mut visited = vec![false; width * height];
    let mut components: Vec<Component> = Vec::new();
    let mut queue = VecDeque::new();

    for y0 in 0..height as i32 {
        for x0 in 0..width as i32 {
            let idx0 = y0 as usize * width + x0 as usize;
            if visited[idx0] || mask[idx0] == 0 {
                continue;
            }

            let mut comp = Component::new(x0, y0);
            visited[idx0] = true;
            queue.push_back((x0, y0));

            while let Some((x, y)) = queue.pop_front() {
                comp.absorb(x, y);
                for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                    if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                        continue;
                    }
                    let nidx = ny as usize * width + nx as usize;
                    if visited[nidx] || mask[nidx] == 0 {
                        continue;
                    }
                    visited[nidx] = true;
                    queue.push_back((nx, ny));
                }
            }

            if accept_component(&comp, min_side) {
                components.push(comp);
            }
        }
    }

    components.sort_by(|a, b| b.count.cmp(&a.count));
    components.truncate(MAX_CANDIDATES_PER_PASS);

    components
        .into_iter()
        .filter_map(|c| quad_from_component(&c))
        .collect()
}

fn accept_component(comp: &Component, min_side: f32) -> bool {
    let bw = (comp.max_x - comp.min_x + 1) as f32;
    let bh = (comp.max_y - comp.min_y + 1) as f32;
    if bw < min_side || bh < min_side {
        return false;
    }

    let ratio = bw / bh;
    if !(0.4..=2.5).contains(&ratio) {
        return false;
    }

    // A marker component is its black ring plus payload; a solid blob or a
    // thin scribble is neither.
    let fill = comp.count as f32 / (bw * bh).max(1.0);
    (0.15..=0.95).contains(&fill)
}

fn quad_from_component(comp: &Component) -> Option<Quad> {
    let mut corners = comp.corner_pts;

    // Degenerate shapes collapse extremal points together.
    for i in 0..4 {
        for j in (i + 1)..4 {
            if (corners[i] - corners[j]).norm() < 2.0 {
                return None;
            }
        }
    }

    order_corners(&mut corners);

    // Extremal points are pixel centers; nudge them outward onto the pixel
    // edge so the canonical sampling grid lines up with the rendered cells.
    let center = Point2::new(
        (corners[0].x + corners[1].x + corners[2].x + corners[3].x) * 0.25,
        (corners[0].y + corners[1].y + corners[2].y + corners[3].y) * 0.25,
    );
    for c in &mut corners {
        let d = *c - center;
        let n = d.norm();
        if n > 1e-3 {
            *c += d * (0.5 / n);
        }
    }

    Some(Quad { corners })
}

/// Sort corners clockwise (image orientation, y down) starting from the one
/// nearest the top-left.
fn order_corners(corners: &mut [Point2<f32>; 4]) {
    let cx = (corners[0].x + corners[1].x + corners[2].x + corners[3].x) * 0.25;
    let cy = (corners[0].y + corners[1].y + corners[2].y + corners[3].y) * 0.25;
    corners.sort_by(|a, b| {
        let aa = (a.y - cy).atan2(a.x - cx);
        let ab = (b.y - cy).atan2(b.x - cx);
        aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
    });

    let first = corners
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (a.x + a.y)
                .partial_cmp(&(b.x + b.y))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    corners.rotate_left(first);
}
