use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// 3x3 projective transform between two image planes.
///
/// Construction goes through [`Homography::from_quad_correspondence`], which
/// rejects degenerate input and singular results, so a stored homography is
/// always invertible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Solve the transform mapping `src[k]` onto `dst[k]` for exactly four
    /// correspondences.
    ///
    /// Corner order must be consistent between `src` and `dst`. Fails with
    /// [`GeometryError::SingularHomography`] when either point set contains
    /// a collinear triple or the solved matrix is not invertible.
    pub fn from_quad_correspondence(
        src: &[Point2<f32>; 4],
        dst: &[Point2<f32>; 4],
    ) -> Result<Self, GeometryError> {
        let (src_n, t_src) = normalize_points4(src);
        let (dst_n, t_dst) = normalize_points4(dst);

        // After Hartley normalization the points live at unit scale, so an
        // absolute area threshold is meaningful.
        if has_collinear_triple(&src_n) || has_collinear_triple(&dst_n) {
            return Err(GeometryError::SingularHomography);
        }

        // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1.
        // For each correspondence (x,y)->(u,v):
        // h11 x + h12 y + h13 - u h31 x - u h32 y = u
        // h21 x + h22 y + h23 - v h31 x - v h32 y = v
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for k in 0..4 {
            let x = src_n[k].x;
            let y = src_n[k].y;
            let u = dst_n[k].x;
            let v = dst_n[k].y;

            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            let r1 = 2 * k + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let x = a
            .lu()
            .solve(&b)
            .ok_or(GeometryError::SingularHomography)?;

        let hn = Matrix3::<f64>::new(
            x[0], x[1], x[2], //
            x[3], x[4], x[5], //
            x[6], x[7], 1.0,
        );

        let h = denormalize(hn, t_src, t_dst).ok_or(GeometryError::SingularHomography)?;
        if h.try_inverse().is_none() {
            return Err(GeometryError::SingularHomography);
        }

        Ok(Self::new(h))
    }
}

fn hartley_transform(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Hartley normalization: translate to centroid, scale so the mean distance
/// from it equals `sqrt(2)`.
fn normalize_points4(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let n = 4.0_f64;
    let mut cx = 0.0_f64;
    let mut cy = 0.0_f64;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0_f64;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_transform(cx, cy, mean_dist);

    let mut out = [Point2::new(0.0_f64, 0.0_f64); 4];
    for (i, p) in pts.iter().enumerate() {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        out[i] = Point2::new(v[0], v[1]);
    }

    (out, t)
}

fn has_collinear_triple(pts: &[Point2<f64>; 4]) -> bool {
    const MIN_TRIPLE_AREA: f64 = 1e-9;
    for skip in 0..4 {
        let t: Vec<&Point2<f64>> = pts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, p)| p)
            .collect();
        let area = (t[1].x - t[0].x) * (t[2].y - t[0].y) - (t[2].x - t[0].x) * (t[1].y - t[0].y);
        if area.abs() < MIN_TRIPLE_AREA {
            return true;
        }
    }
    false
}

fn denormalize(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    let h = t_dst_inv * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0_f32, -20.0),
            Point2::new(320.0_f32, 200.0),
        ] {
            let q = h.apply(p);
            let back = inv.apply(q);
            assert_close(back, p, 1e-3);
        }
    }

    #[test]
    fn quad_correspondence_recovers_transform() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));

        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0_f32, 0.0),
            Point2::new(180.0_f32, 130.0),
            Point2::new(0.0_f32, 130.0),
        ];
        let dst = src.map(|p| ground_truth.apply(p));

        let recovered = Homography::from_quad_correspondence(&src, &dst).expect("recoverable");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn solved_transform_maps_each_corner_exactly() {
        let src = [
            Point2::new(10.0_f32, 12.0),
            Point2::new(310.0_f32, 8.0),
            Point2::new(300.0_f32, 215.0),
            Point2::new(15.0_f32, 225.0),
        ];
        let dst = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1920.0_f32, 0.0),
            Point2::new(1920.0_f32, 1080.0),
            Point2::new(0.0_f32, 1080.0),
        ];

        let h = Homography::from_quad_correspondence(&src, &dst).expect("solvable");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(*s), *d, 1e-2);
        }
    }

    #[test]
    fn collinear_source_points_are_rejected() {
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1.0_f32, 0.0),
            Point2::new(2.0_f32, 0.0),
            Point2::new(0.0_f32, 1.0),
        ];
        let dst = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0_f32, 0.0),
            Point2::new(100.0_f32, 100.0),
            Point2::new(0.0_f32, 100.0),
        ];
        assert_eq!(
            Homography::from_quad_correspondence(&src, &dst),
            Err(GeometryError::SingularHomography)
        );
    }

    #[test]
    fn coincident_destination_points_are_rejected() {
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0_f32, 0.0),
            Point2::new(100.0_f32, 100.0),
            Point2::new(0.0_f32, 100.0),
        ];
        let dst = [
            Point2::new(5.0_f32, 5.0),
            Point2::new(5.0_f32, 5.0),
            Point2::new(100.0_f32, 100.0),
            Point2::new(0.0_f32, 100.0),
        ];
        assert!(Homography::from_quad_correspondence(&src, &dst).is_err());
    }

    #[test]
    fn array_round_trip_preserves_entries() {
        let h = Homography::from_array([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(
            h.to_array(),
            [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]
        );
    }
}
