//! # Ground plane rectification
//!
//! Perspective (projective) transform between the raw camera image and a top-down view of the
//! ground plane. The transform is a homography estimated from four point correspondences, after
//! which pixel distance in the warped frame is linear in ground distance.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Homogeneous coordinates with a smaller scale than this are treated as points at infinity.
const MIN_HOMOGENEOUS_SCALE: f64 = 1e-12;

/// Maximum error allowed when checking an estimated homography against its own correspondences.
///
/// Units: pixels
const MAX_REPROJECTION_ERROR_PX: f64 = 1e-3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 3x3 projective transform acting on (column, row) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Homography {
    /// Calculate the homography mapping each `src` point onto the matching `dst` point.
    ///
    /// With `h33` fixed at 1 each correspondence gives two linear equations in the remaining
    /// eight coefficients, so four points give a square 8x8 system. Returns `None` if the points
    /// are degenerate (e.g. three or more collinear), in which case the system is singular.
    pub fn from_points(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Self> {
        let mut a = DMatrix::<f64>::zeros(8, 8);
        let mut b = DVector::<f64>::zeros(8);

        for i in 0..4 {
            let [x, y] = src[i];
            let [u, v] = dst[i];

            let r = 2 * i;
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -x * u;
            a[(r, 7)] = -y * u;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -x * v;
            a[(r + 1, 7)] = -y * v;
            b[r + 1] = v;
        }

        let h = a.lu().solve(&b)?;

        if h.iter().any(|c| !c.is_finite()) {
            return None;
        }

        let homography = Self(Matrix3::new(
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
        ));

        // Near-singular systems can still produce a finite solution, so check it actually
        // reproduces the correspondences
        for i in 0..4 {
            let [u, v] = homography.apply(src[i])?;
            if (u - dst[i][0]).abs() > MAX_REPROJECTION_ERROR_PX
                || (v - dst[i][1]).abs() > MAX_REPROJECTION_ERROR_PX
            {
                return None;
            }
        }

        homography.inverse().map(|_| homography)
    }

    /// The inverse transform, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Transform a single (column, row) point, or `None` if it maps to infinity.
    pub fn apply(&self, point: [f64; 2]) -> Option<[f64; 2]> {
        let p = self.0 * Vector3::new(point[0], point[1], 1.0);

        if p.z.abs() < MIN_HOMOGENEOUS_SCALE {
            return None;
        }

        Some([p.x / p.z, p.y / p.z])
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Warp an image into a new image of the same size.
///
/// `dst_to_src` must be the *inverse* of the forward transform, each output pixel is looked up
/// in the source with bilinear interpolation. Output pixels which look up outside the source
/// image are black.
pub fn warp_perspective(src: &RgbImage, dst_to_src: &Homography) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |col, row| {
        match dst_to_src.apply([col as f64, row as f64]) {
            Some([x, y]) => sample_bilinear(src, x, y),
            None => Rgb([0, 0, 0]),
        }
    })
}

/// Sample the image at a fractional position. Neighbours outside the image contribute black.
fn sample_bilinear(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = (img.width() as f64, img.height() as f64);

    // Also rejects NaN
    if !(x > -1.0 && y > -1.0 && x < width && y < height) {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let neighbours = [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ];

    let mut acc = [0f64; 3];

    for &(dx, dy, weight) in neighbours.iter() {
        let px = x0 as i64 + dx;
        let py = y0 as i64 + dy;

        if weight == 0.0 || px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            continue;
        }

        let pixel = img.get_pixel(px as u32, py as u32);
        for c in 0..3 {
            acc[c] += weight * pixel[c] as f64;
        }
    }

    Rgb([
        acc[0].round().min(255.0) as u8,
        acc[1].round().min(255.0) as u8,
        acc[2].round().min(255.0) as u8,
    ])
}
