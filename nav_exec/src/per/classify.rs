//! # Colour classification
//!
//! Thresholding of the warped frame into navigable, obstacle and rock masks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::ops::Range;

use image::{Rgb, RgbImage};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A binary classification of an image, indexed `[row, col]`.
pub type Mask = Array2<bool>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A per-channel RGB range, lower bound inclusive and upper bound exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// Rectangular band of an image given as fractions of its size.
///
/// Row and column bounds are found by truncating `fraction * size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearRegion {
    /// First row of the band, the band always extends to the bottom row
    pub rows_start_frac: f64,

    /// First column of the band
    pub cols_start_frac: f64,

    /// Column after the last column of the band
    pub cols_end_frac: f64,
}

/// The three masks produced from one warped frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMasks {
    pub navigable: Mask,

    /// Exact complement of `navigable`
    pub obstacle: Mask,

    pub rock: Mask,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ColorRange {
    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        (0..3).all(|c| pixel[c] >= self.lower[c] && pixel[c] < self.upper[c])
    }

    /// Classify every pixel of the image.
    pub fn threshold(&self, img: &RgbImage) -> Mask {
        Array2::from_shape_fn(
            (img.height() as usize, img.width() as usize),
            |(row, col)| self.contains(img.get_pixel(col as u32, row as u32)),
        )
    }
}

impl NearRegion {
    /// Row and column ranges of the band in an image of the given shape.
    pub fn bounds(&self, rows: usize, cols: usize) -> (Range<usize>, Range<usize>) {
        let frac = |f: f64, n: usize| ((f * n as f64) as usize).min(n);

        let row_start = frac(self.rows_start_frac, rows);
        let col_start = frac(self.cols_start_frac, cols);
        let col_end = frac(self.cols_end_frac, cols).max(col_start);

        (row_start..rows, col_start..col_end)
    }

    /// Copy of the mask with everything outside the band cleared.
    pub fn restrict(&self, mask: &Mask) -> Mask {
        let (rows, cols) = mask.dim();
        let (row_range, col_range) = self.bounds(rows, cols);

        let mut near = Mask::from_elem((rows, cols), false);
        near.slice_mut(s![row_range.clone(), col_range.clone()])
            .assign(&mask.slice(s![row_range, col_range]));

        near
    }
}

impl Default for NearRegion {
    /// Bottom half of the rows, middle third of the columns.
    fn default() -> Self {
        Self {
            rows_start_frac: 0.5,
            cols_start_frac: 1.0 / 3.0,
            cols_end_frac: 2.0 / 3.0,
        }
    }
}

impl ClassifiedMasks {
    pub fn classify(warped: &RgbImage, navigable: &ColorRange, rock: &ColorRange) -> Self {
        let navigable = navigable.threshold(warped);
        let obstacle = navigable.mapv(|n| !n);
        let rock = rock.threshold(warped);

        Self {
            navigable,
            obstacle,
            rock,
        }
    }

    /// Render the masks for display: red is obstacle, green is rock and blue is navigable.
    pub fn vision_image(&self) -> RgbImage {
        let (rows, cols) = self.navigable.dim();

        RgbImage::from_fn(cols as u32, rows as u32, |col, row| {
            let idx = (row as usize, col as usize);
            let on = |b: bool| if b { 255 } else { 0 };

            Rgb([
                on(self.obstacle[idx]),
                on(self.rock[idx]),
                on(self.navigable[idx]),
            ])
        })
    }
}
