//! # Perception Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{ColorRange, NearRegion};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the perception pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerParams {
    /// Ground plane calibration of the camera
    pub calib: CalibParams,

    /// Colour range of navigable terrain (light ground)
    pub navigable_thresh: ColorRange,

    /// Colour range of rock samples (yellow)
    pub rock_thresh: ColorRange,

    /// Part of the warped frame in which terrain classification is trusted
    pub near_region: NearRegion,

    /// Number of cells along each side of the square world map
    pub world_size_cells: usize,

    /// Maximum roll and pitch away from level for which the world map is updated.
    ///
    /// Units: degrees
    pub level_tolerance_deg: f64,
}

/// Fixed calibration of the ground plane perspective transform.
///
/// The destination quadrilateral is a square on the ground directly in front of the rover. It is
/// centred horizontally in the warped frame with its lower edge `bottom_offset_px` above the
/// bottom row, which accounts for the ground hidden under the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibParams {
    /// Width of the camera frame.
    ///
    /// Units: pixels
    pub frame_width_px: u32,

    /// Height of the camera frame.
    ///
    /// Units: pixels
    pub frame_height_px: u32,

    /// Corners of the calibration square in the raw camera image, ordered bottom-left,
    /// bottom-right, top-right, top-left.
    ///
    /// Units: pixels, (column, row)
    pub src_points_px: [[f64; 2]; 4],

    /// Half the side length of the calibration square in the warped frame.
    ///
    /// Units: pixels
    pub dst_half_size_px: f64,

    /// Units: pixels
    pub bottom_offset_px: f64,

    /// Number of warped frame pixels per world map cell.
    pub scale_px_per_cell: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CalibParams {
    /// Corners of the calibration square in the warped frame, in the same order as
    /// `src_points_px`.
    pub fn dst_points_px(&self) -> [[f64; 2]; 4] {
        let mid_x = self.frame_width_px as f64 / 2.0;
        let bottom_y = self.frame_height_px as f64 - self.bottom_offset_px;
        let top_y = bottom_y - 2.0 * self.dst_half_size_px;

        [
            [mid_x - self.dst_half_size_px, bottom_y],
            [mid_x + self.dst_half_size_px, bottom_y],
            [mid_x + self.dst_half_size_px, top_y],
            [mid_x - self.dst_half_size_px, top_y],
        ]
    }
}

impl Default for CalibParams {
    /// Calibration of the simulator's forward camera, a 1 m grid square viewed from rest.
    fn default() -> Self {
        Self {
            frame_width_px: 320,
            frame_height_px: 160,
            src_points_px: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_half_size_px: 5.0,
            bottom_offset_px: 6.0,
            scale_px_per_cell: 10.0,
        }
    }
}

impl Default for PerParams {
    fn default() -> Self {
        Self {
            calib: CalibParams::default(),
            navigable_thresh: ColorRange {
                lower: [160, 160, 160],
                upper: [255, 255, 255],
            },
            rock_thresh: ColorRange {
                lower: [110, 110, 0],
                upper: [255, 255, 50],
            },
            near_region: NearRegion::default(),
            world_size_cells: 200,
            level_tolerance_deg: 2.0,
        }
    }
}
