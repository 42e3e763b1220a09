//! # Coordinate conversions
//!
//! Frames used by perception:
//!
//! - Image: (row, col) of the warped frame, origin top-left.
//! - Rover: origin at the bottom-centre of the warped frame, X forward, Y left, in warped pixels.
//! - World: integer cells of the world map, X and Y along the map axes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::Mask;
use crate::vehicle_state::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Set pixels of a mask in the rover frame, as parallel coordinate arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoverPoints {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Distance and angle of each point of a [`RoverPoints`] set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarDescriptor {
    /// Units: warped pixels
    pub dists: Vec<f64>,

    /// Angle from the rover's forward axis, positive to the left.
    ///
    /// Units: radians
    pub angles: Vec<f64>,
}

/// A cell of the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorldCell {
    pub x: usize,
    pub y: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoverPoints {
    /// Convert the set pixels of a mask into rover frame points, in row-major order.
    ///
    /// `x = -(row - height)` and `y = -(col - width / 2)`, which puts the rover at the
    /// bottom-centre of the image looking up it.
    pub fn from_mask(mask: &Mask) -> Self {
        let (rows, cols) = mask.dim();
        let half_width = cols as f64 / 2.0;

        let mut points = Self::default();

        for ((row, col), _) in mask.indexed_iter().filter(|(_, set)| **set) {
            points.x.push(rows as f64 - row as f64);
            points.y.push(half_width - col as f64);
        }

        points
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn to_polar(&self) -> PolarDescriptor {
        let (dists, angles) = self
            .x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (x.hypot(y), y.atan2(x)))
            .unzip();

        PolarDescriptor { dists, angles }
    }

    /// Project every point into the world map.
    ///
    /// Points are rotated by the rover's yaw, divided by `scale_px_per_cell`, translated by the
    /// rover's position, truncated towards zero and clamped into a map of `world_size` cells.
    pub fn to_world(
        &self,
        pose: &Pose,
        world_size: usize,
        scale_px_per_cell: f64,
    ) -> Vec<WorldCell> {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| pix_to_world(x, y, pose, world_size, scale_px_per_cell))
            .collect()
    }
}

impl PolarDescriptor {
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn clear(&mut self) {
        self.dists.clear();
        self.angles.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Rotate a rover frame point by the yaw angle (degrees).
pub fn rotate_pix(x: f64, y: f64, yaw_deg: f64) -> (f64, f64) {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();

    (x * cos - y * sin, x * sin + y * cos)
}

/// Scale a rotated point into map cells and translate it by the rover position.
pub fn translate_pix(x_rot: f64, y_rot: f64, x_pos: f64, y_pos: f64, scale: f64) -> (f64, f64) {
    (x_rot / scale + x_pos, y_rot / scale + y_pos)
}

/// Convert a single rover frame point into a world map cell.
pub fn pix_to_world(x: f64, y: f64, pose: &Pose, world_size: usize, scale: f64) -> WorldCell {
    let (x_rot, y_rot) = rotate_pix(x, y, pose.yaw_deg);
    let (x_world, y_world) =
        translate_pix(x_rot, y_rot, pose.position.x, pose.position.y, scale);

    let max = world_size.saturating_sub(1) as i64;

    // `as` truncates towards zero (and saturates), the clamp then keeps the cell in the map
    WorldCell {
        x: (x_world as i64).max(0).min(max) as usize,
        y: (y_world as i64).max(0).min(max) as usize,
    }
}
