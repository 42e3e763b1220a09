//! # World Map
//!
//! Square grid accumulating terrain observations over the whole run. Each layer holds a counter
//! per cell, the number of ticks in which that cell was seen as the layer's class.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use ndarray::{s, Array3, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::WorldCell;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// World map
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMap {
    /// Number of cells along each side
    size: usize,

    /// Raw map data, dimension order layer, y cell, x cell
    data: Array3<u32>,
}

/// Summary of what the map has seen, for mission progress checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldMapStats {
    /// Number of cells with a non-zero obstacle count
    pub obstacle_cells: usize,

    /// Number of cells with a non-zero rock count
    pub rock_cells: usize,

    /// Number of cells with a non-zero navigable count
    pub navigable_cells: usize,

    /// Number of cells seen navigable at least as often as they were seen as obstacles
    pub navigable_dominant_cells: usize,

    /// Fraction of all cells observed as anything
    pub observed_fraction: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Layers of a [`WorldMap`]
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
pub enum WorldMapLayer {
    Obstacle,
    Rock,
    Navigable,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WorldMapLayer {
    pub const ALL: [WorldMapLayer; 3] = [
        WorldMapLayer::Obstacle,
        WorldMapLayer::Rock,
        WorldMapLayer::Navigable,
    ];

    fn index(self) -> usize {
        match self {
            WorldMapLayer::Obstacle => 0,
            WorldMapLayer::Rock => 1,
            WorldMapLayer::Navigable => 2,
        }
    }
}

impl WorldMap {
    /// Create an empty map with `size` cells along each side.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: Array3::zeros((WorldMapLayer::ALL.len(), size, size)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Count in one cell of one layer, or `None` if the cell is outside the map.
    pub fn get(&self, layer: WorldMapLayer, cell: WorldCell) -> Option<u32> {
        self.data.get((layer.index(), cell.y, cell.x)).copied()
    }

    /// Read-only view of a whole layer, indexed `[y, x]`.
    pub fn layer(&self, layer: WorldMapLayer) -> ArrayView2<u32> {
        self.data.slice(s![layer.index(), .., ..])
    }

    /// Add one observation to each of the given cells.
    ///
    /// A cell listed several times is still only incremented once, so counts are "ticks in which
    /// the cell was seen" rather than "pixels which landed in the cell". Cells outside the map
    /// are ignored. Counters saturate.
    pub fn accumulate(&mut self, layer: WorldMapLayer, cells: &[WorldCell]) {
        let mut cells = cells.to_vec();
        cells.sort_unstable();
        cells.dedup();

        let mut layer_data = self.data.slice_mut(s![layer.index(), .., ..]);

        for cell in cells {
            if let Some(count) = layer_data.get_mut((cell.y, cell.x)) {
                *count = count.saturating_add(1);
            }
        }
    }

    pub fn stats(&self) -> WorldMapStats {
        let obstacle = self.layer(WorldMapLayer::Obstacle);
        let rock = self.layer(WorldMapLayer::Rock);
        let navigable = self.layer(WorldMapLayer::Navigable);

        let mut stats = WorldMapStats::default();
        let mut observed = 0;

        Zip::from(&obstacle)
            .and(&rock)
            .and(&navigable)
            .for_each(|&o, &r, &n| {
                if o > 0 {
                    stats.obstacle_cells += 1;
                }
                if r > 0 {
                    stats.rock_cells += 1;
                }
                if n > 0 {
                    stats.navigable_cells += 1;
                    if n >= o {
                        stats.navigable_dominant_cells += 1;
                    }
                }
                if o > 0 || r > 0 || n > 0 {
                    observed += 1;
                }
            });

        let total = self.size * self.size;
        if total > 0 {
            stats.observed_fraction = observed as f64 / total as f64;
        }

        stats
    }

    /// Render the map as an overlay image, north up.
    ///
    /// Cells seen more often as navigable than as obstacle are blue, other observed obstacle
    /// cells are red, and any cell where a rock was seen has full green.
    pub fn to_image(&self) -> RgbImage {
        let size = self.size as u32;

        RgbImage::from_fn(size, size, |col, row| {
            // Image rows run down, map Y runs up
            let idx = ((size - 1 - row) as usize, col as usize);

            let o = self.data[(WorldMapLayer::Obstacle.index(), idx.0, idx.1)];
            let r = self.data[(WorldMapLayer::Rock.index(), idx.0, idx.1)];
            let n = self.data[(WorldMapLayer::Navigable.index(), idx.0, idx.1)];

            let nav_dominant = n > 0 && n >= o;

            Rgb([
                if o > 0 && !nav_dominant { 255 } else { 0 },
                if r > 0 { 255 } else { 0 },
                if nav_dominant { 255 } else { 0 },
            ])
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cell(x: usize, y: usize) -> WorldCell {
        WorldCell { x, y }
    }

    #[test]
    fn test_accumulate_once_per_tick() {
        let mut map = WorldMap::new(10);

        map.accumulate(
            WorldMapLayer::Navigable,
            &[cell(1, 2), cell(1, 2), cell(1, 2), cell(3, 4)],
        );

        assert_eq!(map.get(WorldMapLayer::Navigable, cell(1, 2)), Some(1));
        assert_eq!(map.get(WorldMapLayer::Navigable, cell(3, 4)), Some(1));
        assert_eq!(map.get(WorldMapLayer::Navigable, cell(2, 1)), Some(0));
        assert_eq!(map.get(WorldMapLayer::Obstacle, cell(1, 2)), Some(0));
        assert_eq!(map.get(WorldMapLayer::Navigable, cell(10, 0)), None);

        map.accumulate(WorldMapLayer::Navigable, &[cell(1, 2)]);
        assert_eq!(map.get(WorldMapLayer::Navigable, cell(1, 2)), Some(2));

        // Layer views are indexed [y, x]
        assert_eq!(map.layer(WorldMapLayer::Navigable)[[2, 1]], 2);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut map = WorldMap::new(4);
        let before = map.clone();

        map.accumulate(WorldMapLayer::Rock, &[cell(4, 0), cell(0, 17)]);

        assert_eq!(map, before);
    }

    #[test]
    fn test_stats_and_image() {
        let mut map = WorldMap::new(4);

        map.accumulate(WorldMapLayer::Navigable, &[cell(0, 0), cell(1, 0)]);
        map.accumulate(WorldMapLayer::Obstacle, &[cell(1, 0), cell(2, 0)]);
        map.accumulate(WorldMapLayer::Obstacle, &[cell(1, 0)]);
        map.accumulate(WorldMapLayer::Rock, &[cell(3, 3)]);

        let stats = map.stats();
        assert_eq!(stats.navigable_cells, 2);
        assert_eq!(stats.obstacle_cells, 2);
        assert_eq!(stats.rock_cells, 1);
        assert_eq!(stats.navigable_dominant_cells, 1);
        assert_eq!(stats.observed_fraction, 4.0 / 16.0);

        let img = map.to_image();
        // Map row y = 0 is the bottom image row
        assert_eq!(*img.get_pixel(0, 3), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(1, 3), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(2, 3), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(3, 0), Rgb([0, 255, 0]));
        assert_eq!(*img.get_pixel(3, 3), Rgb([0, 0, 0]));
    }
}
