//! # Perception module
//!
//! Converts one forward camera frame and the rover's pose into:
//!
//! - classified masks of navigable terrain, obstacles and rock samples,
//! - the world map cells covered by each mask, accumulated into the [`WorldMap`],
//! - polar descriptors of the navigable terrain and visible rocks, used for steering.
//!
//! Procedure, per frame:
//!  - Warp the frame to a top-down view of the ground plane
//!  - Threshold the warped frame into the three masks
//!  - Restrict navigable/obstacle masks to the near band in front of the rover, where the
//!    ground plane assumption holds best
//!  - Convert mask pixels to rover frame points, then to world cells
//!  - If the rover is level, accumulate the cells into the world map
//!  - Convert the rover frame points to polar form

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod classify;
mod coords;
mod params;
mod warp;
mod world_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use classify::{ClassifiedMasks, ColorRange, Mask, NearRegion};
pub use coords::{pix_to_world, rotate_pix, translate_pix, PolarDescriptor, RoverPoints, WorldCell};
pub use params::{CalibParams, PerParams};
pub use warp::{warp_perspective, Homography};
pub use world_map::{WorldMap, WorldMapLayer, WorldMapStats};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;
use log::trace;

use crate::vehicle_state::{Pose, VehicleState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Manages the perception pipeline.
///
/// The homography is computed once on construction, after which [`PerMgr::perceive`] only
/// touches the world map it is given.
#[derive(Debug, Clone)]
pub struct PerMgr {
    pub params: PerParams,

    /// Warped frame to raw image, used to warp by inverse lookup
    inv_homography: Homography,
}

/// Rover frame points, world cells and polar form of one mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskProjection {
    pub rover: RoverPoints,
    pub world: Vec<WorldCell>,
}

/// Everything produced by perception for one frame.
#[derive(Debug, Clone)]
pub struct PerOutput {
    /// The top-down warped frame
    pub warped: RgbImage,

    /// Full frame masks, before the near band restriction
    pub masks: ClassifiedMasks,

    /// Near band navigable terrain
    pub navigable: MaskProjection,

    /// Near band obstacles
    pub obstacle: MaskProjection,

    /// Rocks anywhere in view
    pub rock: MaskProjection,

    /// Polar descriptor of the navigable points
    pub nav: PolarDescriptor,

    /// Polar descriptor of the rock points
    pub rocks: PolarDescriptor,

    /// True if the rover was level and the world map was updated
    pub map_updated: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum PerError {
    #[error("Calibration points are degenerate, no perspective transform exists")]
    DegenerateCalibration,

    #[error("Expected a {expected:?} frame but got {got:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PerMgr {
    pub fn new(params: PerParams) -> Result<Self, PerError> {
        let homography =
            Homography::from_points(&params.calib.src_points_px, &params.calib.dst_points_px())
                .ok_or(PerError::DegenerateCalibration)?;
        let inv_homography = homography
            .inverse()
            .ok_or(PerError::DegenerateCalibration)?;

        Ok(Self {
            params,
            inv_homography,
        })
    }

    /// Run the perception pipeline on one frame.
    ///
    /// `frame` - the raw camera image, which must match the calibrated frame size
    /// `pose` - the pose of the rover when the frame was taken
    /// `world_map` - the map to accumulate into, only modified if the rover is level
    pub fn perceive(
        &self,
        frame: &RgbImage,
        pose: &Pose,
        world_map: &mut WorldMap,
    ) -> Result<PerOutput, PerError> {
        let expected = (
            self.params.calib.frame_width_px,
            self.params.calib.frame_height_px,
        );
        if frame.dimensions() != expected {
            return Err(PerError::FrameSizeMismatch {
                expected,
                got: frame.dimensions(),
            });
        }

        let warped = warp_perspective(frame, &self.inv_homography);

        let masks = ClassifiedMasks::classify(
            &warped,
            &self.params.navigable_thresh,
            &self.params.rock_thresh,
        );

        let region = &self.params.near_region;
        let navigable = self.project(&region.restrict(&masks.navigable), pose, world_map.size());
        let obstacle = self.project(&region.restrict(&masks.obstacle), pose, world_map.size());
        let rock = self.project(&masks.rock, pose, world_map.size());

        let map_updated = is_level(pose, self.params.level_tolerance_deg);
        if map_updated {
            world_map.accumulate(WorldMapLayer::Obstacle, &obstacle.world);
            world_map.accumulate(WorldMapLayer::Rock, &rock.world);
            world_map.accumulate(WorldMapLayer::Navigable, &navigable.world);
        }

        let nav = navigable.rover.to_polar();
        let rocks = rock.rover.to_polar();

        trace!(
            "Perception: {} navigable, {} obstacle, {} rock points, map updated: {}",
            navigable.rover.len(),
            obstacle.rover.len(),
            rock.rover.len(),
            map_updated
        );

        Ok(PerOutput {
            warped,
            masks,
            navigable,
            obstacle,
            rock,
            nav,
            rocks,
            map_updated,
        })
    }

    fn project(&self, mask: &Mask, pose: &Pose, world_size: usize) -> MaskProjection {
        let rover = RoverPoints::from_mask(mask);
        let world = rover.to_world(pose, world_size, self.params.calib.scale_px_per_cell);

        MaskProjection { rover, world }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run perception for the current tick and write its outputs into the vehicle state.
///
/// On error the state's descriptors are cleared, so that the decision controller falls back to
/// its safe behaviour rather than steering on stale data.
pub fn perception_step(
    per: &PerMgr,
    frame: &RgbImage,
    state: &mut VehicleState,
    world_map: &mut WorldMap,
) -> Result<PerOutput, PerError> {
    match per.perceive(frame, &state.pose, world_map) {
        Ok(output) => {
            state.nav = output.nav.clone();
            state.rocks = output.rocks.clone();
            state.vision_image = Some(output.masks.vision_image());
            Ok(output)
        }
        Err(e) => {
            state.nav.clear();
            state.rocks.clear();
            Err(e)
        }
    }
}

/// Returns true if both roll and pitch are within `tolerance_deg` of level.
///
/// Angles are wrapped into `[0, 360)` first, so -1 degree counts as level.
pub fn is_level(pose: &Pose, tolerance_deg: f64) -> bool {
    let near_zero = |angle_deg: f64| {
        let a = util::maths::rem_euclid(angle_deg, 360.0);
        a < tolerance_deg || a > 360.0 - tolerance_deg
    };

    near_zero(pose.roll_deg) && near_zero(pose.pitch_deg)
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;
    use nalgebra::Vector2;

    /// Identity calibration, so warped pixels equal raw pixels.
    fn identity_params() -> PerParams {
        let mut params = PerParams::default();
        params.calib.src_points_px = params.calib.dst_points_px();
        params
    }

    fn pose() -> Pose {
        Pose {
            position: Vector2::new(100.0, 100.0),
            yaw_deg: 30.0,
            ..Default::default()
        }
    }

    /// Ground in the bottom half, rock patch in the top left corner, sky elsewhere.
    fn frame() -> RgbImage {
        RgbImage::from_fn(320, 160, |col, row| {
            if row >= 80 {
                Rgb([200, 190, 180])
            } else if row < 10 && col < 10 {
                Rgb([200, 180, 20])
            } else {
                Rgb([20, 20, 40])
            }
        })
    }

    #[test]
    fn test_is_level() {
        let mut p = Pose::default();
        assert!(is_level(&p, 2.0));

        p.roll_deg = 359.0;
        p.pitch_deg = 1.9;
        assert!(is_level(&p, 2.0));

        p.roll_deg = -1.0;
        assert!(is_level(&p, 2.0));

        p.pitch_deg = 2.0;
        assert!(!is_level(&p, 2.0));

        p.pitch_deg = 0.0;
        p.roll_deg = 357.5;
        assert!(!is_level(&p, 2.0));
    }

    #[test]
    fn test_degenerate_calibration() {
        let mut params = PerParams::default();
        params.calib.src_points_px = [[5.0, 5.0]; 4];

        assert!(matches!(
            PerMgr::new(params),
            Err(PerError::DegenerateCalibration)
        ));
    }

    #[test]
    fn test_frame_size_mismatch() -> Result<(), PerError> {
        let per = PerMgr::new(PerParams::default())?;
        let mut map = WorldMap::new(200);

        let res = per.perceive(&RgbImage::new(100, 100), &pose(), &mut map);

        assert!(matches!(res, Err(PerError::FrameSizeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_perceive() -> Result<(), PerError> {
        let per = PerMgr::new(identity_params())?;
        let mut map = WorldMap::new(200);

        let out = per.perceive(&frame(), &pose(), &mut map)?;

        // Whole near band (80 rows x 107 cols) is ground
        assert_eq!(out.navigable.rover.len(), 80 * 107);
        assert!(out.obstacle.rover.is_empty());

        // Rock is outside the near band but still detected
        assert_eq!(out.rock.rover.len(), 100);

        // Full frame masks are kept for display
        assert_eq!(out.masks.obstacle.iter().filter(|&&o| o).count(), 320 * 80);

        assert_eq!(out.nav.len(), out.navigable.rover.len());
        assert_eq!(out.rocks.len(), 100);
        assert_eq!(out.navigable.world.len(), out.navigable.rover.len());

        // Ground is in front of the rover, so every angle is within +/- 90 degrees
        assert!(out
            .nav
            .angles
            .iter()
            .all(|a| a.abs() <= std::f64::consts::FRAC_PI_2));

        assert!(out.map_updated);
        assert!(map.stats().navigable_cells > 0);
        assert!(map.stats().rock_cells > 0);

        Ok(())
    }

    #[test]
    fn test_map_monotonic_when_level() -> Result<(), PerError> {
        let per = PerMgr::new(identity_params())?;
        let mut map = WorldMap::new(200);

        per.perceive(&frame(), &pose(), &mut map)?;
        let first = map.clone();
        per.perceive(&frame(), &pose(), &mut map)?;

        for layer in WorldMapLayer::ALL.iter() {
            for (after, before) in map.layer(*layer).iter().zip(first.layer(*layer).iter()) {
                assert!(after >= before);
            }
        }
        assert_ne!(map, first);

        Ok(())
    }

    #[test]
    fn test_map_unchanged_when_tilted() -> Result<(), PerError> {
        let per = PerMgr::new(identity_params())?;
        let mut map = WorldMap::new(200);
        per.perceive(&frame(), &pose(), &mut map)?;
        let before = map.clone();

        let mut tilted = pose();
        tilted.pitch_deg = 5.0;
        let out = per.perceive(&frame(), &tilted, &mut map)?;

        assert!(!out.map_updated);
        assert_eq!(map, before);

        // Descriptors are still produced while tilted
        assert!(!out.nav.is_empty());

        Ok(())
    }

    #[test]
    fn test_perception_step() -> Result<(), PerError> {
        let per = PerMgr::new(identity_params())?;
        let mut map = WorldMap::new(200);
        let mut state = VehicleState::new();
        state.pose = pose();

        perception_step(&per, &frame(), &mut state, &mut map)?;
        assert_eq!(state.nav.len(), 80 * 107);
        assert_eq!(state.rocks.len(), 100);
        assert!(state.vision_image.is_some());

        // A bad frame clears the descriptors
        let res = perception_step(&per, &RgbImage::new(10, 10), &mut state, &mut map);
        assert!(res.is_err());
        assert!(state.nav.is_empty());
        assert!(state.rocks.is_empty());

        Ok(())
    }

    #[test]
    fn test_real_calibration_sees_ground() -> Result<(), PerError> {
        let per = PerMgr::new(PerParams::default())?;
        let mut map = WorldMap::new(200);

        let grey = RgbImage::from_pixel(320, 160, Rgb([200, 200, 200]));
        let out = per.perceive(&grey, &pose(), &mut map)?;

        // The calibration square itself is in view, so at least its 11 x 11 pixels are ground
        assert!(out.navigable.rover.len() >= 121);

        // Masks stay exact complements after warping
        for (n, o) in out.masks.navigable.iter().zip(out.masks.obstacle.iter()) {
            assert_ne!(n, o);
        }

        Ok(())
    }
}
