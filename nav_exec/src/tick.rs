//! # Navigation core tick
//!
//! Composes perception and decision into a single pass, executed once per simulation tick:
//! perception first, then decision on its outputs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;
use log::warn;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use util::time::Clock;

use crate::{
    decision::{DecisionCtrl, DecisionParams, DecisionReport},
    per::{perception_step, PerError, PerMgr, PerParams, WorldMap},
    vehicle_state::VehicleState,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The autonomous navigation core, owning the perception manager, the decision controller and
/// the world map for a whole session.
#[derive(Debug)]
pub struct NavCore<R = ChaCha8Rng> {
    per: PerMgr,
    decision: DecisionCtrl<R>,
    world_map: WorldMap,
}

/// Outcome of one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// The perception error, if perception failed this tick
    pub per_error: Option<PerError>,

    /// True if the world map was updated
    pub map_updated: bool,

    pub decision: DecisionReport,
}

/// Flat per-tick record for CSV archiving.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub time_s: f64,
    pub x: f64,
    pub y: f64,
    pub yaw_deg: f64,
    pub vel_ms: f64,
    pub mode: String,
    pub action: String,
    pub throttle: f64,
    pub brake: f64,
    pub steer_deg: f64,
    pub send_pickup: bool,
    pub nav_count: usize,
    pub rock_count: usize,
    pub map_updated: bool,
    pub per_ok: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavCore<ChaCha8Rng> {
    pub fn new(per_params: PerParams, decision_params: DecisionParams) -> Result<Self, PerError> {
        let world_map = WorldMap::new(per_params.world_size_cells);

        Ok(Self {
            per: PerMgr::new(per_params)?,
            decision: DecisionCtrl::new(decision_params),
            world_map,
        })
    }
}

impl<R: Rng> NavCore<R> {
    /// Build a core from an already constructed decision controller.
    pub fn with_decision(
        per_params: PerParams,
        decision: DecisionCtrl<R>,
    ) -> Result<Self, PerError> {
        let world_map = WorldMap::new(per_params.world_size_cells);

        Ok(Self {
            per: PerMgr::new(per_params)?,
            decision,
            world_map,
        })
    }

    /// Run perception and decision for one frame.
    ///
    /// A perception failure is logged and the decision step then runs on empty descriptors, which
    /// makes it creep forward.
    pub fn tick<C: Clock + ?Sized>(
        &mut self,
        frame: &RgbImage,
        state: &mut VehicleState,
        clock: &C,
    ) -> TickReport {
        let (map_updated, per_error) =
            match perception_step(&self.per, frame, state, &mut self.world_map) {
                Ok(output) => (output.map_updated, None),
                Err(e) => {
                    warn!("Perception failed: {}", e);
                    (false, Some(e))
                }
            };

        let decision = self.decision.step(state, clock);

        TickReport {
            per_error,
            map_updated,
            decision,
        }
    }

    /// The accumulated world map.
    pub fn world_map(&self) -> &WorldMap {
        &self.world_map
    }
}

impl TickRecord {
    pub fn new(time_s: f64, state: &VehicleState, report: &TickReport) -> Self {
        Self {
            time_s,
            x: state.pose.position.x,
            y: state.pose.position.y,
            yaw_deg: state.pose.yaw_deg,
            vel_ms: state.vel_ms,
            mode: state.mode.to_string(),
            action: report.decision.action.to_string(),
            throttle: state.cmd.throttle,
            brake: state.cmd.brake,
            steer_deg: state.cmd.steer_deg,
            send_pickup: state.send_pickup,
            nav_count: report.decision.nav_count,
            rock_count: report.decision.rock_count,
            map_updated: report.map_updated,
            per_ok: report.per_error.is_none(),
        }
    }
}
