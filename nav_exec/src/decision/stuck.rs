//! # Stuck detection and recovery
//!
//! The rover is stuck when it has been continuously below the stuck velocity threshold for longer
//! than the stuck time threshold. Recovery is an open-loop maneuver with a random steering
//! direction, held until a deadline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use rand::Rng;

use super::DecisionParams;
use crate::vehicle_state::{Commands, Recovery, RecoveryKind, VehicleState};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Update the stuck timer with the current velocity and return true if the rover is stuck.
///
/// The timer starts on the first slow sample and is cleared by any sample at or above the
/// threshold.
pub fn is_stuck(params: &DecisionParams, state: &mut VehicleState, now_s: f64) -> bool {
    if state.vel_ms.abs() < params.stuck_vel_threshold_ms {
        let start_s = *state.stuck_start_time_s.get_or_insert(now_s);
        let stuck_time_s = now_s - start_s;

        debug!("Slow for {:.2} s", stuck_time_s);

        stuck_time_s > params.stuck_time_threshold_s
    } else {
        state.stuck_start_time_s = None;
        false
    }
}

/// Choose the recovery maneuver for the current stuck episode.
///
/// Steering goes to a random extreme. Early in the episode the rover tries to push through, once
/// it has been stuck for `recovery_escalate_s` it backs out instead.
pub fn recovery_maneuver<R: Rng>(
    params: &DecisionParams,
    state: &VehicleState,
    now_s: f64,
    rng: &mut R,
) -> Recovery {
    let steer_deg = if rng.gen_bool(0.5) {
        params.max_steer_deg
    } else {
        -params.max_steer_deg
    };

    let stuck_time_s = state
        .stuck_start_time_s
        .map(|start_s| now_s - start_s)
        .unwrap_or(0.0);

    let (kind, throttle, hold_s) = if stuck_time_s < params.recovery_escalate_s {
        (
            RecoveryKind::Boost,
            2.0 * params.throttle_set,
            params.boost_hold_s,
        )
    } else {
        (
            RecoveryKind::Reverse,
            -params.throttle_set,
            params.reverse_hold_s,
        )
    };

    Recovery {
        kind,
        cmd: Commands {
            throttle,
            brake: 0.0,
            steer_deg,
        },
        until_s: now_s + hold_s,
    }
}
