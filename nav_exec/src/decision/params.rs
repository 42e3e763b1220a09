//! # Decision Controller Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the decision controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionParams {
    /// Cruise throttle
    pub throttle_set: f64,

    /// Brake demand used when stopping
    pub brake_set: f64,

    /// Velocity above which no more throttle is applied.
    ///
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Minimum number of navigable angles needed to keep driving forward
    pub stop_forward: usize,

    /// Minimum number of navigable angles needed to leave `stop`
    pub go_forward: usize,

    /// Steering limit, applied symmetrically. Never exceeds
    /// [`STEER_LIMIT_DEG`](super::STEER_LIMIT_DEG).
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    /// Velocity above which the rover is still considered moving when braking.
    ///
    /// Units: meters/second
    pub stop_vel_threshold_ms: f64,

    /// Velocity magnitude below which the stuck timer runs.
    ///
    /// Units: meters/second
    pub stuck_vel_threshold_ms: f64,

    /// Time the rover must be continuously slow before it is declared stuck.
    ///
    /// Units: seconds
    pub stuck_time_threshold_s: f64,

    /// Stuck duration after which recovery reverses instead of boosting.
    ///
    /// Units: seconds
    pub recovery_escalate_s: f64,

    /// Units: seconds
    pub boost_hold_s: f64,

    /// Units: seconds
    pub reverse_hold_s: f64,

    /// Minimum number of rock angles for a rock to be approached
    pub min_rock_angles: usize,

    /// Fraction of the navigable angles, largest first, used for steering
    pub nav_keep_fraction: f64,

    /// Seed of the random source used to pick recovery steering
    pub rng_seed: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            throttle_set: 0.2,
            brake_set: 10.0,
            max_vel_ms: 2.0,
            stop_forward: 50,
            go_forward: 500,
            max_steer_deg: 15.0,
            stop_vel_threshold_ms: 0.2,
            stuck_vel_threshold_ms: 0.2,
            stuck_time_threshold_s: 5.0,
            recovery_escalate_s: 5.0,
            boost_hold_s: 1.0,
            reverse_hold_s: 2.0,
            min_rock_angles: 2,
            nav_keep_fraction: 0.5,
            rng_seed: 0,
        }
    }
}
