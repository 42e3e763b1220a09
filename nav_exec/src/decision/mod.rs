//! # Decision controller
//!
//! Reactive controller turning the perception descriptors and vehicle telemetry into actuator
//! commands. It is a state machine over [`DriveMode`], with each mode handled by a `mode_xyz`
//! function that sets the commands and returns the action taken.
//!
//! Each step:
//!  1. Restrict the navigable angles to their largest half, which biases the rover towards
//!     following the wall on its left.
//!  1. Clear the stuck timer if the rover is moving.
//!  1. If a recovery maneuver is active, hold its command until the deadline.
//!  1. With no navigable angles at all, creep forward.
//!  1. Otherwise run the current mode.
//!  1. Clamp the steering and raise the pickup signal if a sample can be collected.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub mod stuck;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::DecisionParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cmp::Ordering, fmt::Display};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use util::{
    maths::{clamp, mean},
    time::Clock,
};

use crate::vehicle_state::{Commands, DriveMode, RecoveryKind, VehicleState};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Hard limit on the commanded steering angle, whatever the parameters say.
///
/// Units: degrees
pub const STEER_LIMIT_DEG: f64 = 15.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The decision controller.
#[derive(Debug, Clone)]
pub struct DecisionCtrl<R = ChaCha8Rng> {
    params: DecisionParams,

    /// Source of the recovery steering direction
    rng: R,

    report: DecisionReport,
}

/// Summary of one decision step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionReport {
    /// What the controller did this step
    pub action: DecisionAction,

    /// Mode at the start of the step
    pub prev_mode: DriveMode,

    /// Mode at the end of the step
    pub mode: DriveMode,

    /// Number of navigable angles after restriction
    pub nav_count: usize,

    /// Number of rock angles
    pub rock_count: usize,

    /// Mean of the restricted navigable angles, `None` if there were none.
    ///
    /// Units: degrees
    pub nav_mean_deg: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The action taken in a decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// No navigable terrain was seen, drive slowly straight ahead
    Creep,

    /// A recovery maneuver is in progress
    HoldRecovery,

    /// The rover has been slow for too long, switched to stuck
    StuckDetected,

    /// Driving towards a visible rock
    ApproachRock,

    /// Driving along the navigable terrain
    Drive,

    /// Not enough navigable terrain ahead, braking into stop
    StopNoTerrain,

    /// Braking to a standstill
    Braking,

    /// Stopped and turning towards a visible rock
    SteerToRock,

    /// Stopped and turning on the spot to look for navigable terrain
    SearchLeft,

    /// Stopped with enough navigable terrain ahead, driving off
    Resume,

    /// A recovery maneuver has been started
    StartRecovery(RecoveryKind),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DecisionCtrl<ChaCha8Rng> {
    /// Create a new controller with a random source seeded from the parameters.
    pub fn new(params: DecisionParams) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(params.rng_seed);
        Self::with_rng(params, rng)
    }
}

impl<R: Rng> DecisionCtrl<R> {
    /// Create a new controller using the given random source.
    pub fn with_rng(params: DecisionParams, rng: R) -> Self {
        Self {
            params,
            rng,
            report: DecisionReport::default(),
        }
    }

    pub fn params(&self) -> &DecisionParams {
        &self.params
    }

    /// Run one decision step, updating the mode and commands in the vehicle state.
    pub fn step<C: Clock + ?Sized>(
        &mut self,
        state: &mut VehicleState,
        clock: &C,
    ) -> DecisionReport {
        let now_s = clock.now_s();

        let nav_angles = restrict_nav_angles(&state.nav.angles, self.params.nav_keep_fraction);

        self.report = DecisionReport {
            prev_mode: state.mode,
            nav_count: nav_angles.len(),
            rock_count: state.rocks.len(),
            nav_mean_deg: mean(&nav_angles).map(f64::to_degrees),
            ..Default::default()
        };

        // Any fast sample clears the stuck timer, whichever branch runs below
        if state.vel_ms.abs() >= self.params.stuck_vel_threshold_ms {
            state.stuck_start_time_s = None;
        }

        let action = match state.recovery {
            Some(recovery) if now_s < recovery.until_s => {
                state.cmd = recovery.cmd;
                DecisionAction::HoldRecovery
            }
            _ => {
                if let Some(recovery) = state.recovery.take() {
                    info!("{:?} recovery maneuver complete", recovery.kind);
                }

                if nav_angles.is_empty() {
                    state.cmd = Commands {
                        throttle: self.params.throttle_set,
                        brake: 0.0,
                        steer_deg: 0.0,
                    };
                    DecisionAction::Creep
                } else {
                    match state.mode {
                        DriveMode::Forward => self.mode_forward(state, now_s),
                        DriveMode::Stop => self.mode_stop(state),
                        DriveMode::Stuck => self.mode_stuck(state, now_s),
                    }
                }
            }
        };

        let max_steer_deg = self.params.max_steer_deg.min(STEER_LIMIT_DEG);
        state.cmd.steer_deg = clamp(state.cmd.steer_deg, -max_steer_deg, max_steer_deg);

        state.send_pickup = state.near_sample && state.vel_ms == 0.0 && !state.picking_up;

        if state.mode != self.report.prev_mode {
            info!("Drive mode changed: {} -> {}", self.report.prev_mode, state.mode);
        }

        self.report.action = action;
        self.report.mode = state.mode;

        debug!(
            "Decision: {} (nav {}, rocks {}), cmd {:?}",
            action, self.report.nav_count, self.report.rock_count, state.cmd
        );

        self.report
    }

    /// Mode forward
    ///
    /// Drives towards visible rocks, otherwise along the navigable terrain, and stops when the
    /// terrain runs out. Checks for the rover being stuck first.
    fn mode_forward(&mut self, state: &mut VehicleState, now_s: f64) -> DecisionAction {
        if stuck::is_stuck(&self.params, state, now_s) {
            warn!("Rover is stuck");
            state.mode = DriveMode::Stuck;
            return DecisionAction::StuckDetected;
        }

        if let Some(rock_deg) = self.rock_target_deg(state) {
            let (throttle, brake) = if state.near_sample {
                (0.0, 2.0 * self.params.brake_set)
            } else if state.vel_ms < self.params.max_vel_ms / 4.0 {
                (self.params.throttle_set / 4.0, 0.0)
            } else {
                (0.0, self.params.brake_set)
            };

            state.cmd = Commands {
                throttle,
                brake,
                steer_deg: rock_deg,
            };

            return DecisionAction::ApproachRock;
        }

        if self.report.nav_count >= self.params.stop_forward {
            state.cmd = Commands {
                throttle: if state.vel_ms < self.params.max_vel_ms {
                    self.params.throttle_set
                } else {
                    0.0
                },
                brake: 0.0,
                steer_deg: self.report.nav_mean_deg.unwrap_or(0.0),
            };

            DecisionAction::Drive
        } else {
            state.cmd = Commands::stop(self.params.brake_set);
            state.mode = DriveMode::Stop;

            DecisionAction::StopNoTerrain
        }
    }

    /// Mode stop
    ///
    /// Brakes to a standstill, then either turns towards a rock or turns on the spot until enough
    /// navigable terrain is in view to drive off again.
    fn mode_stop(&mut self, state: &mut VehicleState) -> DecisionAction {
        if state.vel_ms > self.params.stop_vel_threshold_ms {
            state.cmd = Commands::stop(self.params.brake_set);
            return DecisionAction::Braking;
        }

        // Enough terrain to drive on takes priority over the rock
        if self.report.nav_count >= self.params.go_forward {
            state.cmd = Commands {
                throttle: self.params.throttle_set,
                brake: 0.0,
                steer_deg: self.report.nav_mean_deg.unwrap_or(0.0),
            };
            state.mode = DriveMode::Forward;

            DecisionAction::Resume
        } else if let Some(rock_deg) = self.rock_target_deg(state) {
            state.cmd = Commands {
                throttle: 0.0,
                brake: 0.0,
                steer_deg: rock_deg,
            };

            DecisionAction::SteerToRock
        } else {
            state.cmd = Commands {
                throttle: 0.0,
                brake: 0.0,
                steer_deg: -self.params.max_steer_deg,
            };

            DecisionAction::SearchLeft
        }
    }

    /// Mode stuck
    ///
    /// Brakes to a standstill and then starts a recovery maneuver, returning to forward.
    fn mode_stuck(&mut self, state: &mut VehicleState, now_s: f64) -> DecisionAction {
        if state.vel_ms > self.params.stop_vel_threshold_ms {
            state.cmd = Commands::stop(self.params.brake_set);
            return DecisionAction::Braking;
        }

        let recovery = stuck::recovery_maneuver(&self.params, state, now_s, &mut self.rng);

        warn!(
            "Starting {:?} recovery: {:?} until {:.2} s",
            recovery.kind, recovery.cmd, recovery.until_s
        );

        state.cmd = recovery.cmd;
        state.recovery = Some(recovery);
        state.mode = DriveMode::Forward;

        DecisionAction::StartRecovery(recovery.kind)
    }

    /// Mean rock angle in degrees, if a rock is visible and no pickup is running.
    fn rock_target_deg(&self, state: &VehicleState) -> Option<f64> {
        if state.rocks.len() < self.params.min_rock_angles || state.picking_up {
            return None;
        }

        mean(&state.rocks.angles).map(f64::to_degrees)
    }
}

impl Default for DecisionAction {
    fn default() -> Self {
        DecisionAction::Creep
    }
}

impl Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionAction::Creep => write!(f, "creep"),
            DecisionAction::HoldRecovery => write!(f, "hold_recovery"),
            DecisionAction::StuckDetected => write!(f, "stuck_detected"),
            DecisionAction::ApproachRock => write!(f, "approach_rock"),
            DecisionAction::Drive => write!(f, "drive"),
            DecisionAction::StopNoTerrain => write!(f, "stop_no_terrain"),
            DecisionAction::Braking => write!(f, "braking"),
            DecisionAction::SteerToRock => write!(f, "steer_to_rock"),
            DecisionAction::SearchLeft => write!(f, "search_left"),
            DecisionAction::Resume => write!(f, "resume"),
            DecisionAction::StartRecovery(RecoveryKind::Boost) => write!(f, "start_boost"),
            DecisionAction::StartRecovery(RecoveryKind::Reverse) => write!(f, "start_reverse"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Keep the largest `keep_fraction` of the angles, in ascending order.
///
/// The number kept is truncated, if that leaves nothing then all angles are kept.
pub fn restrict_nav_angles(angles: &[f64], keep_fraction: f64) -> Vec<f64> {
    let mut sorted = angles.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let keep = (sorted.len() as f64 * keep_fraction) as usize;

    if keep == 0 || keep >= sorted.len() {
        sorted
    } else {
        sorted.split_off(sorted.len() - keep)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::PolarDescriptor;
    use rand::rngs::mock::StepRng;
    use util::time::SimClock;

    /// `n` navigable angles all at `angle_deg`.
    fn nav(n: usize, angle_deg: f64) -> PolarDescriptor {
        PolarDescriptor {
            dists: vec![10.0; n],
            angles: vec![angle_deg.to_radians(); n],
        }
    }

    fn ctrl() -> DecisionCtrl {
        DecisionCtrl::new(DecisionParams::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_restrict_nav_angles() {
        assert_eq!(
            restrict_nav_angles(&[0.3, -0.2, 0.1, 0.5, -0.4], 0.5),
            vec![0.3, 0.5]
        );
        assert_eq!(restrict_nav_angles(&[0.3, -0.2, 0.1, 0.5], 0.5), vec![0.3, 0.5]);

        // Nothing would be kept, so everything is
        assert_eq!(restrict_nav_angles(&[0.7], 0.5), vec![0.7]);
        assert!(restrict_nav_angles(&[], 0.5).is_empty());
    }

    #[test]
    fn test_creep_without_terrain() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.mode = DriveMode::Stop;
        state.cmd = Commands::stop(10.0);

        let report = ctrl.step(&mut state, &clock);

        assert_eq!(report.action, DecisionAction::Creep);
        assert_eq!(state.cmd, Commands { throttle: 0.2, brake: 0.0, steer_deg: 0.0 });
        assert_eq!(state.mode, DriveMode::Stop);
    }

    #[test]
    fn test_drive_forward() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.vel_ms = 1.0;
        state.nav = nav(600, 8.0);

        let report = ctrl.step(&mut state, &clock);

        assert_eq!(report.action, DecisionAction::Drive);
        assert_eq!(report.nav_count, 300);
        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(state.cmd.throttle, 0.2);
        assert_eq!(state.cmd.brake, 0.0);
        assert!(approx(state.cmd.steer_deg, 8.0));

        // Coast at max velocity
        state.vel_ms = 2.0;
        ctrl.step(&mut state, &clock);
        assert_eq!(state.cmd.throttle, 0.0);
    }

    #[test]
    fn test_forward_hysteresis() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.vel_ms = 1.0;

        // Below go but above stop keeps driving
        state.nav = nav(200, 0.0);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Drive);
        assert_eq!(state.mode, DriveMode::Forward);
    }

    #[test]
    fn test_forward_to_stop() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.vel_ms = 1.0;
        state.nav = nav(90, 10.0);

        let report = ctrl.step(&mut state, &clock);

        assert_eq!(report.action, DecisionAction::StopNoTerrain);
        assert_eq!(report.prev_mode, DriveMode::Forward);
        assert_eq!(report.mode, DriveMode::Stop);
        assert_eq!(state.cmd, Commands { throttle: 0.0, brake: 10.0, steer_deg: 0.0 });
    }

    #[test]
    fn test_stop_to_forward() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.mode = DriveMode::Stop;
        state.vel_ms = 0.0;
        state.nav = nav(1200, -4.0);

        // A visible rock does not hold the rover when there is terrain to drive on
        state.rocks = nav(5, 30.0);

        let report = ctrl.step(&mut state, &clock);

        assert_eq!(report.action, DecisionAction::Resume);
        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(state.cmd.throttle, 0.2);
        assert_eq!(state.cmd.brake, 0.0);
        assert!(approx(state.cmd.steer_deg, -4.0));
    }

    #[test]
    fn test_stop_behaviours() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.mode = DriveMode::Stop;
        state.nav = nav(100, 0.0);

        // Still moving, keep braking
        state.vel_ms = 0.5;
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Braking);
        assert_eq!(state.cmd, Commands::stop(10.0));

        // Stopped, nothing to drive on, turn on the spot
        state.vel_ms = 0.1;
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::SearchLeft);
        assert_eq!(state.cmd, Commands { throttle: 0.0, brake: 0.0, steer_deg: -15.0 });

        // Stopped with a rock in view, turn towards it
        state.rocks = nav(4, 10.0);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::SteerToRock);
        assert!(approx(state.cmd.steer_deg, 10.0));
        assert_eq!(state.cmd.throttle, 0.0);

        // Unless a pickup is running
        state.picking_up = true;
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::SearchLeft);
        assert_eq!(state.mode, DriveMode::Stop);
    }

    #[test]
    fn test_approach_rock() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);
        state.rocks = nav(3, 40.0);

        // Slow, creep up on it with the steering clamped
        state.vel_ms = 0.3;
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::ApproachRock);
        assert_eq!(state.cmd, Commands { throttle: 0.05, brake: 0.0, steer_deg: 15.0 });

        // Too fast, brake
        state.vel_ms = 0.6;
        ctrl.step(&mut state, &clock);
        assert_eq!(state.cmd.throttle, 0.0);
        assert_eq!(state.cmd.brake, 10.0);

        // Near the sample, brake hard
        state.near_sample = true;
        ctrl.step(&mut state, &clock);
        assert_eq!(state.cmd.throttle, 0.0);
        assert_eq!(state.cmd.brake, 20.0);

        // A single rock pixel is ignored
        state.near_sample = false;
        state.rocks = nav(1, 40.0);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Drive);
    }

    #[test]
    fn test_steering_clamped() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.vel_ms = 1.0;

        for &angle in [-80.0, -15.0, -3.0, 0.0, 14.9, 15.0, 60.0].iter() {
            state.mode = DriveMode::Forward;
            state.nav = nav(600, angle);
            ctrl.step(&mut state, &clock);

            assert!(state.cmd.steer_deg.abs() <= 15.0);
            assert!(approx(state.cmd.steer_deg, angle.max(-15.0).min(15.0)));
        }
    }

    #[test]
    fn test_send_pickup_every_mode() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);

        for &mode in [DriveMode::Forward, DriveMode::Stop, DriveMode::Stuck].iter() {
            let mut state = VehicleState::new();
            state.mode = mode;
            state.near_sample = true;
            state.vel_ms = 0.0;
            state.nav = nav(600, 0.0);

            ctrl.step(&mut state, &clock);
            assert!(state.send_pickup, "no pickup in {}", mode);

            // Cleared again once the pickup is running
            state.picking_up = true;
            ctrl.step(&mut state, &clock);
            assert!(!state.send_pickup);
        }
    }

    #[test]
    fn test_stuck_detection() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.0;

        // Slow for 5 s is not yet stuck
        for _ in 0..50 {
            ctrl.step(&mut state, &clock);
            assert_eq!(state.mode, DriveMode::Forward);
            clock.advance(0.1);
        }
        clock.set(5.0);
        ctrl.step(&mut state, &clock);
        assert_eq!(state.mode, DriveMode::Forward);

        // Just over 5 s is
        clock.set(5.2);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::StuckDetected);
        assert_eq!(state.mode, DriveMode::Stuck);
    }

    #[test]
    fn test_stuck_debounce_reset() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);

        state.vel_ms = 0.0;
        ctrl.step(&mut state, &clock);

        // One fast tick restarts the timer
        clock.set(4.0);
        state.vel_ms = 0.5;
        ctrl.step(&mut state, &clock);
        assert_eq!(state.stuck_start_time_s, None);

        state.vel_ms = 0.0;
        clock.set(4.5);
        ctrl.step(&mut state, &clock);
        clock.set(9.0);
        ctrl.step(&mut state, &clock);
        assert_eq!(state.mode, DriveMode::Forward);

        clock.set(9.6);
        ctrl.step(&mut state, &clock);
        assert_eq!(state.mode, DriveMode::Stuck);
    }

    #[test]
    fn test_creep_clears_stuck_timer() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();

        state.nav = nav(600, 0.0);
        state.vel_ms = 0.0;
        ctrl.step(&mut state, &clock);
        assert_eq!(state.stuck_start_time_s, Some(0.0));

        // Creeping at speed with nothing navigable in view
        state.nav = PolarDescriptor::default();
        state.vel_ms = 1.0;
        for &t in [0.1, 3.0, 8.9].iter() {
            clock.set(t);
            assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Creep);
            assert_eq!(state.stuck_start_time_s, None);
        }

        // A single slow tick afterwards only restarts the timer
        clock.set(9.1);
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.1;
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Drive);
        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(state.stuck_start_time_s, Some(9.1));
    }

    #[test]
    fn test_fast_reverse_clears_stuck_timer() {
        let mut ctrl = DecisionCtrl::with_rng(DecisionParams::default(), StepRng::new(0, 0));
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.0;

        ctrl.step(&mut state, &clock);
        clock.set(6.0);
        ctrl.step(&mut state, &clock);
        clock.set(6.5);
        assert_eq!(
            ctrl.step(&mut state, &clock).action,
            DecisionAction::StartRecovery(RecoveryKind::Reverse)
        );

        // Backing out quickly during the hold
        state.vel_ms = -0.5;
        clock.set(7.5);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::HoldRecovery);
        assert_eq!(state.stuck_start_time_s, None);

        // Slow again once released, not stuck straight away
        state.vel_ms = 0.0;
        clock.set(8.6);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Drive);
        assert_eq!(state.mode, DriveMode::Forward);
    }

    #[test]
    fn test_steer_limit_overrides_params() {
        let params = DecisionParams {
            max_steer_deg: 30.0,
            ..Default::default()
        };
        let mut ctrl = DecisionCtrl::new(params);
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.vel_ms = 1.0;

        state.nav = nav(600, 25.0);
        ctrl.step(&mut state, &clock);
        assert_eq!(state.cmd.steer_deg, STEER_LIMIT_DEG);

        state.mode = DriveMode::Stop;
        state.vel_ms = 0.0;
        state.nav = nav(100, 0.0);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::SearchLeft);
        assert_eq!(state.cmd.steer_deg, -STEER_LIMIT_DEG);
    }

    #[test]
    fn test_recovery_hold_and_escalation() {
        let mut ctrl = DecisionCtrl::with_rng(DecisionParams::default(), StepRng::new(0, 0));
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.0;

        ctrl.step(&mut state, &clock);
        clock.set(6.0);
        ctrl.step(&mut state, &clock);
        assert_eq!(state.mode, DriveMode::Stuck);

        // Stuck for over 5 s, so back out
        clock.set(6.5);
        let report = ctrl.step(&mut state, &clock);
        assert_eq!(
            report.action,
            DecisionAction::StartRecovery(RecoveryKind::Reverse)
        );
        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(state.cmd, Commands { throttle: -0.2, brake: 0.0, steer_deg: 15.0 });

        // Held until the deadline, whatever perception says
        state.nav = PolarDescriptor::default();
        clock.set(8.0);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::HoldRecovery);
        assert_eq!(state.cmd.throttle, -0.2);

        // The stuck timer survives the maneuver
        assert_eq!(state.stuck_start_time_s, Some(0.0));

        // Released at the deadline
        clock.set(8.5);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Creep);
        assert!(state.recovery.is_none());
    }

    #[test]
    fn test_boost_recovery() {
        let params = DecisionParams {
            recovery_escalate_s: 10.0,
            ..Default::default()
        };
        let mut ctrl = DecisionCtrl::with_rng(params, StepRng::new(u64::MAX, 0));
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.0;

        ctrl.step(&mut state, &clock);
        clock.set(5.5);
        ctrl.step(&mut state, &clock);

        clock.set(5.6);
        let report = ctrl.step(&mut state, &clock);
        assert_eq!(report.action, DecisionAction::StartRecovery(RecoveryKind::Boost));
        assert_eq!(state.cmd, Commands { throttle: 0.4, brake: 0.0, steer_deg: -15.0 });

        clock.set(6.5);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::HoldRecovery);

        // Still slow after the boost, so stuck again straight away
        clock.set(6.7);
        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::StuckDetected);
    }

    #[test]
    fn test_stuck_brakes_while_moving() {
        let mut ctrl = ctrl();
        let clock = SimClock::new(0.0);
        let mut state = VehicleState::new();
        state.mode = DriveMode::Stuck;
        state.nav = nav(600, 0.0);
        state.vel_ms = 0.3;

        assert_eq!(ctrl.step(&mut state, &clock).action, DecisionAction::Braking);
        assert_eq!(state.cmd, Commands::stop(10.0));
        assert_eq!(state.mode, DriveMode::Stuck);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let run = || {
            let mut ctrl = ctrl();
            let clock = SimClock::new(0.0);
            let mut steers = vec![];

            for _ in 0..10 {
                let mut state = VehicleState::new();
                state.mode = DriveMode::Stuck;
                state.nav = nav(600, 0.0);
                ctrl.step(&mut state, &clock);
                steers.push(state.cmd.steer_deg);
            }

            steers
        };

        let steers = run();
        assert_eq!(steers, run());
        assert!(steers.iter().all(|s| s.abs() == 15.0));
    }
}
