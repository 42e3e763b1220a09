//! # Vehicle State
//!
//! The single record shared between the simulator harness, perception and the decision
//! controller. The harness owns it for the whole session, writing telemetry in before each tick
//! and reading commands out after it. Perception and decision borrow it mutably in turn.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use image::RgbImage;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::per::PolarDescriptor;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose of the rover in the world map frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the world frame.
    ///
    /// Units: world map cells
    pub position: Vector2<f64>,

    /// Heading, anticlockwise from the world X axis.
    ///
    /// Units: degrees
    pub yaw_deg: f64,

    /// Units: degrees, wrapping at 360
    pub pitch_deg: f64,

    /// Units: degrees, wrapping at 360
    pub roll_deg: f64,
}

/// Actuator demands for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Commands {
    /// Signed throttle, negative values drive in reverse.
    pub throttle: f64,

    /// Brake demand, never negative.
    pub brake: f64,

    /// Steering angle, positive to the left.
    ///
    /// Units: degrees
    pub steer_deg: f64,
}

/// An open-loop recovery maneuver which is held until its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    /// What kind of maneuver this is
    pub kind: RecoveryKind,

    /// The command to hold while the maneuver is active
    pub cmd: Commands,

    /// Time at which the maneuver ends and normal control resumes.
    ///
    /// Units: seconds, in the clock's time base
    pub until_s: f64,
}

/// Full state of the vehicle as seen by the navigation core.
#[derive(Debug, Clone, Default)]
pub struct VehicleState {
    // ---- TELEMETRY (written by the harness) ----
    pub pose: Pose,

    /// Signed forward velocity.
    ///
    /// Units: meters/second
    pub vel_ms: f64,

    /// True when the rover is within pickup range of a sample
    pub near_sample: bool,

    /// True while the harness is executing a pickup
    pub picking_up: bool,

    // ---- PERCEPTION OUTPUTS ----
    /// Polar descriptor of the navigable terrain in front of the rover
    pub nav: PolarDescriptor,

    /// Polar descriptor of any visible rock samples
    pub rocks: PolarDescriptor,

    /// Display image of the classification, R = obstacle, G = rock, B = navigable. `None` until
    /// the first successful perception step.
    pub vision_image: Option<RgbImage>,

    // ---- DECISION OUTPUTS ----
    pub mode: DriveMode,

    pub cmd: Commands,

    /// Raised for one tick when the harness should trigger a sample pickup
    pub send_pickup: bool,

    /// Time at which the rover was first seen below the stuck velocity threshold
    pub stuck_start_time_s: Option<f64>,

    /// Active recovery maneuver, if any
    pub recovery: Option<Recovery>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Driving mode of the decision controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Forward,
    Stop,
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryKind {
    /// Drive forwards hard
    Boost,
    /// Back out
    Reverse,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Commands {
    /// Full stop: no throttle, the given brake, wheels straight.
    pub fn stop(brake: f64) -> Self {
        Self {
            throttle: 0.0,
            brake,
            steer_deg: 0.0,
        }
    }
}

impl VehicleState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::Forward
    }
}

impl Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMode::Forward => write!(f, "forward"),
            DriveMode::Stop => write!(f, "stop"),
            DriveMode::Stuck => write!(f, "stuck"),
        }
    }
}
