//! # Navigation library.
//!
//! Autonomous navigation core of the rover: perception of the forward camera frame and the
//! reactive decision controller driving from it. The replay executable and any simulator harness
//! use this library through [`tick::NavCore`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Decision controller - turns perception outputs and telemetry into drive commands
pub mod decision;

/// Executable parameters
pub mod params;

/// Perception - classifies the camera frame and maintains the world map
pub mod per;

/// Replay dataset - reads runs recorded by the simulator
pub mod replay;

/// Navigation core tick - perception then decision, once per frame
pub mod tick;

/// Vehicle state shared between the harness and the navigation core
pub mod vehicle_state;
