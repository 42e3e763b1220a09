//! # Navigation Executable Parameters
//!
//! This module provides parameters for the replay executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavExecParams {
    /// Simulated time between two recorded frames.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of ticks between intermediate world map summaries, zero to only save one at the end
    pub stats_save_period_ticks: usize,

    /// Minimum log level, one of `info`, `debug` or `trace`
    pub log_level: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            stats_save_period_ticks: 100,
            log_level: String::from("info"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let params: NavExecParams =
            util::params::from_str(include_str!("../../params/nav_exec.toml"))
                .expect("nav_exec.toml should parse");

        assert_eq!(params, NavExecParams::default());
    }
}
