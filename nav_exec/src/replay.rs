//! # Replay dataset
//!
//! Reads a run recorded by the simulator: a `robot_log.csv` telemetry log plus an `IMG/`
//! directory holding the camera frame of each row.
//!
//! The log is semicolon separated, with a header row:
//!
//! ```text
//! Path;SteerAngle;Throttle;Brake;Speed;X_Position;Y_Position;Pitch;Yaw;Roll
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::info;
use nalgebra::Vector2;
use serde::Deserialize;

use crate::vehicle_state::VehicleState;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the telemetry log inside a dataset directory
pub const LOG_FILE_NAME: &str = "robot_log.csv";

/// Name of the image directory inside a dataset directory
pub const IMG_DIR_NAME: &str = "IMG";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One row of the telemetry log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogRow {
    /// Path of the frame as recorded, only the file name is used
    #[serde(rename = "Path")]
    pub path: String,

    /// Units: degrees
    #[serde(rename = "SteerAngle")]
    pub steer_angle: f64,

    #[serde(rename = "Throttle")]
    pub throttle: f64,

    #[serde(rename = "Brake")]
    pub brake: f64,

    /// Units: meters/second
    #[serde(rename = "Speed")]
    pub speed: f64,

    /// Units: meters, one meter per world map cell
    #[serde(rename = "X_Position")]
    pub x_position: f64,

    /// Units: meters, one meter per world map cell
    #[serde(rename = "Y_Position")]
    pub y_position: f64,

    /// Units: degrees
    #[serde(rename = "Pitch")]
    pub pitch: f64,

    /// Units: degrees
    #[serde(rename = "Yaw")]
    pub yaw: f64,

    /// Units: degrees
    #[serde(rename = "Roll")]
    pub roll: f64,
}

/// A recorded run loaded from disk.
#[derive(Debug, Clone)]
pub struct ReplayDataset {
    root: PathBuf,
    rows: Vec<LogRow>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Cannot open the telemetry log {0:?}: {1}")]
    LogOpenError(PathBuf, std::io::Error),

    #[error("Cannot parse the telemetry log: {0}")]
    LogParseError(csv::Error),

    #[error("Row has no image file name: {0:?}")]
    NoImageName(String),

    #[error("Cannot load the image {0:?}: {1}")]
    ImageLoadError(PathBuf, image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LogRow {
    /// File name of the frame, accepting either path separator.
    pub fn image_file_name(&self) -> Option<&str> {
        self.path
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .filter(|n| !n.is_empty())
    }

    /// Write this row's telemetry into the vehicle state.
    pub fn apply_to(&self, state: &mut VehicleState) {
        state.pose.position = Vector2::new(self.x_position, self.y_position);
        state.pose.yaw_deg = self.yaw;
        state.pose.pitch_deg = self.pitch;
        state.pose.roll_deg = self.roll;
        state.vel_ms = self.speed;
    }
}

impl ReplayDataset {
    /// Open the dataset in the given directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ReplayError> {
        let log_path = root.as_ref().join(LOG_FILE_NAME);
        let file =
            File::open(&log_path).map_err(|e| ReplayError::LogOpenError(log_path.clone(), e))?;

        let dataset = Self::from_reader(root, file)?;

        info!("Loaded {} rows from {:?}", dataset.len(), log_path);

        Ok(dataset)
    }

    /// Parse the log from any reader. Images are still looked up under `root`.
    pub fn from_reader<P: AsRef<Path>, R: Read>(root: P, reader: R) -> Result<Self, ReplayError> {
        let rows = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader)
            .deserialize()
            .collect::<Result<Vec<LogRow>, _>>()
            .map_err(ReplayError::LogParseError)?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            rows,
        })
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Path of a row's frame inside this dataset.
    pub fn image_path(&self, row: &LogRow) -> Result<PathBuf, ReplayError> {
        let name = row
            .image_file_name()
            .ok_or_else(|| ReplayError::NoImageName(row.path.clone()))?;

        Ok(self.root.join(IMG_DIR_NAME).join(name))
    }

    /// Load a row's frame as RGB.
    pub fn load_frame(&self, row: &LogRow) -> Result<RgbImage, ReplayError> {
        let path = self.image_path(row)?;

        image::open(&path)
            .map(|img| img.into_rgb8())
            .map_err(|e| ReplayError::ImageLoadError(path, e))
    }
}
