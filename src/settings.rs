//! Game settings
//!
//! Loaded from an optional JSON file. The file is parsed into a loose
//! `SettingsFile` first so out-of-range values can be reported by name
//! instead of as a serde type error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_SEGMENT_COUNT, MAX_SEGMENT_COUNT};
use crate::sim::{ControllerTuning, ObstacleVariant};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("segment_count must not be negative (got {0})")]
    NegativeSegmentCount(i64),
    #[error("segment_count {0} exceeds the maximum of {max}", max = MAX_SEGMENT_COUNT)]
    TooManySegments(i64),
    #[error("obstacle pool is empty but segment_count is {0}")]
    EmptyObstaclePool(u32),
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// On-disk shape of the settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub segment_count: i64,
    pub seed: Option<u64>,
    pub obstacles: Vec<ObstacleVariant>,
    pub tuning: ControllerTuning,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Settings::default().into()
    }
}

/// Validated settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Obstacle segments between the start and end platforms
    pub segment_count: u32,
    /// First-run seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Variants the generator picks from
    pub obstacles: Vec<ObstacleVariant>,
    pub tuning: ControllerTuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            seed: None,
            obstacles: ObstacleVariant::ALL.to_vec(),
            tuning: ControllerTuning::default(),
        }
    }
}

impl From<Settings> for SettingsFile {
    fn from(settings: Settings) -> Self {
        Self {
            segment_count: settings.segment_count as i64,
            seed: settings.seed,
            obstacles: settings.obstacles,
            tuning: settings.tuning,
        }
    }
}

impl TryFrom<SettingsFile> for Settings {
    type Error = ConfigError;

    fn try_from(file: SettingsFile) -> Result<Self, Self::Error> {
        if file.segment_count < 0 {
            return Err(ConfigError::NegativeSegmentCount(file.segment_count));
        }
        if file.segment_count > MAX_SEGMENT_COUNT as i64 {
            return Err(ConfigError::TooManySegments(file.segment_count));
        }
        let segment_count = file.segment_count as u32;
        if file.obstacles.is_empty() && segment_count > 0 {
            return Err(ConfigError::EmptyObstaclePool(segment_count));
        }
        Ok(Self {
            segment_count,
            seed: file.seed,
            obstacles: file.obstacles,
            tuning: file.tuning,
        })
    }
}

impl Settings {
    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        file.try_into()
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let settings = Self::from_json(&json, &path.display().to_string())?;
        log::info!(
            "Loaded settings from {} ({} segments)",
            path.display(),
            settings.segment_count
        );
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&SettingsFile::from(self.clone()))
    }
}
