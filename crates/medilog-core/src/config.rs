//! Configuration for the MediLog data layer.
//!
//! Loaded from JSON; every field has a default so an empty object is valid.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{MedilogError, MedilogResult};

/// Data layer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Age after which cached medications are refetched on demand
    #[serde(default = "default_medication_max_age_secs")]
    pub medication_max_age_secs: u64,
    /// Offset of the household clock, used for day grouping and usage buckets
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Service domain of the backend integration
    #[serde(default = "default_service_domain")]
    pub service_domain: String,
}

fn default_medication_max_age_secs() -> u64 {
    60
}

fn default_service_domain() -> String {
    "medilog".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            medication_max_age_secs: default_medication_max_age_secs(),
            utc_offset_minutes: 0,
            service_domain: default_service_domain(),
        }
    }
}

impl Config {
    /// Parse configuration from a JSON string.
    pub fn from_json_str(json: &str) -> MedilogResult<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.household_offset()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> MedilogResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Staleness window for the medication catalog.
    pub fn medication_max_age(&self) -> Duration {
        Duration::from_secs(self.medication_max_age_secs)
    }

    /// The household offset as a chrono offset.
    pub fn household_offset(&self) -> MedilogResult<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
            MedilogError::config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}
