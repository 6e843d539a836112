// Loop rate, topics, clamp defaults and the controller configuration file
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Frame loop frequency (one input poll per frame)
pub const LOOP_HZ: u64 = 60;
pub const MAX_LOOP_HZ: u64 = 1000;

// Default clamp delta, in percent
pub const DEFAULT_CLAMP_DELTA: f32 = 5.0;

// Seconds for the progress indicator to fill a full circle
pub const DEFAULT_PROGRESS_REVOLUTION_TIME: f32 = 1.0;

// Capacity of the SDK -> controller event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// Zenoh topics used by the zenoh-backed SDK
pub const TOPIC_CHIRP_TX: &str = "marvin42/chirp/tx"; // payloads we transmit
pub const TOPIC_CHIRP_RX: &str = "marvin42/chirp/rx"; // payloads heard by the device

// Simulated time on air for one transmission (zenoh backend)
pub const CHIRP_BASE_AIRTIME: Duration = Duration::from_millis(300);
pub const CHIRP_AIRTIME_PER_BYTE: Duration = Duration::from_millis(80);

// Terminal cells are roughly twice as tall as they are wide
pub const DEFAULT_CELL_ASPECT: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown protocol '{0}'")]
    UnknownProtocol(String),
}

/// Credentials handed to the SDK on init
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkCredentials {
    pub key: String,
    pub secret: String,
    pub config: String,
}

impl SdkCredentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            config: config.into(),
        }
    }

    /// True when no field is blank or whitespace
    pub fn is_complete(&self) -> bool {
        [&self.key, &self.secret, &self.config]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// A named SDK protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Percent; used both as the rounding interval and the "close enough" window
    pub motor_speed_clamp_delta: f32,
    pub clamp_to_interval: bool,
    pub clamp_to_each_other: bool,
    pub progress_revolution_time: f32,
    pub cell_aspect: f32,
    pub credentials: SdkCredentials,
    pub protocols: Vec<ProtocolEntry>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            motor_speed_clamp_delta: DEFAULT_CLAMP_DELTA,
            clamp_to_interval: false,
            clamp_to_each_other: false,
            progress_revolution_time: DEFAULT_PROGRESS_REVOLUTION_TIME,
            cell_aspect: DEFAULT_CELL_ASPECT,
            credentials: SdkCredentials::default(),
            protocols: Vec::new(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Copy the named protocol's value into the SDK credentials
    pub fn select_protocol(&mut self, name: &str) -> Result<(), ConfigError> {
        let entry = self
            .protocols
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownProtocol(name.to_string()))?;
        self.credentials.config = entry.value.clone();
        Ok(())
    }
}
