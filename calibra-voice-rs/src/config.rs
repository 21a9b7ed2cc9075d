//! Configuration management for calibra-voice-rs.
//!
//! Loads config from YAML files in standard locations; every section and
//! field is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::throttle::JsonFileStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Base URL of the speech engine API.
    pub endpoint: String,
    pub event_type: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for one utterance to finish playing.
    pub utterance_timeout_secs: u64,
    /// Voices to request from the engine, most preferred first.
    pub voices: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:8767".into(),
            event_type: "calibration".into(),
            connect_timeout_ms: 300,
            request_timeout_ms: 3000,
            poll_interval_ms: 250,
            utterance_timeout_secs: 60,
            voices: vec!["pf_dora".into(), "pm_alex".into(), "pm_santa".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Empty means ~/.calibra-voice/announcements.json.
    pub state_path: String,
}

impl ThrottleConfig {
    pub fn resolved_path(&self) -> PathBuf {
        if self.state_path.is_empty() {
            JsonFileStore::default_path()
        } else {
            PathBuf::from(&self.state_path)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 8768 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub speech: SpeechConfig,
    pub throttle: ThrottleConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/calibra-voice/config.yaml
    /// 3. /etc/calibra-voice/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/calibra-voice/config.yaml")),
                Some(PathBuf::from("/etc/calibra-voice/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}
