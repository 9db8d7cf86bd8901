//! Node configuration — endpoints, thresholds and timers as TOML values
//!
//! Every struct implements `Default` with values matching the constants in
//! [`super::defaults`], so behavior is unchanged when no config file is
//! present.

use super::defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root configuration for a monitoring node deployment.
///
/// Load with [`NodeConfig::load`], which searches:
/// 1. `$SENTINELA_CONFIG` env var
/// 2. `./node_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Remote API endpoints and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Hazard detection thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Reading buffer sizing
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Upload / poll cadence
    #[serde(default)]
    pub timers: TimerConfig,

    /// Wi-Fi link management
    #[serde(default)]
    pub link: LinkConfig,

    /// Alarm actuation
    #[serde(default)]
    pub alarm: AlarmConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            thresholds: ThresholdConfig::default(),
            buffer: BufferConfig::default(),
            timers: TimerConfig::default(),
            link: LinkConfig::default(),
            alarm: AlarmConfig::default(),
        }
    }
}

/// Remote API endpoints and the static bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Reading upload endpoint (HTTP POST)
    pub readings_endpoint: String,
    /// Status report endpoint (HTTP POST)
    pub status_endpoint: String,
    /// Command poll base URL; the device id is appended as a path segment
    pub commands_endpoint: String,
    /// Static bearer token sent on every request
    pub token: String,
    /// Device identifier; empty = derive from the station MAC address
    #[serde(default)]
    pub device_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            readings_endpoint: "http://localhost:8080/api/dados".to_string(),
            status_endpoint: "http://localhost:8080/api/status".to_string(),
            commands_endpoint: "http://localhost:8080/api/comandos".to_string(),
            token: String::new(),
            device_id: String::new(),
        }
    }
}

/// Per-channel hazard thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Temperature breach threshold (°C)
    pub temperature_limit_c: f64,
    /// Humidity breach threshold (%RH)
    pub humidity_limit_pct: f64,
    /// Gas concentration breach threshold (raw ADC counts)
    pub gas_limit: i64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature_limit_c: defaults::TEMPERATURE_LIMIT_C,
            humidity_limit_pct: defaults::HUMIDITY_LIMIT_PCT,
            gas_limit: defaults::GAS_LIMIT,
        }
    }
}

/// Reading buffer sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Maximum number of buffered readings
    pub limit: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            limit: defaults::BUFFER_LIMIT,
        }
    }
}

/// Upload, poll and sampling cadence (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Sensor sampling cadence
    pub sample_interval_secs: u64,
    /// Minimum interval between reading uploads
    pub reading_interval_secs: u64,
    /// Minimum interval between status reports
    pub status_interval_secs: u64,
    /// Minimum interval between remote command polls
    pub command_poll_interval_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: defaults::SAMPLE_INTERVAL_SECS,
            reading_interval_secs: defaults::READING_UPLOAD_INTERVAL_SECS,
            status_interval_secs: defaults::STATUS_UPLOAD_INTERVAL_SECS,
            command_poll_interval_secs: defaults::COMMAND_POLL_INTERVAL_SECS,
        }
    }
}

/// Wi-Fi link management tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Cooldown between reconnection attempts while disconnected (seconds)
    pub reconnect_cooldown_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect_cooldown_secs: defaults::RECONNECT_COOLDOWN_SECS,
        }
    }
}

/// Alarm actuation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Default mute duration (seconds)
    pub mute_secs: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            mute_secs: defaults::ALARM_MUTE_SECS,
        }
    }
}

impl NodeConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SENTINELA_CONFIG` environment variable
    /// 2. `./node_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("SENTINELA_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded node config from SENTINELA_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SENTINELA_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SENTINELA_CONFIG points to non-existent file, falling back");
            }
        }

        let local = Path::new("node_config.toml");
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded node config");
                    return config;
                }
                Err(e) => {
                    warn!(path = %local.display(), error = %e, "Failed to load local config, using defaults");
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and parse a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        Ok(config)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(String, String),
    #[error("failed to parse {0}: {1}")]
    Parse(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = NodeConfig::default();
        assert_eq!(config.buffer.limit, defaults::BUFFER_LIMIT);
        assert_eq!(config.timers.reading_interval_secs, 30);
        assert_eq!(config.timers.status_interval_secs, 300);
        assert_eq!(config.timers.command_poll_interval_secs, 60);
        assert!((config.thresholds.temperature_limit_c - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_src = r#"
            [api]
            readings_endpoint = "http://example.invalid/api/dados"
            status_endpoint = "http://example.invalid/api/status"
            commands_endpoint = "http://example.invalid/api/comandos"
            token = "secret"

            [thresholds]
            temperature_limit_c = 45.0
            humidity_limit_pct = 80.0
            gas_limit = 500
        "#;
        let config: NodeConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.api.token, "secret");
        assert!((config.thresholds.temperature_limit_c - 45.0).abs() < f64::EPSILON);
        // Unspecified sections fall back to defaults
        assert_eq!(config.buffer.limit, defaults::BUFFER_LIMIT);
        assert_eq!(config.link.reconnect_cooldown_secs, 30);
    }
}
