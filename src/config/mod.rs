//! Node Configuration Module
//!
//! Per-node configuration loaded from a TOML file, replacing hardcoded
//! endpoints, thresholds and timers with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `SENTINELA_CONFIG` environment variable (path to TOML file)
//! 2. `node_config.toml` in the current working directory
//! 3. Built-in defaults

mod node_config;

pub mod credentials;
pub mod defaults;

pub use credentials::WifiCredentials;
pub use node_config::{
    AlarmConfig, ApiConfig, BufferConfig, ConfigError, LinkConfig, NodeConfig, ThresholdConfig,
    TimerConfig,
};
