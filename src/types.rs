//! Core data types shared across the node
//!
//! Wire payloads are fixed-schema serde structs; the field names mirror the
//! remote API contract exactly (`temperatura`, `umidade`, `nivel_gas`,
//! `chama_detectada`) and must not be renamed.

use crate::config::defaults::SENSOR_FAULT;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Sensor Frame
// ============================================================================

/// One sampled snapshot of every hazard channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Temperature in °C, or [`SENSOR_FAULT`] when the sensor read failed
    pub temperature_c: f64,
    /// Relative humidity in %, or [`SENSOR_FAULT`] when the sensor read failed
    pub humidity_pct: f64,
    /// Gas concentration proxy (raw ADC counts)
    pub gas_level: i64,
    /// Flame presence flag
    pub flame_detected: bool,
}

impl SensorFrame {
    /// True when the thermal channel holds the fault sentinel.
    pub fn temperature_faulted(&self) -> bool {
        (self.temperature_c - SENSOR_FAULT).abs() < f64::EPSILON
    }

    /// True when the humidity channel holds the fault sentinel.
    pub fn humidity_faulted(&self) -> bool {
        (self.humidity_pct - SENSOR_FAULT).abs() < f64::EPSILON
    }
}

// ============================================================================
// Wire Payloads
// ============================================================================

/// Reading upload body (`POST <readings endpoint>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingPayload {
    /// Device identifier
    pub device_id: String,
    /// ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SSZ`)
    pub timestamp: String,
    /// Sampled channel values
    pub data: ReadingData,
}

/// Nested sensor data object of [`ReadingPayload`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingData {
    pub temperatura: f64,
    pub umidade: f64,
    pub nivel_gas: i64,
    pub chama_detectada: bool,
}

impl ReadingPayload {
    /// Build a payload from a sensor frame, stamped with the current UTC time.
    pub fn from_frame(device_id: &str, frame: &SensorFrame) -> Self {
        Self {
            device_id: device_id.to_string(),
            timestamp: iso8601_now(),
            data: ReadingData {
                temperatura: frame.temperature_c,
                umidade: frame.humidity_pct,
                nivel_gas: frame.gas_level,
                chama_detectada: frame.flame_detected,
            },
        }
    }

    /// Serialize to the single-line JSON form stored in the reading buffer.
    ///
    /// `serde_json::to_string` never emits raw newlines, which keeps the
    /// buffer's one-record-per-line invariant.
    pub fn to_buffer_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Node status report body (`POST <status endpoint>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub device_id: String,
    pub ip_address: String,
    pub rssi: i32,
    /// Uptime formatted `HH:MM:SS` (hours are not capped at two digits)
    pub uptime: String,
    pub free_heap: u64,
    pub buffered_messages: usize,
    pub wifi_reconnects: u32,
    pub timestamp: String,
}

/// A command fetched from the remote command queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Command verb, e.g. `silenciar_buzzer` or `reativar_buzzer`
    pub comando: String,
    /// Optional mute duration override in milliseconds
    #[serde(default)]
    pub duracao_ms: Option<u64>,
}

// ============================================================================
// Time Helpers
// ============================================================================

/// Current UTC time formatted ISO-8601 (`YYYY-MM-DDTHH:MM:SSZ`).
pub fn iso8601_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format an uptime in seconds as `HH:MM:SS`.
pub fn format_uptime(uptime_secs: u64) -> String {
    let hours = uptime_secs / 3600;
    let mins = (uptime_secs % 3600) / 60;
    let secs = uptime_secs % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}
