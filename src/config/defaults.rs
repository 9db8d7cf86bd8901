//! System-wide default constants.
//!
//! Centralises magic numbers that would otherwise scatter across the
//! codebase. Grouped by subsystem for easy discovery.

// ============================================================================
// Reading Buffer
// ============================================================================

/// Maximum number of readings held in the disk buffer.
///
/// The buffer file is rewritten in full on every head removal, so the limit
/// must stay small enough that compaction stays cheap.
pub const BUFFER_LIMIT: usize = 100;

/// Canonical buffer file name inside the data directory.
pub const BUFFER_FILE_NAME: &str = "buffer_leituras.txt";

/// Temporary file name used during head-removal compaction.
pub const BUFFER_TEMP_FILE_NAME: &str = "buffer_temp.txt";

// ============================================================================
// Uplink
// ============================================================================

/// Minimum interval between reading uploads (seconds).
pub const READING_UPLOAD_INTERVAL_SECS: u64 = 30;

/// Minimum interval between status reports (seconds). 300 = 5 minutes.
pub const STATUS_UPLOAD_INTERVAL_SECS: u64 = 300;

/// Minimum interval between remote command polls (seconds).
pub const COMMAND_POLL_INTERVAL_SECS: u64 = 60;

/// HTTP client timeout for API requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Connectivity
// ============================================================================

/// Cooldown between reconnection attempts while disconnected (seconds).
pub const RECONNECT_COOLDOWN_SECS: u64 = 30;

/// Poll iterations for the initial association attempt.
pub const INITIAL_ASSOC_POLLS: u32 = 20;

/// Delay between polls during the initial association attempt (ms).
pub const INITIAL_ASSOC_POLL_MS: u64 = 500;

/// Poll iterations for a periodic reconnection attempt.
///
/// Shorter than the initial attempt so a flapping link cannot stall the
/// control loop for long.
pub const RECONNECT_ASSOC_POLLS: u32 = 10;

/// Delay between polls during a reconnection attempt (ms).
pub const RECONNECT_ASSOC_POLL_MS: u64 = 200;

// ============================================================================
// Sensors & Alarm
// ============================================================================

/// Sensor sampling cadence (seconds).
pub const SAMPLE_INTERVAL_SECS: u64 = 5;

/// Temperature breach threshold (°C).
pub const TEMPERATURE_LIMIT_C: f64 = 30.0;

/// Humidity breach threshold (%RH).
pub const HUMIDITY_LIMIT_PCT: f64 = 70.0;

/// Gas concentration breach threshold (raw ADC counts).
pub const GAS_LIMIT: i64 = 400;

/// Sentinel substituted for invalid thermal/humidity readings.
///
/// Downstream consumers must treat this as "channel faulted, do not alarm",
/// never as a valid extreme value.
pub const SENSOR_FAULT: f64 = -999.0;

/// Default alarm mute duration (seconds). 300 = 5 minutes.
pub const ALARM_MUTE_SECS: u64 = 300;

// ============================================================================
// Files
// ============================================================================

/// Wi-Fi credentials file name inside the data directory (two lines:
/// SSID, then password).
pub const CREDENTIALS_FILE_NAME: &str = "wifi.txt";
