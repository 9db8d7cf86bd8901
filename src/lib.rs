//! Sentinela: environmental hazard monitoring node
//!
//! Offline-first telemetry daemon for temperature / humidity / gas / flame
//! hazard sensors.
//!
//! ## Architecture
//!
//! - **Reading Buffer**: disk-backed FIFO that survives power loss; records
//!   are retired only after the server acknowledges delivery
//! - **Delivery Coordinator**: direct sends with buffered fallback, rate
//!   windows per channel
//! - **Link Manager**: Wi-Fi state machine with bounded, tick-based
//!   association attempts and an access-point configuration mode
//! - **Sensors**: sampling, risk evaluation and alarm actuation behind
//!   pluggable hardware traits

pub mod buffer;
pub mod config;
pub mod control;
pub mod link;
pub mod portal;
pub mod sensors;
pub mod types;
pub mod uplink;

// Re-export node configuration
pub use config::NodeConfig;

// Re-export the durable queue
pub use buffer::{BufferError, OverflowPolicy, ReadingBuffer};

// Re-export commonly used types
pub use types::{ReadingPayload, RemoteCommand, SensorFrame, StatusPayload};

// Re-export uplink components
pub use uplink::{ApiClient, DeliveryCoordinator, ReadingTransport, UplinkError};

// Re-export connectivity
pub use link::{LinkManager, SimulatedWifi, WifiDriver};

// Re-export sensor components
pub use sensors::{AlarmControl, RiskEvaluator, SensorBank, SyntheticSensors};
