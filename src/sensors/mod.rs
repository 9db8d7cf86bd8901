//! Sensor sampling — hazard channel acquisition behind a pluggable bank
//!
//! The [`SensorBank`] trait abstracts the physical sensors (DHT22 thermal /
//! humidity combo, MQ-2 gas ADC, digital flame detector) so the node can run
//! against real hardware drivers or the synthetic bank on a workstation.
//!
//! Invalid thermal/humidity reads are mapped to the fault sentinel here, at
//! the acquisition boundary, so downstream code never sees a missing value.

pub mod alarm;
pub mod risk;

pub use alarm::{AlarmControl, AlarmSink, LogAlarm};
pub use risk::{RiskEvaluator, RiskVerdict};

use crate::config::defaults::SENSOR_FAULT;
use crate::types::SensorFrame;
use tracing::{debug, warn};

/// Raw channel values straight from a sensor bank.
///
/// Thermal and humidity reads can fail (a flaky one-wire bus is normal for
/// the DHT22); the gas ADC and flame pin always produce a value.
#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    /// Temperature in °C, `None` on a failed read
    pub temperature_c: Option<f64>,
    /// Relative humidity in %, `None` on a failed read
    pub humidity_pct: Option<f64>,
    /// Gas concentration proxy (raw ADC counts)
    pub gas_level: i64,
    /// Flame presence flag
    pub flame_detected: bool,
}

/// Pluggable hazard sensor bank.
pub trait SensorBank: Send {
    /// Sample every channel once.
    fn sample(&mut self) -> RawSample;

    /// Bank name for logging.
    fn bank_name(&self) -> &'static str;
}

/// Convert a raw sample into a frame, substituting the fault sentinel for
/// failed thermal/humidity reads.
pub fn frame_from_raw(raw: &RawSample) -> SensorFrame {
    if raw.temperature_c.is_none() || raw.humidity_pct.is_none() {
        warn!("Thermal sensor read failed, substituting fault sentinel");
    }
    let frame = SensorFrame {
        temperature_c: raw.temperature_c.unwrap_or(SENSOR_FAULT),
        humidity_pct: raw.humidity_pct.unwrap_or(SENSOR_FAULT),
        gas_level: raw.gas_level,
        flame_detected: raw.flame_detected,
    };
    debug!(
        temperature = frame.temperature_c,
        humidity = frame.humidity_pct,
        gas = frame.gas_level,
        flame = frame.flame_detected,
        "Sensors sampled"
    );
    frame
}

// ============================================================================
// Synthetic Bank
// ============================================================================

/// Simulated sensor bank for workstation runs and tests.
///
/// Produces plausible ambient values with small random jitter. When a hazard
/// onset tick is configured, gas level and flame detection ramp into breach
/// territory from that sample onward so the full alarm path can be exercised
/// without hardware.
pub struct SyntheticSensors {
    tick: u64,
    hazard_after: Option<u64>,
    /// Every Nth thermal read fails, exercising the sentinel path. 0 = never.
    fault_every: u64,
}

impl SyntheticSensors {
    /// Steady ambient conditions, no injected faults.
    pub fn new() -> Self {
        Self {
            tick: 0,
            hazard_after: None,
            fault_every: 0,
        }
    }

    /// Ambient conditions that turn hazardous after `onset_tick` samples.
    pub fn with_hazard_after(onset_tick: u64) -> Self {
        Self {
            tick: 0,
            hazard_after: Some(onset_tick),
            fault_every: 50,
        }
    }
}

impl Default for SyntheticSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBank for SyntheticSensors {
    fn sample(&mut self) -> RawSample {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        self.tick += 1;

        let hazardous = self.hazard_after.is_some_and(|onset| self.tick > onset);
        let thermal_fault = self.fault_every > 0 && self.tick % self.fault_every == 0;

        let (temperature, humidity) = if thermal_fault {
            (None, None)
        } else if hazardous {
            (
                Some(38.0 + rng.gen_range(-1.0..4.0)),
                Some(45.0 + rng.gen_range(-3.0..3.0)),
            )
        } else {
            (
                Some(23.0 + rng.gen_range(-1.5..1.5)),
                Some(52.0 + rng.gen_range(-4.0..4.0)),
            )
        };

        RawSample {
            temperature_c: temperature,
            humidity_pct: humidity,
            gas_level: if hazardous {
                rng.gen_range(450..900)
            } else {
                rng.gen_range(80..180)
            },
            flame_detected: hazardous && rng.gen_bool(0.3),
        }
    }

    fn bank_name(&self) -> &'static str {
        "Synthetic"
    }
}
