//! Risk evaluation — per-channel threshold breaches OR'd into one verdict

use crate::config::ThresholdConfig;
use crate::types::SensorFrame;
use tracing::warn;

/// Per-channel breach flags for one evaluated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskVerdict {
    pub temperature_breach: bool,
    pub humidity_breach: bool,
    pub gas_breach: bool,
    pub flame_breach: bool,
}

impl RiskVerdict {
    /// True when any channel breached its threshold.
    pub fn is_risk(&self) -> bool {
        self.temperature_breach || self.humidity_breach || self.gas_breach || self.flame_breach
    }
}

/// Evaluates sampled frames against the configured hazard thresholds.
///
/// Channels holding the fault sentinel never count as a breach: a broken
/// sensor must not raise the alarm.
#[derive(Debug, Clone)]
pub struct RiskEvaluator {
    thresholds: ThresholdConfig,
}

impl RiskEvaluator {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    /// Evaluate one frame. Breaches are logged per channel.
    pub fn evaluate(&self, frame: &SensorFrame) -> RiskVerdict {
        let verdict = RiskVerdict {
            temperature_breach: !frame.temperature_faulted()
                && frame.temperature_c > self.thresholds.temperature_limit_c,
            humidity_breach: !frame.humidity_faulted()
                && frame.humidity_pct > self.thresholds.humidity_limit_pct,
            gas_breach: frame.gas_level > self.thresholds.gas_limit,
            flame_breach: frame.flame_detected,
        };

        if verdict.temperature_breach {
            warn!(
                temperature = frame.temperature_c,
                limit = self.thresholds.temperature_limit_c,
                "RISK: temperature above limit"
            );
        }
        if verdict.humidity_breach {
            warn!(
                humidity = frame.humidity_pct,
                limit = self.thresholds.humidity_limit_pct,
                "RISK: humidity above limit"
            );
        }
        if verdict.gas_breach {
            warn!(
                gas = frame.gas_level,
                limit = self.thresholds.gas_limit,
                "RISK: gas level above limit"
            );
        }
        if verdict.flame_breach {
            warn!("RISK: flame detected");
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::SENSOR_FAULT;

    fn evaluator() -> RiskEvaluator {
        RiskEvaluator::new(ThresholdConfig::default())
    }

    fn calm_frame() -> SensorFrame {
        SensorFrame {
            temperature_c: 22.0,
            humidity_pct: 50.0,
            gas_level: 100,
            flame_detected: false,
        }
    }

    #[test]
    fn test_no_breach_is_no_risk() {
        let verdict = evaluator().evaluate(&calm_frame());
        assert!(!verdict.is_risk());
        assert_eq!(verdict, RiskVerdict::default());
    }

    #[test]
    fn test_temperature_breach_alone_triggers_risk() {
        let frame = SensorFrame {
            temperature_c: 35.0,
            ..calm_frame()
        };
        let verdict = evaluator().evaluate(&frame);
        assert!(verdict.is_risk());
        assert!(verdict.temperature_breach);
        assert!(!verdict.humidity_breach);
        assert!(!verdict.gas_breach);
        assert!(!verdict.flame_breach);
    }

    #[test]
    fn test_each_channel_triggers_independently() {
        let e = evaluator();

        let humid = SensorFrame {
            humidity_pct: 85.0,
            ..calm_frame()
        };
        assert!(e.evaluate(&humid).humidity_breach);

        let gassy = SensorFrame {
            gas_level: 500,
            ..calm_frame()
        };
        assert!(e.evaluate(&gassy).gas_breach);

        let burning = SensorFrame {
            flame_detected: true,
            ..calm_frame()
        };
        assert!(e.evaluate(&burning).flame_breach);
    }

    #[test]
    fn test_fault_sentinel_never_breaches() {
        // -999.0 must not be compared as a real extreme value, and a faulted
        // channel must not suppress other channels' breaches.
        let frame = SensorFrame {
            temperature_c: SENSOR_FAULT,
            humidity_pct: SENSOR_FAULT,
            gas_level: 500,
            flame_detected: false,
        };
        let verdict = evaluator().evaluate(&frame);
        assert!(!verdict.temperature_breach);
        assert!(!verdict.humidity_breach);
        assert!(verdict.gas_breach);
        assert!(verdict.is_risk());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let at_limit = SensorFrame {
            temperature_c: 30.0,
            ..calm_frame()
        };
        assert!(!evaluator().evaluate(&at_limit).is_risk());
    }
}
