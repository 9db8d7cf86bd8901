//! Alarm actuation — buzzer control with a temporary mute window
//!
//! The actuator sits behind [`AlarmSink`] so hardware GPIO, a relay board or
//! the log-only sink used on workstations are interchangeable. Mute state is
//! tick-based: the control loop passes the current instant and the window
//! expires on its own, no explicit unmute required.

use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Pluggable alarm actuator.
pub trait AlarmSink: Send {
    /// Switch the actuator on or off. Must be idempotent.
    fn set_active(&mut self, on: bool);

    /// Sink name for logging.
    fn sink_name(&self) -> &'static str;
}

/// Log-only sink for workstation runs.
pub struct LogAlarm {
    active: bool,
}

impl LogAlarm {
    pub fn new() -> Self {
        Self { active: false }
    }
}

impl Default for LogAlarm {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmSink for LogAlarm {
    fn set_active(&mut self, on: bool) {
        if on && !self.active {
            warn!("ALARM ON");
        } else if !on && self.active {
            info!("Alarm off");
        }
        self.active = on;
    }

    fn sink_name(&self) -> &'static str {
        "Log"
    }
}

/// Drives the alarm actuator from risk verdicts, honoring the mute window.
pub struct AlarmControl {
    sink: Box<dyn AlarmSink>,
    muted_until: Option<Instant>,
    default_mute: Duration,
}

impl AlarmControl {
    pub fn new(sink: Box<dyn AlarmSink>, default_mute: Duration) -> Self {
        Self {
            sink,
            muted_until: None,
            default_mute,
        }
    }

    /// Silence the actuator for the given window (default window when `None`).
    ///
    /// The actuator is switched off immediately.
    pub fn mute(&mut self, now: Instant, duration: Option<Duration>) {
        let window = duration.unwrap_or(self.default_mute);
        self.muted_until = Some(now + window);
        self.sink.set_active(false);
        info!(secs = window.as_secs(), "Alarm muted");
    }

    /// Lift the mute window immediately.
    pub fn reactivate(&mut self) {
        if self.muted_until.take().is_some() {
            info!("Alarm reactivated, will sound on the next risk condition");
        }
    }

    /// True while the mute window is open at `now`.
    ///
    /// An expired window is cleared as a side effect.
    pub fn is_muted(&mut self, now: Instant) -> bool {
        match self.muted_until {
            Some(until) if now < until => true,
            Some(_) => {
                info!("Alarm mute window expired, resuming normal operation");
                self.muted_until = None;
                false
            }
            None => false,
        }
    }

    /// Apply a risk verdict to the actuator: on when at risk and not muted.
    pub fn drive(&mut self, now: Instant, at_risk: bool) {
        let active = at_risk && !self.is_muted(now);
        self.sink.set_active(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that records every state transition for assertions.
    struct RecordingSink {
        state: Arc<Mutex<bool>>,
    }

    impl AlarmSink for RecordingSink {
        fn set_active(&mut self, on: bool) {
            *self.state.lock().unwrap() = on;
        }
        fn sink_name(&self) -> &'static str {
            "Recording"
        }
    }

    fn control_with_probe(mute: Duration) -> (AlarmControl, Arc<Mutex<bool>>) {
        let state = Arc::new(Mutex::new(false));
        let sink = RecordingSink {
            state: Arc::clone(&state),
        };
        (AlarmControl::new(Box::new(sink), mute), state)
    }

    #[test]
    fn test_risk_drives_alarm_on_and_off() {
        let (mut control, probe) = control_with_probe(Duration::from_secs(300));
        let now = Instant::now();

        control.drive(now, true);
        assert!(*probe.lock().unwrap());

        control.drive(now, false);
        assert!(!*probe.lock().unwrap());
    }

    #[test]
    fn test_mute_suppresses_recurring_risk_until_expiry() {
        let (mut control, probe) = control_with_probe(Duration::from_secs(300));
        let t0 = Instant::now();

        control.mute(t0, None);
        control.drive(t0 + Duration::from_secs(10), true);
        assert!(!*probe.lock().unwrap(), "risk during mute stays silent");

        control.drive(t0 + Duration::from_secs(299), true);
        assert!(!*probe.lock().unwrap(), "still inside the window");

        // After expiry the actuator resumes without an explicit reactivate
        control.drive(t0 + Duration::from_secs(301), true);
        assert!(*probe.lock().unwrap(), "alarm resumes after expiry");
    }

    #[test]
    fn test_explicit_reactivate_lifts_mute_early() {
        let (mut control, probe) = control_with_probe(Duration::from_secs(300));
        let t0 = Instant::now();

        control.mute(t0, None);
        control.reactivate();
        control.drive(t0 + Duration::from_secs(1), true);
        assert!(*probe.lock().unwrap());
    }

    #[test]
    fn test_mute_accepts_custom_duration() {
        let (mut control, probe) = control_with_probe(Duration::from_secs(300));
        let t0 = Instant::now();

        control.mute(t0, Some(Duration::from_secs(30)));
        control.drive(t0 + Duration::from_secs(29), true);
        assert!(!*probe.lock().unwrap());
        control.drive(t0 + Duration::from_secs(31), true);
        assert!(*probe.lock().unwrap());
    }

    #[test]
    fn test_mute_switches_actuator_off_immediately() {
        let (mut control, probe) = control_with_probe(Duration::from_secs(300));
        let t0 = Instant::now();

        control.drive(t0, true);
        assert!(*probe.lock().unwrap());

        control.mute(t0, None);
        assert!(!*probe.lock().unwrap());
    }
}
