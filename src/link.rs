//! Link Manager — Wi-Fi connectivity state machine
//!
//! Maintains a `Disconnected ⇄ Connected` state pair plus an `AccessPoint`
//! mode that suppresses outbound reconnection entirely. Association attempts
//! are bounded polling loops expressed as tick deadlines, never sleeps, so
//! the control loop stays responsive while an attempt is in flight.
//!
//! The radio itself sits behind [`WifiDriver`] so the manager can be driven
//! by real hardware or a scripted fake in tests.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::defaults::{
    INITIAL_ASSOC_POLLS, INITIAL_ASSOC_POLL_MS, RECONNECT_ASSOC_POLLS, RECONNECT_ASSOC_POLL_MS,
};
use crate::config::WifiCredentials;

/// Station-side details of an established link.
#[derive(Debug, Clone)]
pub struct StationInfo {
    pub ip_address: String,
    pub rssi: i32,
    pub mac_address: String,
}

/// Pluggable Wi-Fi radio driver.
pub trait WifiDriver: Send {
    /// Start associating with the given network. Non-blocking.
    fn begin(&mut self, ssid: &str, password: &str);

    /// Current link status as reported by the network stack.
    fn is_connected(&self) -> bool;

    /// Tear down any association in progress.
    fn disconnect(&mut self);

    /// Details of the current association, if connected.
    fn station_info(&self) -> Option<StationInfo>;

    /// Station MAC address (available regardless of link state).
    fn mac_address(&self) -> String;
}

/// An association attempt in flight: bounded polls on a fixed tick interval.
#[derive(Debug, Clone, Copy)]
struct AssocAttempt {
    /// Initial boot attempt (verbose, longer) vs periodic reconnect (quiet)
    initial: bool,
    polls_left: u32,
    poll_interval: Duration,
    next_poll_at: Instant,
}

#[derive(Debug, Clone, Copy)]
enum LinkState {
    Disconnected,
    Associating(AssocAttempt),
    Connected,
    AccessPoint,
}

/// Connectivity manager. All mutation happens from the control loop.
pub struct LinkManager {
    driver: Box<dyn WifiDriver>,
    state: LinkState,
    credentials: Option<WifiCredentials>,
    reconnect_cooldown: Duration,
    last_reconnect_attempt: Option<Instant>,
    reconnect_count: u32,
}

impl LinkManager {
    /// Create a manager in station mode.
    pub fn new(
        driver: Box<dyn WifiDriver>,
        credentials: Option<WifiCredentials>,
        reconnect_cooldown: Duration,
    ) -> Self {
        Self {
            driver,
            state: LinkState::Disconnected,
            credentials,
            reconnect_cooldown,
            last_reconnect_attempt: None,
            reconnect_count: 0,
        }
    }

    /// Create a manager pinned to access-point mode: no outbound attempts.
    pub fn access_point(driver: Box<dyn WifiDriver>) -> Self {
        Self {
            driver,
            state: LinkState::AccessPoint,
            credentials: None,
            reconnect_cooldown: Duration::ZERO,
            last_reconnect_attempt: None,
            reconnect_count: 0,
        }
    }

    /// Kick off the initial association attempt (verbose, longer timeout).
    ///
    /// No-op without credentials or in access-point mode.
    pub fn start_initial_attempt(&mut self, now: Instant) {
        if matches!(self.state, LinkState::AccessPoint) {
            return;
        }
        let Some(creds) = self.credentials.clone() else {
            info!("No SSID configured, skipping initial connection attempt");
            return;
        };
        if creds.is_empty() {
            info!("No SSID configured, skipping initial connection attempt");
            return;
        }

        info!(ssid = %creds.ssid, "Connecting to Wi-Fi");
        self.begin_attempt(&creds, true, now);
    }

    /// Advance the state machine by one tick.
    pub fn service(&mut self, now: Instant) {
        match self.state {
            LinkState::AccessPoint => {}
            LinkState::Connected => {
                // Passive disconnect detection only; the stack's own state
                // is the single source of truth.
                if !self.driver.is_connected() {
                    warn!("Wi-Fi connection lost");
                    self.state = LinkState::Disconnected;
                }
            }
            LinkState::Associating(attempt) => self.service_attempt(attempt, now),
            LinkState::Disconnected => self.maybe_reconnect(now),
        }
    }

    fn service_attempt(&mut self, mut attempt: AssocAttempt, now: Instant) {
        if now < attempt.next_poll_at {
            return;
        }

        if self.driver.is_connected() {
            if attempt.initial {
                if let Some(info) = self.driver.station_info() {
                    info!(ip = %info.ip_address, "Connected to Wi-Fi");
                } else {
                    info!("Connected to Wi-Fi");
                }
            } else {
                // Only reconnects (not the boot attempt) count.
                self.reconnect_count += 1;
                info!(
                    reconnects = self.reconnect_count,
                    "Reconnected to Wi-Fi"
                );
            }
            self.state = LinkState::Connected;
            return;
        }

        attempt.polls_left -= 1;
        if attempt.polls_left == 0 {
            if attempt.initial {
                warn!("Initial Wi-Fi connection attempt failed");
            }
            // Reconnect failures stay silent to avoid flooding diagnostics.
            self.driver.disconnect();
            self.state = LinkState::Disconnected;
            return;
        }

        attempt.next_poll_at = now + attempt.poll_interval;
        if attempt.initial {
            debug!(polls_left = attempt.polls_left, "Waiting for association");
        }
        self.state = LinkState::Associating(attempt);
    }

    fn maybe_reconnect(&mut self, now: Instant) {
        let Some(creds) = self.credentials.clone() else {
            return;
        };
        if creds.is_empty() {
            return;
        }

        let cooldown_over = self
            .last_reconnect_attempt
            .is_none_or(|last| now.duration_since(last) >= self.reconnect_cooldown);
        if !cooldown_over {
            return;
        }

        self.last_reconnect_attempt = Some(now);
        debug!("Attempting Wi-Fi reconnection");
        self.begin_attempt(&creds, false, now);
    }

    fn begin_attempt(&mut self, creds: &WifiCredentials, initial: bool, now: Instant) {
        self.driver.begin(&creds.ssid, &creds.password);
        let (polls, interval_ms) = if initial {
            (INITIAL_ASSOC_POLLS, INITIAL_ASSOC_POLL_MS)
        } else {
            (RECONNECT_ASSOC_POLLS, RECONNECT_ASSOC_POLL_MS)
        };
        self.state = LinkState::Associating(AssocAttempt {
            initial,
            polls_left: polls,
            poll_interval: Duration::from_millis(interval_ms),
            next_poll_at: now,
        });
    }

    /// Liveness predicate consumed by the delivery coordinator.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected)
    }

    /// True in local configuration mode.
    pub fn in_access_point_mode(&self) -> bool {
        matches!(self.state, LinkState::AccessPoint)
    }

    /// Successful reconnections since boot (initial attempt excluded).
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }

    /// Station details of the current association.
    pub fn station_info(&self) -> Option<StationInfo> {
        self.driver.station_info()
    }

    /// Station MAC address, used as the default device id.
    pub fn mac_address(&self) -> String {
        self.driver.mac_address()
    }
}

// ============================================================================
// Simulated Driver
// ============================================================================

/// Radio stand-in for workstation runs: associates after a fixed number of
/// status polls and never drops the link on its own.
pub struct SimulatedWifi {
    polls_until_connected: u32,
    polls_seen: std::sync::atomic::AtomicU32,
    associating: std::sync::atomic::AtomicBool,
}

impl SimulatedWifi {
    pub fn new(polls_until_connected: u32) -> Self {
        Self {
            polls_until_connected,
            polls_seen: std::sync::atomic::AtomicU32::new(0),
            associating: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl WifiDriver for SimulatedWifi {
    fn begin(&mut self, _ssid: &str, _password: &str) {
        use std::sync::atomic::Ordering;
        self.associating.store(true, Ordering::SeqCst);
        self.polls_seen.store(0, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        use std::sync::atomic::Ordering;
        if !self.associating.load(Ordering::SeqCst) {
            return false;
        }
        // Each status poll advances the simulated association.
        let seen = self.polls_seen.fetch_add(1, Ordering::SeqCst) + 1;
        seen >= self.polls_until_connected
    }

    fn disconnect(&mut self) {
        use std::sync::atomic::Ordering;
        self.associating.store(false, Ordering::SeqCst);
        self.polls_seen.store(0, Ordering::SeqCst);
    }

    fn station_info(&self) -> Option<StationInfo> {
        self.is_connected().then(|| StationInfo {
            ip_address: "192.168.4.10".to_string(),
            rssi: -58,
            mac_address: self.mac_address(),
        })
    }

    fn mac_address(&self) -> String {
        "02:00:00:AB:CD:EF".to_string()
    }
}
