//! Control Loop — single cooperative task driving every subsystem
//!
//! One tokio task owns all mutable node state and advances it on a fixed
//! tick, comparing independently tracked deadlines against the current
//! instant: link servicing, sensor sampling, reading publication, buffer
//! draining, status reports and command polling each run on their own
//! cadence. Nothing blocks beyond one tick, so a stalled subsystem can only
//! ever delay work by one scheduling round.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::ReadingBuffer;
use crate::link::LinkManager;
use crate::sensors::{frame_from_raw, AlarmControl, RiskEvaluator, SensorBank};
use crate::types::{ReadingPayload, RemoteCommand, SensorFrame, StatusPayload};
use crate::uplink::{ApiClient, DeliveryCoordinator, RateWindow};

/// Scheduling tick. Matches the finest association poll granularity so link
/// attempts advance on time.
const TICK: Duration = Duration::from_millis(200);

/// All state owned by the control loop.
pub struct ControlLoop {
    device_id: String,
    bank: Box<dyn SensorBank>,
    evaluator: RiskEvaluator,
    alarm: AlarmControl,
    link: LinkManager,
    /// `None` when the data directory could not be opened at boot; the node
    /// then runs degraded with no persistence.
    buffer: Option<ReadingBuffer>,
    coordinator: DeliveryCoordinator<ApiClient>,
    client: ApiClient,

    sample_window: RateWindow,
    publish_window: RateWindow,
    status_window: RateWindow,
    command_window: RateWindow,

    last_frame: Option<SensorFrame>,
    boot: Instant,
}

/// Cadence settings for the loop's rate-limited channels.
pub struct LoopTimers {
    pub sample_interval: Duration,
    pub reading_interval: Duration,
    pub status_interval: Duration,
    pub command_poll_interval: Duration,
}

impl ControlLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_id: String,
        bank: Box<dyn SensorBank>,
        evaluator: RiskEvaluator,
        alarm: AlarmControl,
        link: LinkManager,
        buffer: Option<ReadingBuffer>,
        coordinator: DeliveryCoordinator<ApiClient>,
        client: ApiClient,
        timers: &LoopTimers,
    ) -> Self {
        Self {
            device_id,
            bank,
            evaluator,
            alarm,
            link,
            buffer,
            coordinator,
            client,
            sample_window: RateWindow::new(timers.sample_interval),
            publish_window: RateWindow::new(timers.reading_interval),
            status_window: RateWindow::new(timers.status_interval),
            command_window: RateWindow::new(timers.command_poll_interval),
            last_frame: None,
            boot: Instant::now(),
        }
    }

    /// Run until the shutdown token trips.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            device_id = %self.device_id,
            bank = self.bank.bank_name(),
            persistence = self.buffer.is_some(),
            "Control loop starting"
        );

        self.link.start_initial_attempt(Instant::now());

        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Control loop shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            self.link.service(now);
            self.sample_and_alarm(now);
            self.publish_reading(now).await;
            self.drain_backlog(now).await;
            self.report_status(now).await;
            self.poll_commands(now).await;
        }
    }

    /// Sample sensors, evaluate risk and drive the alarm on the sampling
    /// cadence.
    fn sample_and_alarm(&mut self, now: Instant) {
        if !self.sample_window.ready(now) {
            return;
        }
        self.sample_window.mark(now);

        let raw = self.bank.sample();
        let frame = frame_from_raw(&raw);
        let verdict = self.evaluator.evaluate(&frame);
        self.alarm.drive(now, verdict.is_risk());
        self.last_frame = Some(frame);
    }

    /// Publish the latest frame on the reading cadence.
    async fn publish_reading(&mut self, now: Instant) {
        if !self.publish_window.ready(now) {
            return;
        }
        let Some(frame) = self.last_frame else {
            return;
        };
        self.publish_window.mark(now);

        let payload = ReadingPayload::from_frame(&self.device_id, &frame);
        let record = match payload.to_buffer_line() {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to serialize reading");
                return;
            }
        };

        let link_up = self.link.is_connected();
        let outcome = match &self.buffer {
            Some(buffer) => {
                self.coordinator
                    .deliver_or_buffer(buffer, &record, link_up, now)
                    .await
            }
            None => self.coordinator.deliver_volatile(&record, link_up, now).await,
        };
        debug!(?outcome, "Reading published");
    }

    async fn drain_backlog(&mut self, now: Instant) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        let retired = self
            .coordinator
            .drain(buffer, self.link.is_connected(), now)
            .await;
        if retired > 0 {
            info!(retired, "Backlog drained");
        }
    }

    /// Send the periodic status report on its own window.
    async fn report_status(&mut self, now: Instant) {
        if !self.link.is_connected() || !self.status_window.ready(now) {
            return;
        }
        self.status_window.mark(now);

        let station = self.link.station_info();
        let buffered = self
            .buffer
            .as_ref()
            .and_then(|b| b.count().ok())
            .unwrap_or(0);

        let status = StatusPayload {
            device_id: self.device_id.clone(),
            ip_address: station
                .as_ref()
                .map_or_else(|| "0.0.0.0".to_string(), |s| s.ip_address.clone()),
            rssi: station.as_ref().map_or(0, |s| s.rssi),
            uptime: crate::types::format_uptime(now.duration_since(self.boot).as_secs()),
            // No heap telemetry on hosted builds; reported as zero.
            free_heap: 0,
            buffered_messages: buffered,
            wifi_reconnects: self.link.reconnect_count(),
            timestamp: crate::types::iso8601_now(),
        };

        match self.client.post_status(&status).await {
            Ok(()) => debug!("Status report delivered"),
            Err(e) => warn!(error = %e, "Status report failed"),
        }
    }

    /// Poll the remote command queue on its own window and dispatch.
    async fn poll_commands(&mut self, now: Instant) {
        if !self.link.is_connected() || !self.command_window.ready(now) {
            return;
        }
        self.command_window.mark(now);

        match self.client.poll_commands(&self.device_id).await {
            Ok(commands) => {
                for command in &commands {
                    apply_command(&mut self.alarm, command, now);
                }
            }
            Err(e) => warn!(error = %e, "Command poll failed"),
        }
    }
}

/// Dispatch one remote command to the alarm subsystem.
pub fn apply_command(alarm: &mut AlarmControl, command: &RemoteCommand, now: Instant) {
    match command.comando.as_str() {
        "silenciar_buzzer" => {
            let duration = command.duracao_ms.map(Duration::from_millis);
            alarm.mute(now, duration);
        }
        "reativar_buzzer" => alarm.reactivate(),
        other => warn!(command = other, "Unknown remote command ignored"),
    }
}
