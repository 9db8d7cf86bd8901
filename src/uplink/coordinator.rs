//! Delivery Coordinator — decides when the head of the buffer goes out
//!
//! Fresh readings try a direct send while the link is up and no backlog is
//! pending; otherwise they land in the disk buffer so delivery order stays
//! strictly FIFO. Buffered readings drain in a burst once per rate window,
//! and a record is only removed from the buffer after the server
//! acknowledged it. On a transmission failure the head stays put and the
//! drain stops until the next scheduling tick — no busy retry.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::buffer::{BufferError, ReadingBuffer};
use crate::uplink::client::ReadingTransport;

/// Minimum-interval gate over control-loop tick instants.
///
/// Each rate-limited channel (readings, status, command polls) owns its own
/// window; the budgets are independent.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    interval: Duration,
    last: Option<Instant>,
}

impl RateWindow {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when the interval has elapsed since the last `mark` (or when
    /// nothing has been marked yet).
    pub fn ready(&self, now: Instant) -> bool {
        self.last
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }

    /// Record that the channel was used at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

/// Outcome of handing a fresh reading to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Server acknowledged the reading.
    Sent,
    /// Reading was persisted to the buffer for later delivery.
    Buffered,
    /// Buffer rejected the reading (full under reject-on-full); data lost.
    Dropped,
}

/// Coordinates direct sends and buffer drains over one transport.
///
/// Direct sends and drains share a single rate window (the reading channel
/// budget); status reports and command polls are rate-limited separately by
/// the control loop.
pub struct DeliveryCoordinator<T: ReadingTransport> {
    transport: T,
    reading_window: RateWindow,
}

impl<T: ReadingTransport> DeliveryCoordinator<T> {
    pub fn new(transport: T, reading_interval: Duration) -> Self {
        Self {
            transport,
            reading_window: RateWindow::new(reading_interval),
        }
    }

    /// Try to deliver a fresh reading immediately; buffer it otherwise.
    ///
    /// The direct path is taken only when the link is up, no backlog is
    /// pending (older readings must go first) and the reading window has
    /// elapsed. Any direct-send failure falls back to the buffer rather than
    /// discarding the reading.
    pub async fn deliver_or_buffer(
        &mut self,
        buffer: &ReadingBuffer,
        record: &str,
        link_up: bool,
        now: Instant,
    ) -> DeliveryOutcome {
        let backlog = buffer.is_empty().map_or(true, |empty| !empty);

        if link_up && !backlog && self.reading_window.ready(now) {
            match self.transport.send_reading(record).await {
                Ok(()) => {
                    self.reading_window.mark(now);
                    debug!("Reading delivered directly");
                    return DeliveryOutcome::Sent;
                }
                Err(e) => {
                    self.reading_window.mark(now);
                    warn!(error = %e, "Direct send failed, buffering reading");
                }
            }
        }

        match buffer.push(record) {
            Ok(()) => DeliveryOutcome::Buffered,
            Err(BufferError::Full { limit }) => {
                warn!(limit, "Buffer full, reading dropped");
                DeliveryOutcome::Dropped
            }
            Err(e) => {
                warn!(error = %e, "Failed to buffer reading, data lost");
                DeliveryOutcome::Dropped
            }
        }
    }

    /// Degraded-mode delivery for when the buffer failed to open at boot:
    /// send when possible, otherwise the reading is lost.
    pub async fn deliver_volatile(
        &mut self,
        record: &str,
        link_up: bool,
        now: Instant,
    ) -> DeliveryOutcome {
        if link_up && self.reading_window.ready(now) {
            match self.transport.send_reading(record).await {
                Ok(()) => {
                    self.reading_window.mark(now);
                    return DeliveryOutcome::Sent;
                }
                Err(e) => {
                    self.reading_window.mark(now);
                    warn!(error = %e, "Direct send failed with no buffer available, reading lost");
                }
            }
        }
        DeliveryOutcome::Dropped
    }

    /// Drain the backlog while the link is up, once per reading window.
    ///
    /// Returns the number of records retired this tick. Each record is
    /// peeked, transmitted, and popped only after an acknowledged send; the
    /// burst stops at the first failure and resumes on a later tick. A pop
    /// failure after a successful send also stops the burst so the record is
    /// not sent twice back to back.
    pub async fn drain(&mut self, buffer: &ReadingBuffer, link_up: bool, now: Instant) -> usize {
        if !link_up || !self.reading_window.ready(now) {
            return 0;
        }

        let mut retired = 0;
        let mut attempted = false;

        loop {
            let head = match buffer.peek_head() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read buffer head");
                    break;
                }
            };

            attempted = true;
            match self.transport.send_reading(&head).await {
                Ok(()) => match buffer.pop_head() {
                    Ok(()) => {
                        retired += 1;
                        info!("Buffered reading delivered and retired");
                    }
                    Err(e) => {
                        warn!(error = %e, "Delivered reading could not be removed from buffer");
                        break;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Buffered send failed, head left in place");
                    break;
                }
            }
        }

        if attempted {
            self.reading_window.mark(now);
        }
        retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::OverflowPolicy;
    use crate::uplink::client::UplinkError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    /// Transport that can be switched between acknowledging and failing.
    struct FlakyTransport {
        healthy: Arc<AtomicBool>,
        sent: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ReadingTransport for FlakyTransport {
        async fn send_reading(&self, _record: &str) -> Result<(), UplinkError> {
            if self.healthy.load(Ordering::SeqCst) {
                self.sent.fetch_add(1, Ordering::SeqCst);
                Ok(())
            } else {
                Err(UplinkError::Server(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ))
            }
        }
    }

    fn coordinator(
        healthy: bool,
    ) -> (
        DeliveryCoordinator<FlakyTransport>,
        Arc<AtomicBool>,
        Arc<AtomicU32>,
    ) {
        let flag = Arc::new(AtomicBool::new(healthy));
        let sent = Arc::new(AtomicU32::new(0));
        let transport = FlakyTransport {
            healthy: Arc::clone(&flag),
            sent: Arc::clone(&sent),
        };
        (
            DeliveryCoordinator::new(transport, Duration::ZERO),
            flag,
            sent,
        )
    }

    fn open_buffer(dir: &std::path::Path) -> ReadingBuffer {
        ReadingBuffer::open(dir, 100, OverflowPolicy::RejectNew).unwrap()
    }

    #[tokio::test]
    async fn test_failed_send_leaves_queue_intact() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("A").unwrap();
        buffer.push("B").unwrap();

        let (mut coordinator, _, _) = coordinator(false);
        let retired = coordinator.drain(&buffer, true, Instant::now()).await;

        assert_eq!(retired, 0);
        assert_eq!(buffer.count().unwrap(), 2);
        assert_eq!(buffer.peek_head().unwrap().unwrap(), "A");
    }

    #[tokio::test]
    async fn test_successful_drain_retires_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("A").unwrap();
        buffer.push("B").unwrap();

        let (mut coordinator, _, sent) = coordinator(true);
        let retired = coordinator.drain(&buffer, true, Instant::now()).await;

        assert_eq!(retired, 2);
        assert_eq!(sent.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("A").unwrap();
        buffer.push("B").unwrap();
        buffer.push("C").unwrap();

        let (mut coordinator, healthy, _) = coordinator(true);
        let retired = coordinator.drain(&buffer, true, Instant::now()).await;
        assert_eq!(retired, 3);

        buffer.push("D").unwrap();
        healthy.store(false, Ordering::SeqCst);
        let retired = coordinator.drain(&buffer, true, Instant::now()).await;
        assert_eq!(retired, 0);
        assert_eq!(buffer.peek_head().unwrap().unwrap(), "D");
    }

    #[tokio::test]
    async fn test_link_down_skips_drain() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("A").unwrap();

        let (mut coordinator, _, sent) = coordinator(true);
        let retired = coordinator.drain(&buffer, false, Instant::now()).await;

        assert_eq!(retired, 0);
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_direct_send_success() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());

        let (mut coordinator, _, sent) = coordinator(true);
        let outcome = coordinator
            .deliver_or_buffer(&buffer, "fresh", true, Instant::now())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Sent);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert_eq!(buffer.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_direct_send_failure_buffers_instead_of_dropping() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());

        let (mut coordinator, _, _) = coordinator(false);
        let outcome = coordinator
            .deliver_or_buffer(&buffer, "fresh", true, Instant::now())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Buffered);
        assert_eq!(buffer.peek_head().unwrap().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_backlog_forces_fresh_reading_into_buffer() {
        // FIFO: a fresh reading must not jump ahead of older buffered ones.
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("older").unwrap();

        let (mut coordinator, _, sent) = coordinator(true);
        let outcome = coordinator
            .deliver_or_buffer(&buffer, "fresh", true, Instant::now())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Buffered);
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.peek_head().unwrap().unwrap(), "older");
        assert_eq!(buffer.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_link_down_buffers_without_attempting() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());

        let (mut coordinator, _, sent) = coordinator(true);
        let outcome = coordinator
            .deliver_or_buffer(&buffer, "fresh", false, Instant::now())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Buffered);
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = ReadingBuffer::open(tmp.path(), 1, OverflowPolicy::RejectNew).unwrap();
        buffer.push("occupied").unwrap();

        let (mut coordinator, _, _) = coordinator(false);
        let outcome = coordinator
            .deliver_or_buffer(&buffer, "fresh", false, Instant::now())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Dropped);
        assert_eq!(buffer.count().unwrap(), 1);
        assert_eq!(buffer.peek_head().unwrap().unwrap(), "occupied");
    }

    #[tokio::test]
    async fn test_drain_bursts_once_per_window() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = open_buffer(tmp.path());
        buffer.push("A").unwrap();
        buffer.push("B").unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let sent = Arc::new(AtomicU32::new(0));
        let transport = FlakyTransport {
            healthy: Arc::clone(&flag),
            sent: Arc::clone(&sent),
        };
        let mut coordinator = DeliveryCoordinator::new(transport, Duration::from_secs(30));

        let t0 = Instant::now();
        assert_eq!(coordinator.drain(&buffer, true, t0).await, 2);

        buffer.push("C").unwrap();
        // Same tick: window consumed, nothing more goes out
        assert_eq!(coordinator.drain(&buffer, true, t0).await, 0);
        // Next window: the remaining record drains
        assert_eq!(
            coordinator
                .drain(&buffer, true, t0 + Duration::from_secs(31))
                .await,
            1
        );
        assert_eq!(buffer.count().unwrap(), 0);
    }

    #[test]
    fn test_rate_window_basics() {
        let t0 = Instant::now();
        let mut window = RateWindow::new(Duration::from_secs(10));

        assert!(window.ready(t0), "fresh window is ready");
        window.mark(t0);
        assert!(!window.ready(t0 + Duration::from_secs(9)));
        assert!(window.ready(t0 + Duration::from_secs(10)));
    }
}
