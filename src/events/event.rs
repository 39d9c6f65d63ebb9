//! # Runtime events emitted by the registrar, simulator, and receiver.
//!
//! [`EventKind`] classifies events across the pipeline:
//! - **Provisioning**: identity created or fetched.
//! - **Producer lifecycle**: readings sent or rejected, batch finished.
//! - **Consumer lifecycle**: readers started/stopped, deliveries, malformed
//!   events, per-partition failures.
//! - **Shutdown**: signal observed, all readers stopped, grace exceeded.
//! - **Subscriber self-reporting**: panics and queue overflows.
//!
//! The [`Event`] struct carries optional metadata (device, partition,
//! sequence, position, reason) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Provisioning events ===
    /// A new identity was created in the registry.
    ///
    /// Sets: `device`, `at`, `seq`.
    DeviceCreated,

    /// The identity already existed and was fetched instead.
    ///
    /// Sets: `device`, `at`, `seq`.
    DeviceFetched,

    // === Producer events ===
    /// One reading was published successfully.
    ///
    /// Sets: `device`, `sequence` (reading sequence number), `at`, `seq`.
    ReadingSent,

    /// One reading failed to publish and was dropped (best-effort policy).
    ///
    /// Sets: `device`, `sequence`, `reason`, `at`, `seq`.
    PublishRejected,

    /// The batch finished; `sequence` carries the number of readings that
    /// were actually sent.
    ///
    /// Sets: `device`, `sequence` (sent count), `at`, `seq`.
    BatchFinished,

    // === Consumer events ===
    /// A partition reader opened its source and entered its loop.
    ///
    /// Sets: `partition`, `at`, `seq`.
    ReaderStarted,

    /// An event was delivered to the handler.
    ///
    /// Sets: `partition`, `position`, `at`, `seq`.
    Delivered,

    /// A pulled event had no usable body; it was skipped.
    ///
    /// Sets: `partition`, `reason`, `at`, `seq`.
    MalformedEvent,

    /// A partition source failed; its reader stopped. Siblings continue.
    ///
    /// Sets: `partition`, `reason`, `at`, `seq`.
    ReaderFailed,

    /// A partition reader reached its terminal state.
    ///
    /// Sets: `partition`, `at`, `seq`.
    ReaderStopped,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or token cancelled).
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All readers stopped within the configured grace period.
    ///
    /// Sets: `at`, `seq`.
    AllReadersStopped,

    /// Grace period exceeded; some readers did not stop in time.
    ///
    /// Sets: `at`, `seq`.
    GraceExceeded,

    // === Subscriber events ===
    /// A subscriber panicked during event processing.
    ///
    /// Sets: `reason` (panic info), `at`, `seq`.
    SubscriberPanicked,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Device id, if applicable.
    pub device: Option<Arc<str>>,
    /// Partition id, if applicable.
    pub partition: Option<Arc<str>>,
    /// Reading sequence number or sent count, depending on the kind.
    pub sequence: Option<u64>,
    /// Opaque partition-local position of a delivered event.
    pub position: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            device: None,
            partition: None,
            sequence: None,
            position: None,
            reason: None,
        }
    }

    /// Attaches a device id.
    #[inline]
    pub fn with_device(mut self, device: impl Into<Arc<str>>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Attaches a partition id.
    #[inline]
    pub fn with_partition(mut self, partition: impl Into<Arc<str>>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Attaches a reading sequence number (or sent count for
    /// [`EventKind::BatchFinished`]).
    #[inline]
    pub fn with_sequence(mut self, n: u64) -> Self {
        self.sequence = Some(n);
        self
    }

    /// Attaches an event position.
    #[inline]
    pub fn with_position(mut self, position: impl Into<Arc<str>>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}
