//! # PartitionReader: single-partition pull loop.
//!
//! Supervises consumption of one partition until cancellation or an
//! unrecoverable source error.
//!
//! ## State machine
//! ```text
//! Idle ──► Polling ──► Delivering ──► Idle ──► ... ──► Stopped
//!
//! loop {
//!   ├─► Idle: token cancelled? ──► Stopped
//!   ├─► Polling: source.pull().await        (suspension point)
//!   │     ├─ Ok(None)            ──► Idle   (no-event tick)
//!   │     ├─ Ok(event), position and body present
//!   │     │        ──► Delivering: handler.on_message(...) ──► Idle
//!   │     ├─ Ok(event), empty position/body
//!   │     │        ──► publish MalformedEvent ──► Idle    (reader survives)
//!   │     ├─ Err(recoverable)   ──► publish MalformedEvent ──► Idle
//!   │     └─ Err(transport)     ──► publish ReaderFailed ──► Stopped
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is **cooperative**: checked once per iteration at the top
//!   of `Idle`, never preemptive. A reader blocked in `Polling` observes it
//!   only after the pull returns; with an unbounded pull, shutdown latency
//!   is bounded by whatever makes the pull return.
//! - `Stopped` is terminal. The reader never restarts itself; there is no
//!   restart policy above it either.
//! - A failure here is fatal to **this** partition only; sibling readers
//!   are unaffected.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::hub::PartitionSource;

use super::handler::{Delivery, HandlerRef};

/// Pull loop over one partition.
pub(crate) struct PartitionReader {
    /// Partition this reader owns.
    pub partition: Arc<str>,
    /// Positioned event source (exclusively owned cursor).
    pub source: Box<dyn PartitionSource>,
    /// Application handler for delivered events.
    pub handler: HandlerRef,
    /// Event bus for lifecycle reporting.
    pub bus: Bus,
}

impl PartitionReader {
    pub(crate) fn new(
        partition: Arc<str>,
        source: Box<dyn PartitionSource>,
        handler: HandlerRef,
        bus: Bus,
    ) -> Self {
        Self {
            partition,
            source,
            handler,
            bus,
        }
    }

    /// Runs the loop until cancellation or an unrecoverable error, then
    /// publishes `ReaderStopped`.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        self.bus
            .publish(Event::now(EventKind::ReaderStarted).with_partition(Arc::clone(&self.partition)));

        loop {
            // Idle: the only cancellation check point.
            if token.is_cancelled() {
                break;
            }

            // Polling.
            match self.source.pull().await {
                Ok(None) => continue,
                Ok(Some(event)) => {
                    if event.position.is_empty() || event.body.is_empty() {
                        self.bus.publish(
                            Event::now(EventKind::MalformedEvent)
                                .with_partition(Arc::clone(&self.partition))
                                .with_reason("event has no usable content"),
                        );
                        continue;
                    }

                    // Delivering.
                    let position = event.position;
                    self.handler
                        .on_message(Delivery {
                            partition: Arc::clone(&self.partition),
                            position: position.clone(),
                            body: event.body,
                        })
                        .await;
                    self.bus.publish(
                        Event::now(EventKind::Delivered)
                            .with_partition(Arc::clone(&self.partition))
                            .with_position(position),
                    );
                }
                Err(e) if e.is_recoverable() => {
                    self.bus.publish(
                        Event::now(EventKind::MalformedEvent)
                            .with_partition(Arc::clone(&self.partition))
                            .with_reason(e.to_string()),
                    );
                }
                Err(e) => {
                    self.bus.publish(
                        Event::now(EventKind::ReaderFailed)
                            .with_partition(Arc::clone(&self.partition))
                            .with_reason(e.to_string()),
                    );
                    break;
                }
            }
        }

        // Stopped: terminal, whether by cancellation or error.
        self.bus
            .publish(Event::now(EventKind::ReaderStopped).with_partition(Arc::clone(&self.partition)));
    }
}
