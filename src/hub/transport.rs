//! # Transport seams: publish side and consume side.
//!
//! The publish side is one call: [`Publish::publish`] takes an [`Envelope`]
//! (opaque body plus string headers). The consume side is three:
//! [`EventStream::partition_ids`] lists the stream's partitions once,
//! [`EventStream::open_reader`] opens a positioned source for one partition
//! starting at a point in time, and [`PartitionSource::pull`] blocks for the
//! next event.
//!
//! ## Pull semantics
//! - `Ok(Some(event))` — an event with its partition-local position.
//! - `Ok(None)` — a no-event tick (bounded-wait transports return this on
//!   timeout); **not** an error.
//! - `Err(_)` — the source failed; the caller decides what is fatal.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::error::{ConsumeError, PublishError};

/// One publishable message: opaque body plus out-of-band headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Serialized payload bytes.
    pub body: Vec<u8>,
    /// Out-of-band key/value headers (e.g. `temperatureAlert`).
    pub headers: Vec<(String, String)>,
}

impl Envelope {
    /// Creates an envelope with no headers.
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            headers: Vec::new(),
        }
    }

    /// Attaches one header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Looks up a header value by key.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Publish-side boundary: delivers one envelope to the hub.
#[async_trait]
pub trait Publish: Send + Sync + 'static {
    /// Publishes one envelope.
    ///
    /// A failure applies to this envelope only; the caller owns the policy
    /// for what happens next.
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError>;
}

/// One event pulled from a partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    /// Opaque partition-local position marker.
    pub position: String,
    /// Event payload bytes.
    pub body: Vec<u8>,
    /// When the hub accepted the event.
    pub enqueued_at: SystemTime,
}

/// Consume-side boundary: a partitioned event stream.
#[async_trait]
pub trait EventStream: Send + Sync + 'static {
    /// Returns the stream's partition ids.
    ///
    /// Read once at receiver startup; partitions added later are invisible
    /// to a running receiver.
    async fn partition_ids(&self) -> Result<Vec<String>, ConsumeError>;

    /// Opens a reader over one partition, positioned at `from`.
    ///
    /// `poll_timeout = None` means pulls block indefinitely; `Some(d)` means
    /// a pull yields `Ok(None)` after `d` with no event.
    async fn open_reader(
        &self,
        partition: &str,
        from: SystemTime,
        poll_timeout: Option<Duration>,
    ) -> Result<Box<dyn PartitionSource>, ConsumeError>;
}

/// A positioned source over a single partition.
#[async_trait]
pub trait PartitionSource: Send + 'static {
    /// Blocks for the next event.
    ///
    /// See the module docs for the `Some`/`None`/`Err` contract.
    async fn pull(&mut self) -> Result<Option<EventData>, ConsumeError>;
}
