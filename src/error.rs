//! Error types used across the provisioning, publishing, and ingestion paths.
//!
//! Four enums map to the four fault domains:
//!
//! - [`RegistryError`] — device registry calls (create/fetch).
//! - [`PublishError`] — sending one telemetry envelope.
//! - [`ConsumeError`] — pulling events from one partition.
//! - [`ReceiverError`] — the receiver runtime itself (shutdown).
//!
//! Each type provides `as_label` / `as_message` helpers for log lines and
//! event payloads. There is deliberately no retry classification: a failure
//! is either absorbed where it happens (per-reading publish, malformed
//! event) or terminal for its unit of work (registration, one partition).

use std::time::Duration;
use thiserror::Error;

/// # Errors from the device registry boundary.
///
/// `AlreadyExists` is the one kind callers branch on: the registrar turns it
/// into a fetch. Everything else is terminal for the provisioning call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An identity with this id is already registered.
    #[error("identity [{id}] already exists")]
    AlreadyExists {
        /// The requested identity id.
        id: String,
    },

    /// No identity with this id is registered.
    #[error("identity [{id}] not found")]
    NotFound {
        /// The requested identity id.
        id: String,
    },

    /// Any other registry failure (network, credentials, service error).
    ///
    /// The cause is flattened into `message`; transient and permanent
    /// failures are not distinguished here.
    #[error("registry transport failure: {message}")]
    Transport {
        /// Human-readable cause.
        message: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyExists { .. } => "registry_already_exists",
            RegistryError::NotFound { .. } => "registry_not_found",
            RegistryError::Transport { .. } => "registry_transport",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors from publishing one telemetry envelope.
///
/// Publish failures are absorbed by the simulator (best-effort telemetry);
/// this type exists so the failure reason can still travel through events.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The transport rejected or failed to deliver the envelope.
    #[error("publish transport failure: {message}")]
    Transport {
        /// Human-readable cause.
        message: String,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Transport { .. } => "publish_transport",
        }
    }
}

/// # Errors from pulling events off one partition.
///
/// `MalformedEvent` is recoverable: the reader logs it and keeps pulling.
/// `Transport` is fatal to that partition only; sibling readers continue.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumeError {
    /// The pulled event carried no usable body.
    #[error("malformed event on partition [{partition}]: empty body")]
    MalformedEvent {
        /// Partition the event came from.
        partition: String,
    },

    /// The partition source failed; the reader cannot continue.
    #[error("consume transport failure on partition [{partition}]: {message}")]
    Transport {
        /// Partition the failure belongs to.
        partition: String,
        /// Human-readable cause.
        message: String,
    },
}

impl ConsumeError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumeError::MalformedEvent { .. } => "consume_malformed",
            ConsumeError::Transport { .. } => "consume_transport",
        }
    }

    /// Whether the reader may keep pulling after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConsumeError::MalformedEvent { .. })
    }
}

/// # Errors from the receiver runtime.
///
/// Raised when the post-signal drain exceeds the configured grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReceiverError {
    /// Partition discovery failed before any reader was spawned.
    ///
    /// Terminal for the whole run, like client construction in the producer.
    #[error("partition discovery failed: {source}")]
    Discovery {
        /// The underlying consume-side failure.
        #[source]
        source: ConsumeError,
    },

    /// Shutdown grace period was exceeded; some readers were still running.
    #[error("shutdown grace {grace:?} exceeded; stuck partitions: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Partitions whose readers did not stop in time.
        stuck: Vec<String>,
    },
}

impl ReceiverError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReceiverError::Discovery { .. } => "receiver_discovery",
            ReceiverError::GraceExceeded { .. } => "receiver_grace_exceeded",
        }
    }
}
