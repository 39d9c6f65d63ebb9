//! Runtime events and the broadcast bus that carries them.
//!
//! Internal modules:
//! - [`bus`]: thin wrapper over `tokio::sync::broadcast`;
//! - [`event`]: [`Event`]/[`EventKind`] describing the telemetry lifecycle.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
