//! Synthetic telemetry: the reading value type and the batch simulator.
//!
//! Internal modules:
//! - [`reading`]: [`Reading`] value type, alert rule, wire encoding;
//! - [`simulator`]: [`Simulator`], the sequential best-effort batch emitter.

mod reading;
mod simulator;

pub use reading::{Reading, ALERT_HEADER, ALERT_THRESHOLD};
pub use simulator::Simulator;
