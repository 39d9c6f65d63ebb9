//! Event subscribers: the extension point for observing the pipeline.
//!
//! Internal modules:
//! - [`subscribe`]: the [`Subscribe`] trait;
//! - [`set`]: [`SubscriberSet`] non-blocking fan-out with per-subscriber
//!   queues;
//! - [`log`]: [`LogWriter`], a simple stdout subscriber for demos.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
