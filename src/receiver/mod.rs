//! Consumer runtime: partition fan-out, per-partition readers, shutdown.
//!
//! Internal modules:
//! - [`receiver`]: orchestrates discovery, fan-out, join, graceful exit;
//! - [`reader`]: the single-partition pull loop (state machine);
//! - [`handler`]: the [`Handle`] trait and function-backed [`HandlerFn`];
//! - [`shutdown`]: cross-platform OS signal waiting.
//!
//! The only public API is [`Receiver`] plus the handler types.

mod handler;
mod reader;
mod receiver;
mod shutdown;

pub use handler::{Delivery, Handle, HandlerFn, HandlerRef};
pub use receiver::Receiver;
pub use shutdown::wait_for_shutdown_signal;
