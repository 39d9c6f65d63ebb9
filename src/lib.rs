//! # hubflow
//!
//! **hubflow** is a small telemetry pipeline core: one side provisions a
//! device identity and streams synthetic sensor readings to a message hub;
//! the other side consumes those readings from the hub's partitions, one
//! concurrent reader per partition, until cancelled.
//!
//! ## Architecture
//! ### Producer side (one-shot pipeline)
//! ```text
//!  Registrar ──► ensure(id) ─► Identity{id, primary_key}
//!      │              (create, or fetch when it already exists)
//!      ▼
//!  Simulator ──► for seq in 1..=count:
//!                   draw reading ─► publish Envelope ─► hub
//!                   (per-reading failures absorbed; batch continues)
//! ```
//!
//! ### Consumer side (fan-out)
//! ```text
//!  Receiver::run(stream, handler)
//!      ├─► partition_ids()  (read once at startup)
//!      ├─► one PartitionReader per partition, starting at "now"
//!      │        Idle ─► Polling ─► Delivering ─► Idle ─► ... ─► Stopped
//!      ├─► OS signal ─► cancel shared token (set once, never reset)
//!      └─► join ALL readers before returning
//! ```
//!
//! The two sides never meet in-process; they are decoupled by the hub. The
//! collaborator seams ([`DeviceRegistry`], [`Publish`], [`EventStream`],
//! [`PartitionSource`]) keep the core independent of any vendor SDK;
//! [`MemoryHub`] implements all of them in-process for demos and tests.
//!
//! ## Failure policy
//! | Failure | Scope | Policy |
//! |---|---|---|
//! | Registration / discovery | whole run | terminal, no retry |
//! | One reading's publish | that reading | absorbed, batch continues |
//! | Malformed event (empty body) | that event | logged, reader continues |
//! | Partition pull error | that partition | reader stops, siblings continue |
//!
//! There is no retry or backoff anywhere; every retry is a manual process
//! re-invocation.
//!
//! ## Observability
//! All components report through a broadcast [`Bus`] of [`Event`]s; a
//! [`SubscriberSet`] fans events out to [`Subscribe`] implementations
//! through bounded queues. [`LogWriter`] is a ready-made stdout subscriber
//! for demos.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use hubflow::{
//!     Bus, Delivery, HandlerFn, LogWriter, MemoryHub, Receiver, ReceiverConfig,
//!     Registrar, Simulator, SimulatorConfig, Subscribe,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(MemoryHub::new(4));
//!
//!     // Producer: provision, then emit a batch.
//!     let bus = Bus::new(256);
//!     let registrar = Registrar::new(hub.clone(), bus.clone());
//!     let (identity, _found) = registrar.ensure("sensor-1").await?;
//!     let client = hub.device_client(&identity);
//!     let sent = Simulator::new(SimulatorConfig::default(), bus)
//!         .run(&identity, &client)
//!         .await;
//!     println!("{sent} readings sent");
//!
//!     // Consumer: fan out over the partitions until Ctrl-C.
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let receiver = Receiver::new(ReceiverConfig::default(), subs);
//!     let handler = HandlerFn::arc(|d: Delivery| async move {
//!         println!("p{} @{}: {}", d.partition, d.position, String::from_utf8_lossy(&d.body));
//!     });
//!     receiver.run(hub, handler).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod hub;
mod receiver;
mod registrar;
mod subscribers;
mod telemetry;

// ---- Public re-exports ----

pub use config::{ReceiverConfig, SimulatorConfig};
pub use error::{ConsumeError, PublishError, ReceiverError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use hub::{
    DeviceRegistry, Envelope, EventData, EventStream, Identity, MemoryHub, MemoryPublisher,
    PartitionSource, Publish,
};
pub use receiver::{
    Delivery, Handle, HandlerFn, HandlerRef, Receiver, wait_for_shutdown_signal,
};
pub use registrar::Registrar;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use telemetry::{ALERT_HEADER, ALERT_THRESHOLD, Reading, Simulator};
