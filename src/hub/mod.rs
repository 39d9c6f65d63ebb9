//! Message-hub collaborator seams and an in-process implementation.
//!
//! The pipeline never talks to a concrete hub directly; it goes through the
//! traits in this module:
//! - [`registry`]: identity provisioning ([`DeviceRegistry`], [`Identity`]);
//! - [`transport`]: publish side ([`Publish`], [`Envelope`]) and consume
//!   side ([`EventStream`], [`PartitionSource`], [`EventData`]);
//! - [`memory`]: [`MemoryHub`], an in-process hub implementing all of the
//!   above for demos and tests.

mod memory;
mod registry;
mod transport;

pub use memory::{MemoryHub, MemoryPublisher};
pub use registry::{DeviceRegistry, Identity};
pub use transport::{Envelope, EventData, EventStream, PartitionSource, Publish};
