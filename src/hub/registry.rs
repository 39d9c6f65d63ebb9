//! # Device identity and the registry seam.
//!
//! [`Identity`] is a registered device's unique id plus its symmetric
//! credential. [`DeviceRegistry`] is the boundary to the external identity
//! store; the error kind ("already exists" vs anything else) is decided
//! **here**, once, so callers never sniff causes themselves.

use async_trait::async_trait;

use crate::error::RegistryError;

/// A registered device identity.
///
/// Created once per id and immutable afterwards; the simulator only reads
/// it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Globally unique device id within the registry.
    pub id: String,
    /// Symmetric credential generated at creation time.
    pub primary_key: String,
}

/// Boundary to the external identity registry.
///
/// ## Contract
/// - [`create`](DeviceRegistry::create) fails with
///   [`RegistryError::AlreadyExists`] when the id is taken — a
///   distinguishable kind, not a generic failure.
/// - [`fetch`](DeviceRegistry::fetch) fails with
///   [`RegistryError::NotFound`] when the id is unknown.
/// - Any other failure maps to [`RegistryError::Transport`].
#[async_trait]
pub trait DeviceRegistry: Send + Sync + 'static {
    /// Creates a new identity and returns it with fresh credential material.
    async fn create(&self, id: &str) -> Result<Identity, RegistryError>;

    /// Fetches an existing identity by id.
    async fn fetch(&self, id: &str) -> Result<Identity, RegistryError>;
}
