//! # Registrar: idempotent create-or-fetch device provisioning.
//!
//! [`Registrar::ensure`] attempts to create an identity; when the registry
//! reports the distinguishable `AlreadyExists` kind it falls back to a fetch
//! and flags the result as found. Any other failure is terminal for the
//! call — no retry, the cause propagates.
//!
//! ```text
//! ensure(id)
//!   ├─► registry.create(id)
//!   │     ├─ Ok(identity)        ──► (identity, found = false)
//!   │     ├─ Err(AlreadyExists)  ──► registry.fetch(id) ─► (identity, found = true)
//!   │     └─ Err(other)          ──► propagate
//! ```
//!
//! Re-running with the same id is a no-op lookup: the second call yields the
//! same logical identity with `found = true`.

use std::sync::Arc;

use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::hub::{DeviceRegistry, Identity};

/// Idempotent provisioning front over a [`DeviceRegistry`].
pub struct Registrar {
    registry: Arc<dyn DeviceRegistry>,
    bus: Bus,
}

impl Registrar {
    /// Creates a registrar over the given registry.
    pub fn new(registry: Arc<dyn DeviceRegistry>, bus: Bus) -> Self {
        Self { registry, bus }
    }

    /// Ensures the identity exists, creating it or fetching the existing
    /// one.
    ///
    /// Returns the identity and `found = true` when it already existed.
    pub async fn ensure(&self, id: &str) -> Result<(Identity, bool), RegistryError> {
        match self.registry.create(id).await {
            Ok(identity) => {
                self.bus
                    .publish(Event::now(EventKind::DeviceCreated).with_device(id));
                Ok((identity, false))
            }
            Err(RegistryError::AlreadyExists { .. }) => {
                let identity = self.registry.fetch(id).await?;
                self.bus
                    .publish(Event::now(EventKind::DeviceFetched).with_device(id));
                Ok((identity, true))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::hub::MemoryHub;

    /// Registry that always fails with a non-AlreadyExists error.
    struct BrokenRegistry;

    #[async_trait]
    impl DeviceRegistry for BrokenRegistry {
        async fn create(&self, _id: &str) -> Result<Identity, RegistryError> {
            Err(RegistryError::Transport {
                message: "connection refused".into(),
            })
        }

        async fn fetch(&self, _id: &str) -> Result<Identity, RegistryError> {
            unreachable!("fetch must not be called on a create transport failure")
        }
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let hub = MemoryHub::new(1);
        let registrar = Registrar::new(Arc::new(hub), Bus::new(16));

        let (first, found_first) = registrar.ensure("sensor-1").await.unwrap();
        assert!(!found_first);

        let (second, found_second) = registrar.ensure("sensor-1").await.unwrap();
        assert!(found_second);

        // Same logical identity both times, credential included.
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_other_failures_propagate_without_fetch() {
        let registrar = Registrar::new(Arc::new(BrokenRegistry), Bus::new(16));
        let err = registrar.ensure("sensor-1").await.unwrap_err();
        assert_eq!(err.as_label(), "registry_transport");
    }

    #[tokio::test]
    async fn test_ensure_publishes_created_then_fetched() {
        let hub = MemoryHub::new(1);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let registrar = Registrar::new(Arc::new(hub), bus);

        registrar.ensure("sensor-1").await.unwrap();
        registrar.ensure("sensor-1").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::DeviceCreated);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::DeviceFetched);
    }
}
