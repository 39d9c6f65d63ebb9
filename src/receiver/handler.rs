//! # Message handler abstraction and function-backed implementation.
//!
//! [`Handle`] is the seam between the receiver runtime and whatever the
//! application does with a delivered event. [`HandlerFn`] wraps a closure
//! `F: Fn(Delivery) -> Fut`, producing a fresh future per delivery; shared
//! state goes through an explicit `Arc` inside the closure. The common
//! handle type is [`HandlerRef`], an `Arc<dyn Handle>`.
//!
//! Handlers are invoked from the delivering partition's reader, so within
//! one partition deliveries are strictly ordered; across partitions there is
//! no interleaving guarantee.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// One delivered event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Partition the event arrived on.
    pub partition: Arc<str>,
    /// Opaque partition-local position marker.
    pub position: String,
    /// Event payload bytes.
    pub body: Vec<u8>,
}

/// Shared handler handle used across the receiver runtime.
pub type HandlerRef = Arc<dyn Handle>;

/// Contract for processing delivered events.
///
/// Called inline from the reader loop; a slow handler delays only its own
/// partition.
#[async_trait]
pub trait Handle: Send + Sync + 'static {
    /// Processes one delivered event.
    async fn on_message(&self, delivery: Delivery);
}

/// Function-backed handler implementation.
///
/// Wraps a closure that creates a new future per delivery.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handle for HandlerFn<F>
where
    F: Fn(Delivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_message(&self, delivery: Delivery) {
        (self.f)(delivery).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_handler_fn_invokes_closure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: HandlerRef = {
            let hits = hits.clone();
            HandlerFn::arc(move |delivery: Delivery| {
                let hits = hits.clone();
                async move {
                    assert_eq!(&*delivery.partition, "0");
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        handler
            .on_message(Delivery {
                partition: Arc::from("0"),
                position: "5".into(),
                body: b"x".to_vec(),
            })
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
