//! # Receiver: partition fan-out, join semantics, graceful shutdown.
//!
//! The [`Receiver`] owns the event bus, a [`SubscriberSet`], and the
//! consumer configuration. It discovers the stream's partitions once,
//! spawns one [`PartitionReader`](super::reader::PartitionReader) per
//! partition, and blocks until every reader has returned.
//!
//! ## High-level architecture
//! ```text
//! run(stream, handler):
//!   ├─► signal watcher: wait_for_shutdown_signal()
//!   │        └─► publish ShutdownRequested, token.cancel()   (only action)
//!   └─► run_with_token(stream, handler, token):
//!         ├─► subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit
//!         ├─► stream.partition_ids()          (read ONCE; later partitions
//!         │                                    are invisible, by design)
//!         ├─► per partition: open_reader(partition, now, poll_timeout)
//!         │        └─► set.spawn(PartitionReader::run(token.child_token()))
//!         └─► join:
//!               ├─ all readers returned        ──► AllReadersStopped, Ok
//!               └─ token cancelled first       ──► wait up to `grace`:
//!                     ├─ drained               ──► AllReadersStopped, Ok
//!                     └─ timeout               ──► GraceExceeded{stuck}
//! ```
//!
//! ## Rules
//! - Join semantics, not fire-and-forget: `run` returns only after every
//!   spawned reader reached its terminal state (or the grace expired).
//! - The cancellation token is the **only** cross-reader shared state; it is
//!   set at most once and never reset.
//! - A reader failure never cancels its siblings.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::ReceiverConfig;
use crate::error::ReceiverError;
use crate::events::{Bus, Event, EventKind};
use crate::hub::EventStream;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::handler::HandlerRef;
use super::reader::PartitionReader;
use super::shutdown;

/// Multi-partition consumer runtime.
pub struct Receiver {
    /// Consumer configuration.
    pub cfg: ReceiverConfig,
    /// Event bus shared with all readers.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    pub subs: Arc<SubscriberSet>,
    /// Partitions whose readers are currently running.
    active: Arc<Mutex<BTreeSet<String>>>,
}

impl Receiver {
    /// Creates a receiver with the given config and subscribers.
    pub fn new(cfg: ReceiverConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        Self {
            cfg,
            bus,
            subs,
            active: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Runs until an OS termination signal arrives, then shuts down
    /// gracefully.
    ///
    /// The signal watcher performs exactly one action: it publishes
    /// `ShutdownRequested` and cancels the shared token. It never errors the
    /// run and never blocks a reader.
    pub async fn run(
        &self,
        stream: Arc<dyn EventStream>,
        handler: HandlerRef,
    ) -> Result<(), ReceiverError> {
        let token = CancellationToken::new();

        let watcher_token = token.clone();
        let watcher_bus = self.bus.clone();
        let watcher = tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                watcher_bus.publish(Event::now(EventKind::ShutdownRequested));
                watcher_token.cancel();
            }
        });

        let result = self.run_with_token(stream, handler, token).await;
        // If the readers drained without a signal, the watcher is still
        // parked on the signal future and must not outlive the run.
        watcher.abort();
        result
    }

    /// Runs with an externally owned cancellation token.
    ///
    /// Cancelling `token` requests graceful exit; `run_with_token` still
    /// joins every reader before returning.
    pub async fn run_with_token(
        &self,
        stream: Arc<dyn EventStream>,
        handler: HandlerRef,
        token: CancellationToken,
    ) -> Result<(), ReceiverError> {
        self.subscriber_listener();

        // Partition set is read once; readers start at "now" (no backlog).
        let started_at = SystemTime::now();
        let partitions = stream
            .partition_ids()
            .await
            .map_err(|source| ReceiverError::Discovery { source })?;

        let mut set = JoinSet::new();
        self.spawn_readers(&mut set, &token, stream, handler, partitions, started_at);
        self.drive_join(&mut set, &token).await
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Spawns one reader task per discovered partition.
    fn spawn_readers(
        &self,
        set: &mut JoinSet<()>,
        runtime_token: &CancellationToken,
        stream: Arc<dyn EventStream>,
        handler: HandlerRef,
        partitions: Vec<String>,
        started_at: SystemTime,
    ) {
        let poll_timeout = self.cfg.poll_timeout_bound();

        for partition in partitions {
            self.active.lock().unwrap().insert(partition.clone());

            let stream = Arc::clone(&stream);
            let handler = Arc::clone(&handler);
            let bus = self.bus.clone();
            let active = Arc::clone(&self.active);
            let child = runtime_token.child_token();

            set.spawn(async move {
                match stream.open_reader(&partition, started_at, poll_timeout).await {
                    Ok(source) => {
                        let reader =
                            PartitionReader::new(Arc::from(partition.as_str()), source, handler, bus);
                        reader.run(child).await;
                    }
                    Err(e) => {
                        // Open failure is fatal to this partition only.
                        bus.publish(
                            Event::now(EventKind::ReaderFailed)
                                .with_partition(partition.as_str())
                                .with_reason(e.to_string()),
                        );
                        bus.publish(
                            Event::now(EventKind::ReaderStopped).with_partition(partition.as_str()),
                        );
                    }
                }
                active.lock().unwrap().remove(&partition);
            });
        }
    }

    /// Waits until either all readers finish on their own or the token is
    /// cancelled, then drains within the grace period.
    async fn drive_join(
        &self,
        set: &mut JoinSet<()>,
        runtime_token: &CancellationToken,
    ) -> Result<(), ReceiverError> {
        tokio::select! {
            _ = runtime_token.cancelled() => {
                self.wait_all_with_grace(set).await
            }
            _ = async { while set.join_next().await.is_some() {} } => {
                self.bus.publish(Event::now(EventKind::AllReadersStopped));
                Ok(())
            }
        }
    }

    /// Waits for all readers to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllReadersStopped`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`ReceiverError::GraceExceeded`] with the stuck partitions.
    async fn wait_all_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), ReceiverError> {
        let grace = self.cfg.grace;
        let done = async { while set.join_next().await.is_some() {} };

        match tokio::time::timeout(grace, done).await {
            Ok(_) => {
                self.bus.publish(Event::now(EventKind::AllReadersStopped));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::now(EventKind::GraceExceeded));
                let stuck = self.active.lock().unwrap().iter().cloned().collect();
                Err(ReceiverError::GraceExceeded { grace, stuck })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::hub::MemoryHub;
    use crate::receiver::{Delivery, HandlerFn};

    fn test_cfg() -> ReceiverConfig {
        ReceiverConfig {
            poll_timeout: Duration::from_millis(10),
            grace: Duration::from_secs(5),
            bus_capacity: 256,
        }
    }

    fn counting_handler() -> (HandlerRef, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler: HandlerRef = {
            let count = count.clone();
            HandlerFn::arc(move |_delivery: Delivery| {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        (handler, count)
    }

    #[tokio::test]
    async fn test_spawns_one_reader_per_partition_and_joins_all() {
        let hub = Arc::new(MemoryHub::new(3));
        let receiver = Receiver::new(test_cfg(), vec![]);
        let (handler, _) = counting_handler();
        let mut rx = receiver.bus.subscribe();

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        receiver
            .run_with_token(hub, handler, token)
            .await
            .unwrap();

        // Exactly one started/stopped pair per partition, then the terminal
        // all-stopped marker.
        let mut started = BTreeSet::new();
        let mut stopped = BTreeSet::new();
        let mut all_stopped = false;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ReaderStarted => {
                    started.insert(ev.partition.unwrap().to_string());
                }
                EventKind::ReaderStopped => {
                    stopped.insert(ev.partition.unwrap().to_string());
                }
                EventKind::AllReadersStopped => all_stopped = true,
                _ => {}
            }
        }
        let expected: BTreeSet<String> =
            ["0", "1", "2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(started, expected);
        assert_eq!(stopped, expected);
        assert!(all_stopped);
        assert!(receiver.active.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_converges_within_one_poll_interval() {
        let hub = Arc::new(MemoryHub::new(2));
        let receiver = Receiver::new(test_cfg(), vec![]);
        let (handler, _) = counting_handler();

        let token = CancellationToken::new();
        token.cancel();

        // Already-cancelled token: run still joins every reader and returns
        // promptly (bounded by the 10ms poll timeout, well under grace).
        let run = receiver.run_with_token(hub, handler, token);
        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("receiver did not converge after cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_partition_does_not_cancel_siblings() {
        let hub = Arc::new(MemoryHub::new(3));
        hub.poison_partition("1").unwrap();

        let receiver = Receiver::new(test_cfg(), vec![]);
        let (handler, delivered) = counting_handler();
        let mut rx = receiver.bus.subscribe();

        let token = CancellationToken::new();
        let run = {
            let hub = hub.clone();
            let token = token.clone();
            let handler = handler.clone();
            async move { receiver.run_with_token(hub, handler, token).await }
        };
        let run = tokio::spawn(run);

        // Give readers time to start, then feed the healthy partitions.
        tokio::time::sleep(Duration::from_millis(30)).await;
        hub.push_raw("0", b"a".to_vec()).await.unwrap();
        hub.push_raw("2", b"b".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        run.await.unwrap().unwrap();

        assert_eq!(delivered.load(Ordering::SeqCst), 2);

        let mut failed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ReaderFailed {
                failed.push(ev.partition.unwrap().to_string());
            }
        }
        assert_eq!(failed, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_run_returns_without_a_signal_when_readers_drain() {
        let hub = Arc::new(MemoryHub::new(2));
        hub.poison_partition("0").unwrap();
        hub.poison_partition("1").unwrap();

        let receiver = Receiver::new(test_cfg(), vec![]);
        let (handler, _) = counting_handler();

        // Every reader fails fast, so `run` must return on its own; the
        // signal watcher it spawned must not keep the run alive.
        tokio::time::timeout(Duration::from_secs(1), receiver.run(hub, handler))
            .await
            .expect("run did not return after all readers stopped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_grace_exceeded_names_stuck_partitions() {
        let hub = Arc::new(MemoryHub::new(2));
        // Unbounded pulls: quiet partitions park their readers forever.
        let cfg = ReceiverConfig {
            poll_timeout: Duration::ZERO,
            grace: Duration::from_millis(50),
            bus_capacity: 64,
        };
        let receiver = Receiver::new(cfg, vec![]);
        let (handler, _) = counting_handler();

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });

        let err = receiver
            .run_with_token(hub, handler, token)
            .await
            .unwrap_err();
        match err {
            ReceiverError::GraceExceeded { stuck, .. } => {
                assert_eq!(stuck, vec!["0".to_string(), "1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
