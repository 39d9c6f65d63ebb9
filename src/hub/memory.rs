//! # In-process message hub for demos and tests.
//!
//! [`MemoryHub`] implements every collaborator seam against shared in-memory
//! state: a device registry with duplicate detection, per-device publisher
//! clients that authenticate by primary key, and partitioned event logs with
//! index positions.
//!
//! ## Semantics mirrored from a real hub
//! - `create` on a taken id fails with the distinguishable `AlreadyExists`
//!   kind.
//! - A publisher built with a wrong key is rejected per publish (`Transport`).
//! - Envelopes route to a partition by a stable hash of the device id, so
//!   one device's readings stay ordered within one partition.
//! - Readers opened at time `from` see only events enqueued at or after
//!   `from` — no backlog replay.
//!
//! ## Test hooks
//! [`MemoryHub::push_raw`] appends an arbitrary (possibly empty) body to a
//! partition, and [`MemoryHub::poison_partition`] makes subsequent pulls on
//! one partition fail, to exercise malformed-event tolerance and
//! per-partition fault isolation.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::sync::{Mutex, Notify, RwLock};

use crate::error::{ConsumeError, PublishError, RegistryError};

use super::registry::{DeviceRegistry, Identity};
use super::transport::{Envelope, EventData, EventStream, PartitionSource, Publish};

/// Length of generated primary keys.
const KEY_LEN: usize = 32;

/// One partition's append-only event log.
struct PartitionLog {
    events: Mutex<Vec<EventData>>,
    notify: Notify,
    poisoned: AtomicBool,
}

impl PartitionLog {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            notify: Notify::new(),
            poisoned: AtomicBool::new(false),
        }
    }

    async fn append(&self, body: Vec<u8>) {
        let mut events = self.events.lock().await;
        let position = events.len().to_string();
        events.push(EventData {
            position,
            body,
            enqueued_at: SystemTime::now(),
        });
        drop(events);
        self.notify.notify_waiters();
    }
}

/// Shared hub state behind every handle.
struct HubState {
    devices: RwLock<HashMap<String, Identity>>,
    partitions: Vec<Arc<PartitionLog>>,
}

/// In-process hub: registry, publish side, and consume side in one handle.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct MemoryHub {
    state: Arc<HubState>,
}

impl MemoryHub {
    /// Creates a hub with the given number of partitions (min 1, clamped).
    pub fn new(partition_count: usize) -> Self {
        let partitions = (0..partition_count.max(1))
            .map(|_| Arc::new(PartitionLog::new()))
            .collect();
        Self {
            state: Arc::new(HubState {
                devices: RwLock::new(HashMap::new()),
                partitions,
            }),
        }
    }

    /// Builds a publish-side client for one device.
    ///
    /// The key is checked per publish, not here; a client holding a stale or
    /// wrong key fails at send time.
    pub fn device_client(&self, identity: &Identity) -> MemoryPublisher {
        MemoryPublisher {
            state: Arc::clone(&self.state),
            device_id: identity.id.clone(),
            primary_key: identity.primary_key.clone(),
        }
    }

    /// Appends a raw body (possibly empty) to one partition.
    ///
    /// Bypasses the registry and routing; intended for tests that need
    /// malformed events.
    pub async fn push_raw(&self, partition: &str, body: Vec<u8>) -> Result<(), ConsumeError> {
        let log = self.partition_log(partition)?;
        log.append(body).await;
        Ok(())
    }

    /// Makes every subsequent pull on one partition fail with a transport
    /// error. Sibling partitions are unaffected.
    pub fn poison_partition(&self, partition: &str) -> Result<(), ConsumeError> {
        let log = self.partition_log(partition)?;
        log.poisoned.store(true, Ordering::SeqCst);
        log.notify.notify_waiters();
        Ok(())
    }

    fn partition_log(&self, partition: &str) -> Result<Arc<PartitionLog>, ConsumeError> {
        let idx: usize = partition
            .parse()
            .map_err(|_| ConsumeError::Transport {
                partition: partition.to_string(),
                message: "unknown partition".into(),
            })?;
        self.state
            .partitions
            .get(idx)
            .cloned()
            .ok_or_else(|| ConsumeError::Transport {
                partition: partition.to_string(),
                message: "unknown partition".into(),
            })
    }

    fn route(&self, device_id: &str) -> usize {
        stable_hash(device_id) as usize % self.state.partitions.len()
    }

    /// Returns the partition a device's readings land on.
    pub fn partition_for(&self, device_id: &str) -> String {
        self.route(device_id).to_string()
    }
}

/// Stable non-cryptographic hash for partition routing.
fn stable_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl DeviceRegistry for MemoryHub {
    async fn create(&self, id: &str) -> Result<Identity, RegistryError> {
        let mut devices = self.state.devices.write().await;
        if devices.contains_key(id) {
            return Err(RegistryError::AlreadyExists { id: id.to_string() });
        }
        let identity = Identity {
            id: id.to_string(),
            primary_key: generate_key(),
        };
        devices.insert(id.to_string(), identity.clone());
        Ok(identity)
    }

    async fn fetch(&self, id: &str) -> Result<Identity, RegistryError> {
        let devices = self.state.devices.read().await;
        devices
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }
}

/// Publish-side client bound to one device identity.
pub struct MemoryPublisher {
    state: Arc<HubState>,
    device_id: String,
    primary_key: String,
}

#[async_trait]
impl Publish for MemoryPublisher {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        {
            let devices = self.state.devices.read().await;
            let known = devices.get(&self.device_id);
            match known {
                Some(identity) if identity.primary_key == self.primary_key => {}
                Some(_) => {
                    return Err(PublishError::Transport {
                        message: format!("credential rejected for device [{}]", self.device_id),
                    });
                }
                None => {
                    return Err(PublishError::Transport {
                        message: format!("device [{}] is not registered", self.device_id),
                    });
                }
            }
        }

        let idx = stable_hash(&self.device_id) as usize % self.state.partitions.len();
        self.state.partitions[idx].append(envelope.body).await;
        Ok(())
    }
}

#[async_trait]
impl EventStream for MemoryHub {
    async fn partition_ids(&self) -> Result<Vec<String>, ConsumeError> {
        Ok((0..self.state.partitions.len())
            .map(|i| i.to_string())
            .collect())
    }

    async fn open_reader(
        &self,
        partition: &str,
        from: SystemTime,
        poll_timeout: Option<Duration>,
    ) -> Result<Box<dyn PartitionSource>, ConsumeError> {
        let log = self.partition_log(partition)?;

        // Position the cursor past everything enqueued before `from`.
        let cursor = {
            let events = log.events.lock().await;
            events
                .iter()
                .position(|e| e.enqueued_at >= from)
                .unwrap_or(events.len())
        };

        Ok(Box::new(MemoryReader {
            partition: partition.to_string(),
            log,
            cursor,
            poll_timeout,
        }))
    }
}

/// Cursor-based reader over one in-memory partition log.
struct MemoryReader {
    partition: String,
    log: Arc<PartitionLog>,
    cursor: usize,
    poll_timeout: Option<Duration>,
}

#[async_trait]
impl PartitionSource for MemoryReader {
    async fn pull(&mut self) -> Result<Option<EventData>, ConsumeError> {
        loop {
            if self.log.poisoned.load(Ordering::SeqCst) {
                return Err(ConsumeError::Transport {
                    partition: self.partition.clone(),
                    message: "partition poisoned".into(),
                });
            }

            // Register with the notifier before the length check; a bare
            // `notified()` future does not count as a waiter until polled,
            // so an append landing between the check and the wait would be
            // missed without `enable`.
            let notified = self.log.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let events = self.log.events.lock().await;
                if self.cursor < events.len() {
                    let event = events[self.cursor].clone();
                    self.cursor += 1;
                    return Ok(Some(event));
                }
            }

            match self.poll_timeout {
                Some(bound) => {
                    if tokio::time::timeout(bound, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_create_reports_already_exists() {
        let hub = MemoryHub::new(2);
        let first = hub.create("sensor-1").await.unwrap();
        assert_eq!(first.id, "sensor-1");
        assert_eq!(first.primary_key.len(), KEY_LEN);

        let err = hub.create("sensor-1").await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyExists {
                id: "sensor-1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_reports_not_found() {
        let hub = MemoryHub::new(1);
        let err = hub.fetch("ghost").await.unwrap_err();
        assert_eq!(err, RegistryError::NotFound { id: "ghost".into() });
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected_at_publish() {
        let hub = MemoryHub::new(1);
        let identity = hub.create("sensor-1").await.unwrap();

        let forged = Identity {
            id: identity.id.clone(),
            primary_key: "not-the-key".into(),
        };
        let client = hub.device_client(&forged);
        let err = client.publish(Envelope::new(b"x".to_vec())).await.unwrap_err();
        assert!(matches!(err, PublishError::Transport { .. }));

        let client = hub.device_client(&identity);
        client.publish(Envelope::new(b"x".to_vec())).await.unwrap();
    }

    #[tokio::test]
    async fn test_reader_sees_only_events_after_open() {
        let hub = MemoryHub::new(1);
        hub.push_raw("0", b"old".to_vec()).await.unwrap();

        // Keep the open time strictly after the backlog's enqueue time.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut reader = hub
            .open_reader("0", SystemTime::now(), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        // Backlog is invisible.
        assert_eq!(reader.pull().await.unwrap(), None);

        hub.push_raw("0", b"new".to_vec()).await.unwrap();
        let event = reader.pull().await.unwrap().unwrap();
        assert_eq!(event.body, b"new".to_vec());
        assert_eq!(event.position, "1");
    }

    #[tokio::test]
    async fn test_device_routes_to_stable_partition() {
        let hub = MemoryHub::new(4);
        let identity = hub.create("sensor-1").await.unwrap();
        let target = hub.partition_for("sensor-1");

        let mut reader = hub
            .open_reader(&target, SystemTime::UNIX_EPOCH, Some(Duration::from_millis(20)))
            .await
            .unwrap();

        let client = hub.device_client(&identity);
        for i in 0..3u8 {
            client.publish(Envelope::new(vec![i])).await.unwrap();
        }
        for i in 0..3u8 {
            let event = reader.pull().await.unwrap().unwrap();
            assert_eq!(event.body, vec![i]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unbounded_pull_sees_appends_racing_the_wait() {
        // Unbounded pulls park on the notifier; an append landing between
        // the reader's empty check and its wait must still wake it.
        let hub = MemoryHub::new(1);
        let mut reader = hub
            .open_reader("0", SystemTime::UNIX_EPOCH, None)
            .await
            .unwrap();

        let producer = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..200u32 {
                    hub.push_raw("0", i.to_le_bytes().to_vec()).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let drained = async {
            for i in 0..200u32 {
                let event = reader.pull().await.unwrap().unwrap();
                assert_eq!(event.body, i.to_le_bytes().to_vec());
            }
        };
        tokio::time::timeout(Duration::from_secs(5), drained)
            .await
            .expect("reader parked with events sitting in the log");
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_poisoned_partition_fails_pull() {
        let hub = MemoryHub::new(2);
        hub.poison_partition("1").unwrap();

        let mut poisoned = hub
            .open_reader("1", SystemTime::UNIX_EPOCH, None)
            .await
            .unwrap();
        assert!(poisoned.pull().await.is_err());

        // Sibling partition still serves.
        hub.push_raw("0", b"ok".to_vec()).await.unwrap();
        let mut healthy = hub
            .open_reader("0", SystemTime::UNIX_EPOCH, None)
            .await
            .unwrap();
        assert!(healthy.pull().await.unwrap().is_some());
    }
}
