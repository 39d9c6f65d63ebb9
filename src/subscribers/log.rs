//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [device-created] device=sensor-1
//! [sent] device=sensor-1 seq=3
//! [publish-rejected] device=sensor-1 seq=4 reason="link down"
//! [reader-started] partition=0
//! [delivered] partition=0 position=12
//! [malformed] partition=1 reason="empty body"
//! [reader-failed] partition=2 reason="link down"
//! [reader-stopped] partition=0
//! [shutdown-requested]
//! [all-readers-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Useful for demos and debugging. Implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::DeviceCreated => {
                println!("[device-created] device={:?}", e.device);
            }
            EventKind::DeviceFetched => {
                println!("[device-fetched] device={:?}", e.device);
            }
            EventKind::ReadingSent => {
                println!("[sent] device={:?} seq={:?}", e.device, e.sequence);
            }
            EventKind::PublishRejected => {
                println!(
                    "[publish-rejected] device={:?} seq={:?} reason={:?}",
                    e.device, e.sequence, e.reason
                );
            }
            EventKind::BatchFinished => {
                println!("[batch-finished] device={:?} sent={:?}", e.device, e.sequence);
            }
            EventKind::ReaderStarted => {
                println!("[reader-started] partition={:?}", e.partition);
            }
            EventKind::Delivered => {
                println!(
                    "[delivered] partition={:?} position={:?}",
                    e.partition, e.position
                );
            }
            EventKind::MalformedEvent => {
                println!(
                    "[malformed] partition={:?} reason={:?}",
                    e.partition, e.reason
                );
            }
            EventKind::ReaderFailed => {
                println!(
                    "[reader-failed] partition={:?} reason={:?}",
                    e.partition, e.reason
                );
            }
            EventKind::ReaderStopped => {
                println!("[reader-stopped] partition={:?}", e.partition);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllReadersStopped => {
                println!("[all-readers-stopped]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                println!("[subscriber-issue] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
