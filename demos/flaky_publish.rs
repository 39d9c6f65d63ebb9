//! Best-effort telemetry under an unreliable transport: every third publish
//! fails, the batch keeps going, and the sent count reports what actually
//! made it out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use hubflow::{
    Bus, Envelope, Identity, LogWriter, Publish, PublishError, Simulator, SimulatorConfig,
    Subscribe, SubscriberSet,
};

/// Transport that drops every third envelope.
struct FlakyTransport {
    inner: Box<dyn Publish>,
    calls: AtomicU64,
}

#[async_trait]
impl Publish for FlakyTransport {
    async fn publish(&self, envelope: Envelope) -> Result<(), PublishError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call % 3 == 0 {
            return Err(PublishError::Transport {
                message: format!("simulated outage on publish #{call}"),
            });
        }
        self.inner.publish(envelope).await
    }
}

/// Sink that accepts everything.
struct NullSink;

#[async_trait]
impl Publish for NullSink {
    async fn publish(&self, _envelope: Envelope) -> Result<(), PublishError> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let bus = Bus::new(256);

    // Wire the log subscriber to see ReadingSent / PublishRejected lines.
    let subs = SubscriberSet::new(vec![Arc::new(LogWriter) as Arc<dyn Subscribe>], bus.clone());
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            subs.emit(&ev);
        }
    });

    let identity = Identity {
        id: "sensor-flaky".into(),
        primary_key: "unused".into(),
    };
    let transport = FlakyTransport {
        inner: Box::new(NullSink),
        calls: AtomicU64::new(0),
    };

    let simulator = Simulator::new(
        SimulatorConfig {
            count: 10,
            interval: Duration::from_millis(300),
            warmup: Duration::ZERO,
        },
        bus,
    );
    let sent = simulator.run(&identity, &transport).await;

    if sent == 0 {
        println!("no reading made it out (degraded, not fatal)");
    } else {
        println!("{sent} of 10 readings sent despite the outages");
    }

    // Let the log subscriber drain its queue before exiting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
