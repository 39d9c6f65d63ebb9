//! End-to-end pipeline over an in-process hub: provision a device, stream a
//! batch of synthetic readings, and consume them across all partitions.
//!
//! The receiver runs until the producer batch is done and its readings have
//! drained, or until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use hubflow::{
    Bus, Delivery, HandlerFn, LogWriter, MemoryHub, Reading, Receiver, ReceiverConfig, Registrar,
    Simulator, SimulatorConfig, Subscribe,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let hub = Arc::new(MemoryHub::new(4));

    // Consumer side first, so no reading is published before its reader is
    // watching.
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let receiver = Receiver::new(
        ReceiverConfig {
            poll_timeout: Duration::from_millis(500),
            ..ReceiverConfig::default()
        },
        subs,
    );
    let handler = HandlerFn::arc(|d: Delivery| async move {
        match Reading::from_body(&d.body) {
            Ok(reading) => println!(
                "partition {} @{}: #{} {}  {:.1}°C  {:.1}%  alert={}",
                d.partition,
                d.position,
                reading.sequence,
                reading.device_id,
                reading.temperature,
                reading.humidity,
                reading.alert,
            ),
            Err(e) => eprintln!("partition {}: undecodable body: {e}", d.partition),
        }
    });

    let consumer = {
        let hub = hub.clone();
        tokio::spawn(async move { receiver.run(hub, handler).await })
    };

    // Producer side: provision, warm up, emit.
    let bus = Bus::new(256);
    let registrar = Registrar::new(hub.clone(), bus.clone());
    let (identity, found) = registrar.ensure("sensor-1").await?;
    if found {
        println!("device [{}] already registered, key fetched", identity.id);
    } else {
        println!("device [{}] registered, key generated", identity.id);
    }

    let simulator = Simulator::new(
        SimulatorConfig {
            count: 10,
            interval: Duration::from_secs(1),
            warmup: Duration::from_millis(200),
        },
        bus,
    );
    let client = hub.device_client(&identity);
    let sent = simulator.run(&identity, &client).await;
    println!("{sent} of 10 readings sent; press Ctrl-C to stop the receiver");

    consumer.await??;
    Ok(())
}
