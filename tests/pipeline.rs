//! End-to-end pipeline tests over the in-process hub: provision, simulate,
//! fan out, cancel.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hubflow::{
    Bus, Delivery, HandlerFn, HandlerRef, MemoryHub, Reading, Receiver, ReceiverConfig, Registrar,
    Simulator, SimulatorConfig,
};

fn fast_receiver() -> Receiver {
    Receiver::new(
        ReceiverConfig {
            poll_timeout: Duration::from_millis(10),
            grace: Duration::from_secs(5),
            bus_capacity: 256,
        },
        vec![],
    )
}

fn collecting_handler() -> (HandlerRef, Arc<Mutex<Vec<Delivery>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef = {
        let seen = seen.clone();
        HandlerFn::arc(move |delivery: Delivery| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(delivery);
            }
        })
    };
    (handler, seen)
}

#[tokio::test]
async fn readings_flow_from_simulator_to_handler_in_order() {
    let hub = Arc::new(MemoryHub::new(4));
    let bus = Bus::new(256);

    let registrar = Registrar::new(hub.clone(), bus.clone());
    let (identity, found) = registrar.ensure("sensor-1").await.unwrap();
    assert!(!found);

    // Start the receiver before the producer so the from-now readers see
    // the whole batch.
    let receiver = fast_receiver();
    let (handler, seen) = collecting_handler();
    let token = CancellationToken::new();
    let consumer = {
        let hub = hub.clone();
        let token = token.clone();
        tokio::spawn(async move { receiver.run_with_token(hub, handler, token).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let simulator = Simulator::new(
        SimulatorConfig {
            count: 10,
            interval: Duration::from_millis(5),
            warmup: Duration::ZERO,
        },
        bus,
    );
    let client = hub.device_client(&identity);
    let sent = simulator.run(&identity, &client).await;
    assert_eq!(sent, 10);

    // Let the deliveries drain, then cancel.
    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    consumer.await.unwrap().unwrap();

    let deliveries = seen.lock().unwrap();
    assert_eq!(deliveries.len(), 10);

    // One device routes to one partition, so order is preserved end to end.
    let partitions: BTreeSet<_> = deliveries.iter().map(|d| d.partition.clone()).collect();
    assert_eq!(partitions.len(), 1);

    let sequences: Vec<u64> = deliveries
        .iter()
        .map(|d| Reading::from_body(&d.body).unwrap().sequence)
        .collect();
    assert_eq!(sequences, (1..=10).collect::<Vec<u64>>());
}

#[tokio::test]
async fn two_devices_fan_out_and_cancellation_converges() {
    let hub = Arc::new(MemoryHub::new(8));
    let bus = Bus::new(256);
    let registrar = Registrar::new(hub.clone(), bus.clone());

    let receiver = fast_receiver();
    let (handler, seen) = collecting_handler();
    let token = CancellationToken::new();
    let consumer = {
        let hub = hub.clone();
        let token = token.clone();
        tokio::spawn(async move { receiver.run_with_token(hub, handler, token).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    for device in ["sensor-a", "sensor-b"] {
        let (identity, _) = registrar.ensure(device).await.unwrap();
        let simulator = Simulator::new(
            SimulatorConfig {
                count: 5,
                interval: Duration::from_millis(2),
                warmup: Duration::ZERO,
            },
            bus.clone(),
        );
        let client = hub.device_client(&identity);
        assert_eq!(simulator.run(&identity, &client).await, 5);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    // Convergence is bounded by the 10ms poll timeout, far under this cap.
    tokio::time::timeout(Duration::from_secs(2), consumer)
        .await
        .expect("receiver did not stop after cancellation")
        .unwrap()
        .unwrap();

    let deliveries = seen.lock().unwrap();
    assert_eq!(deliveries.len(), 10);

    let devices: BTreeSet<String> = deliveries
        .iter()
        .map(|d| Reading::from_body(&d.body).unwrap().device_id)
        .collect();
    assert_eq!(
        devices,
        BTreeSet::from(["sensor-a".to_string(), "sensor-b".to_string()])
    );
}

#[tokio::test]
async fn malformed_events_are_skipped_end_to_end() {
    let hub = Arc::new(MemoryHub::new(1));

    let receiver = fast_receiver();
    let (handler, seen) = collecting_handler();
    let token = CancellationToken::new();
    let consumer = {
        let hub = hub.clone();
        let token = token.clone();
        tokio::spawn(async move { receiver.run_with_token(hub, handler, token).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    hub.push_raw("0", Vec::new()).await.unwrap(); // malformed
    hub.push_raw("0", b"payload".to_vec()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    consumer.await.unwrap().unwrap();

    // The empty body never reached the handler, and the reader survived to
    // deliver the next event.
    let deliveries = seen.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].body, b"payload".to_vec());
}
