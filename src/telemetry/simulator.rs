//! # Simulator: sequential best-effort batch emitter.
//!
//! Emits a fixed-size batch of synthetic readings for one device, one per
//! tick, publishing each individually.
//!
//! ## Flow
//! ```text
//! run(identity, publisher)
//!   ├─► optional warmup sleep (lets a fresh receiver open its readers)
//!   └─► for sequence in 1..=count:
//!         ├─► draw temperature ∈ [20, 35), humidity ∈ [60, 80)
//!         ├─► publish envelope (JSON body + temperatureAlert header)
//!         │     ├─ Ok  ──► publish ReadingSent, sent += 1
//!         │     └─ Err ──► publish PublishRejected   (loop continues)
//!         └─► sleep(interval) unless this was the last tick
//!   └─► publish BatchFinished{ sent }, return sent
//! ```
//!
//! ## Rules
//! - Ticks are **strictly sequential**; there is never more than one publish
//!   in flight.
//! - A publish failure is absorbed: the reading is dropped, the next tick
//!   still runs (best-effort telemetry; partial delivery is acceptable).
//! - `sequence` increments on every tick, sent or not, so it stays exactly
//!   `1..=count` in emission order.

use rand::Rng;
use tokio::time;

use crate::config::SimulatorConfig;
use crate::events::{Bus, Event, EventKind};
use crate::hub::{Identity, Publish};

use super::reading::Reading;

/// Sequential synthetic-telemetry emitter for one device.
pub struct Simulator {
    /// Batch parameters.
    pub cfg: SimulatorConfig,
    /// Event bus for lifecycle reporting.
    pub bus: Bus,
}

impl Simulator {
    /// Creates a simulator with the given configuration.
    pub fn new(cfg: SimulatorConfig, bus: Bus) -> Self {
        Self { cfg, bus }
    }

    /// Runs one batch and returns the number of successfully published
    /// readings.
    ///
    /// Never fails fatally mid-batch: per-reading publish errors are
    /// reported on the bus and absorbed. A return of `0` is a degraded but
    /// non-fatal outcome the caller may surface.
    pub async fn run<P: Publish + ?Sized>(&self, identity: &Identity, publisher: &P) -> u64 {
        if let Some(warmup) = self.cfg.warmup_delay() {
            time::sleep(warmup).await;
        }

        let mut sent: u64 = 0;
        for sequence in 1..=self.cfg.count {
            let reading = self.draw(sequence, &identity.id);

            match publisher.publish(reading.to_envelope()).await {
                Ok(()) => {
                    sent += 1;
                    self.bus.publish(
                        Event::now(EventKind::ReadingSent)
                            .with_device(identity.id.as_str())
                            .with_sequence(sequence),
                    );
                }
                Err(e) => {
                    self.bus.publish(
                        Event::now(EventKind::PublishRejected)
                            .with_device(identity.id.as_str())
                            .with_sequence(sequence)
                            .with_reason(e.to_string()),
                    );
                }
            }

            if sequence < self.cfg.count {
                time::sleep(self.cfg.interval).await;
            }
        }

        self.bus.publish(
            Event::now(EventKind::BatchFinished)
                .with_device(identity.id.as_str())
                .with_sequence(sent),
        );
        sent
    }

    /// Draws one reading; jitter is part of the simulated signal.
    fn draw(&self, sequence: u64, device_id: &str) -> Reading {
        let mut rng = rand::thread_rng();
        let temperature = rng.gen_range(20.0..35.0);
        let humidity = rng.gen_range(60.0..80.0);
        Reading::new(sequence, device_id, temperature, humidity)
    }
}
