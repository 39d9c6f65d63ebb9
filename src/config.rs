//! # Runtime configuration for the producer and consumer sides.
//!
//! Two independent configs, one per process role:
//! - [`SimulatorConfig`] — batch size, tick interval, optional warmup delay.
//! - [`ReceiverConfig`] — poll timeout, shutdown grace, event bus capacity.
//!
//! ## Sentinel values
//! - `SimulatorConfig::warmup = 0s` → no warmup delay before the first tick
//! - `ReceiverConfig::poll_timeout = 0s` → unbounded blocking pull
//! - `ReceiverConfig::grace = 0s` → no wait after a shutdown signal

use std::time::Duration;

/// Configuration for one simulator run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Number of readings to emit in the batch.
    pub count: u64,

    /// Delay between consecutive ticks.
    pub interval: Duration,

    /// Delay before the first tick.
    ///
    /// Gives a freshly started receiver time to open its partition readers;
    /// readings published before that would be invisible to it (readers
    /// start at "now").
    pub warmup: Duration,
}

impl SimulatorConfig {
    /// Returns the warmup delay as an `Option` (`None` = start immediately).
    #[inline]
    pub fn warmup_delay(&self) -> Option<Duration> {
        (!self.warmup.is_zero()).then_some(self.warmup)
    }
}

impl Default for SimulatorConfig {
    /// Defaults: 10 readings, one per second, no warmup.
    fn default() -> Self {
        Self {
            count: 10,
            interval: Duration::from_secs(1),
            warmup: Duration::ZERO,
        }
    }
}

/// Configuration for the receiver runtime.
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Maximum time a partition pull may block before yielding a no-event
    /// tick.
    ///
    /// - `0s` = unbounded pull (the base design); a silent partition parks
    ///   its reader until the pull returns for another reason.
    /// - `> 0` = the transport returns `Ok(None)` after this long, which
    ///   bounds shutdown latency: cancellation is observed at the top of
    ///   each loop iteration.
    pub poll_timeout: Duration,

    /// Maximum time to wait for readers to stop after a shutdown signal.
    ///
    /// Exceeding it yields [`ReceiverError::GraceExceeded`](crate::ReceiverError)
    /// with the list of stuck partitions.
    pub grace: Duration,

    /// Capacity of the event bus broadcast ring buffer (min 1, clamped).
    pub bus_capacity: usize,
}

impl ReceiverConfig {
    /// Returns the poll timeout as an `Option` (`None` = unbounded pull).
    #[inline]
    pub fn poll_timeout_bound(&self) -> Option<Duration> {
        (!self.poll_timeout.is_zero()).then_some(self.poll_timeout)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ReceiverConfig {
    /// Default configuration:
    ///
    /// - `poll_timeout = 1s` (bounded shutdown latency)
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sentinels_map_to_none() {
        let sim = SimulatorConfig {
            warmup: Duration::ZERO,
            ..SimulatorConfig::default()
        };
        assert_eq!(sim.warmup_delay(), None);

        let rx = ReceiverConfig {
            poll_timeout: Duration::ZERO,
            ..ReceiverConfig::default()
        };
        assert_eq!(rx.poll_timeout_bound(), None);
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let rx = ReceiverConfig {
            bus_capacity: 0,
            ..ReceiverConfig::default()
        };
        assert_eq!(rx.bus_capacity_clamped(), 1);
    }
}
