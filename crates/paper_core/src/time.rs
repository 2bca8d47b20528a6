//! Fixed-tick simulation time
//!
//! The host ticks scripts at a fixed rate and hands each `on_update` the
//! tick length in seconds.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_duration: Duration,
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_rate(DEFAULT_TICK_RATE_HZ)
    }

    /// A tick rate of zero is clamped to 1 Hz.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        let hz = tick_rate_hz.max(1);
        Self {
            tick_duration: Duration::from_micros(1_000_000 / u64::from(hz)),
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Delta passed to `on_update`, in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    /// Advance by one tick and return its delta in seconds.
    pub fn advance_tick(&mut self) -> f32 {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
        self.delta_seconds()
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
