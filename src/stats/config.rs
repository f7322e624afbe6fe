//! Stats configuration

use std::time::Duration;

use super::node::RateStat;

/// Configuration for stats collection
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Trailing window used by bitrate accumulators
    pub bitrate_period: Duration,

    /// Multiplier applied to accumulated units (8.0 = bytes to bits)
    pub bitrate_scale: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bitrate_period: Duration::from_secs(10),
            bitrate_scale: 8.0,
        }
    }
}

impl StatsConfig {
    /// Set the bitrate window
    pub fn bitrate_period(mut self, period: Duration) -> Self {
        self.bitrate_period = period;
        self
    }

    /// Set the bitrate scale factor
    pub fn bitrate_scale(mut self, scale: f64) -> Self {
        self.bitrate_scale = scale;
        self
    }

    /// Build an empty bitrate accumulator with these settings
    pub fn bitrate_stat(&self) -> RateStat {
        RateStat::new(self.bitrate_period, self.bitrate_scale)
    }
}
