use std::time::Duration;

/// Configuration for a recording session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ring buffer capacity in frames (default: 256).
    pub ring_capacity: usize,

    /// Upper bound on device acquisition during `start()` (default: 2s).
    pub acquire_timeout: Duration,

    /// Upper bound on waiting for the capture thread during `stop()` (default: 1s).
    pub shutdown_timeout: Duration,

    /// Granularity of bounded waits (default: 5ms).
    pub poll_interval: Duration,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.ring_capacity == 0 {
            return Err("ring capacity must be at least one frame".into());
        }
        if self.acquire_timeout.is_zero() {
            return Err("acquire timeout must be positive".into());
        }
        if self.shutdown_timeout.is_zero() {
            return Err("shutdown timeout must be positive".into());
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be positive".into());
        }
        if self.poll_interval >= self.acquire_timeout
            || self.poll_interval >= self.shutdown_timeout
        {
            return Err(format!(
                "poll interval ({}ms) must be shorter than both timeouts",
                self.poll_interval.as_millis()
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 256,
            acquire_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(5),
        }
    }
}
