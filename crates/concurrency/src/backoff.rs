//! Bounded waiting with exponential back-off
//!
//! Every wait point retries its precondition, sleeping between attempts. The
//! sleep starts at one nanosecond and doubles up to the policy's ceiling. A
//! wait that outlives its timeout fails with [`Error::Timeout`].

use std::time::{Duration, Instant};
use tagmem_core::{Error, Result};

/// Default limit on any single wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default ceiling for the back-off sleep
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(1);

/// Sleeps shorter than this yield instead of entering the scheduler
const YIELD_THRESHOLD: Duration = Duration::from_micros(1);

/// Exponential back-off state for one wait
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Start a back-off capped at `max`
    pub fn new(max: Duration) -> Self {
        Self {
            current: Duration::from_nanos(1),
            max: max.max(Duration::from_nanos(1)),
        }
    }

    /// Wait once, then double the next wait
    pub fn snooze(&mut self) {
        if self.current < YIELD_THRESHOLD {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.current);
        }
        self.current = (self.current * 2).min(self.max);
    }

    /// Length of the next wait
    pub fn current(&self) -> Duration {
        self.current
    }
}

/// Timeout and back-off settings shared by the wait points of one array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Longest a single wait may last
    pub timeout: Duration,
    /// Ceiling for the back-off sleep
    pub max_backoff: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl WaitPolicy {
    /// Policy with the given limits
    pub fn new(timeout: Duration, max_backoff: Duration) -> Self {
        Self {
            timeout,
            max_backoff,
        }
    }

    /// Same back-off, different timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Retry `attempt` until it yields a value or the timeout elapses
    ///
    /// `attempt` returns `Ok(None)` when its precondition does not hold yet.
    /// Errors from `attempt` are returned immediately.
    pub fn wait_until<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<Option<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let mut backoff = Backoff::new(self.max_backoff);
        loop {
            if let Some(v) = attempt()? {
                return Ok(v);
            }
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                tracing::warn!(operation, elapsed_ms = elapsed.as_millis() as u64, "wait timed out");
                return Err(Error::Timeout { operation, elapsed });
            }
            backoff.snooze();
        }
    }
}
