//! Domain configuration
//!
//! A [`DomainConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! participants = 4
//! default_timeout_ms = 30000
//! max_backoff_us = 500
//! ```
//!
//! Missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tagmem_concurrency::{WaitPolicy, DEFAULT_MAX_BACKOFF, DEFAULT_TIMEOUT};
use tagmem_core::{Error, Result};

/// Settings shared by every participant of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Number of cooperating participants
    pub participants: usize,
    /// Timeout applied to every wait point, in milliseconds
    pub default_timeout_ms: u64,
    /// Ceiling of the back-off sleep, in microseconds
    pub max_backoff_us: u64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            participants: 1,
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_backoff_us: DEFAULT_MAX_BACKOFF.as_micros() as u64,
        }
    }
}

impl DomainConfig {
    /// Default configuration for `participants` participants
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::invalid(format!("invalid domain config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid(format!("cannot read domain config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::invalid(format!("cannot encode domain config: {}", e)))
    }

    /// Reject configurations no domain can run with
    pub fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(Error::invalid("a domain needs at least one participant"));
        }
        if i64::try_from(self.participants).is_err() {
            return Err(Error::invalid(format!("{} participants is too many", self.participants)));
        }
        if self.default_timeout_ms == 0 {
            return Err(Error::invalid("default_timeout_ms must be positive"));
        }
        if self.max_backoff_us == 0 {
            return Err(Error::invalid("max_backoff_us must be positive"));
        }
        Ok(())
    }

    /// Timeout applied to every wait point
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Ceiling of the back-off sleep
    pub fn max_backoff(&self) -> Duration {
        Duration::from_micros(self.max_backoff_us)
    }

    /// Wait policy handed to every array of the domain
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.default_timeout(), self.max_backoff())
    }
}
