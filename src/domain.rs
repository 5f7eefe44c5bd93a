//! Main entry point for tagmem.
//!
//! This module provides the `TagMem` struct: a domain of cooperating
//! participants plus helpers to run them on threads.

use std::path::Path;
use std::thread;
use std::time::Duration;
use tagmem_core::Result;
use tagmem_engine::{Domain, DomainConfig, ParticipantContext};

/// A tagged shared-memory domain
///
/// Create one with [`TagMem::new`] or [`TagMem::builder`], then either hand
/// each thread its own [`ParticipantContext`] or let [`TagMem::run`] spawn
/// them.
///
/// # Example
///
/// ```ignore
/// use tagmem::prelude::*;
///
/// let mem = TagMem::new(4)?;
/// let ranks = mem.run(|ctx| {
///     ctx.barrier()?;
///     Ok(ctx.rank())
/// })?;
/// assert_eq!(ranks, vec![0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct TagMem {
    domain: Domain,
}

impl TagMem {
    /// Open a domain of `participants` with default settings
    pub fn new(participants: usize) -> Result<Self> {
        Self::builder().participants(participants).open()
    }

    /// Open a domain from a TOML configuration file
    pub fn open(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().config(DomainConfig::load(config_path)?).open()
    }

    /// Create a builder for domain configuration
    pub fn builder() -> TagMemBuilder {
        TagMemBuilder::new()
    }

    /// Underlying engine domain
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Domain configuration
    pub fn config(&self) -> &DomainConfig {
        self.domain.config()
    }

    /// Number of participants
    pub fn participant_count(&self) -> usize {
        self.domain.participant_count()
    }

    /// Context for one rank
    pub fn participant(&self, rank: usize) -> Result<ParticipantContext> {
        self.domain.participant(rank)
    }

    /// One context per rank, in rank order
    pub fn participants(&self) -> Vec<ParticipantContext> {
        self.domain.participants()
    }

    /// Names of the regions currently registered, sorted
    pub fn region_names(&self) -> Vec<String> {
        self.domain.registry().names()
    }

    /// Run `body` once per participant, each on its own thread
    ///
    /// Returns the results in rank order, or the error of the lowest rank
    /// that failed. A panic in any participant is propagated once every
    /// thread has finished.
    pub fn run<R, F>(&self, body: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&ParticipantContext) -> Result<R> + Sync,
    {
        let body = &body;
        let outcomes: Vec<thread::Result<Result<R>>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .participants()
                .into_iter()
                .map(|ctx| s.spawn(move || body(&ctx)))
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        results.into_iter().collect()
    }
}

/// Builder for domain configuration
///
/// # Example
///
/// ```ignore
/// let mem = TagMem::builder()
///     .participants(8)
///     .default_timeout(Duration::from_secs(5))
///     .open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagMemBuilder {
    config: DomainConfig,
}

impl TagMemBuilder {
    /// Create a builder with default settings (one participant)
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every setting with `config`
    pub fn config(mut self, config: DomainConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of cooperating participants
    pub fn participants(mut self, participants: usize) -> Self {
        self.config.participants = participants;
        self
    }

    /// Timeout applied to every wait point
    ///
    /// Saturates at `u64::MAX` milliseconds.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Ceiling of the back-off sleep between retries
    ///
    /// Saturates at `u64::MAX` microseconds.
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.config.max_backoff_us = u64::try_from(max_backoff.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Open the domain
    pub fn open(self) -> Result<TagMem> {
        Ok(TagMem {
            domain: Domain::new(self.config)?,
        })
    }
}
