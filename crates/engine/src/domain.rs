//! Domain: the state shared by all participants
//!
//! A [`Domain`] owns the region registry and the control block. It hands out
//! one [`ParticipantContext`] per rank; contexts are `Send` and meant to be
//! moved into the thread that plays that rank. Several domains can coexist
//! in one process since nothing is global.

use crate::config::DomainConfig;
use crate::control::ControlBlock;
use crate::participant::ParticipantContext;
use std::sync::Arc;
use tagmem_concurrency::WaitPolicy;
use tagmem_core::{Error, Result};
use tagmem_storage::RegionRegistry;

/// State shared by every participant of a domain
#[derive(Debug)]
pub(crate) struct DomainShared {
    pub(crate) config: DomainConfig,
    pub(crate) policy: WaitPolicy,
    pub(crate) registry: RegionRegistry,
    pub(crate) control: ControlBlock,
}

/// A group of N cooperating participants over shared regions
#[derive(Debug, Clone)]
pub struct Domain {
    shared: Arc<DomainShared>,
}

impl Domain {
    /// Create a domain from a validated configuration
    pub fn new(config: DomainConfig) -> Result<Self> {
        config.validate()?;
        let policy = config.wait_policy();
        let control = ControlBlock::new(config.participants, policy)?;
        tracing::debug!(
            participants = config.participants,
            timeout_ms = config.default_timeout_ms,
            "domain created"
        );
        Ok(Self {
            shared: Arc::new(DomainShared {
                config,
                policy,
                registry: RegionRegistry::new(),
                control,
            }),
        })
    }

    /// Domain configuration
    pub fn config(&self) -> &DomainConfig {
        &self.shared.config
    }

    /// Number of participants
    pub fn participant_count(&self) -> usize {
        self.shared.config.participants
    }

    /// Region registry
    pub fn registry(&self) -> &RegionRegistry {
        &self.shared.registry
    }

    /// Control block
    pub fn control(&self) -> &ControlBlock {
        &self.shared.control
    }

    /// Context for `rank`
    ///
    /// Each rank must be claimed by exactly one thread; handing the same rank
    /// to two threads breaks every collective.
    pub fn participant(&self, rank: usize) -> Result<ParticipantContext> {
        if rank >= self.participant_count() {
            return Err(Error::invalid(format!(
                "rank {} is outside a domain of {} participants",
                rank,
                self.participant_count()
            )));
        }
        Ok(ParticipantContext::new(rank, Arc::clone(&self.shared)))
    }

    /// One context per rank, in rank order
    pub fn participants(&self) -> Vec<ParticipantContext> {
        (0..self.participant_count())
            .map(|rank| ParticipantContext::new(rank, Arc::clone(&self.shared)))
            .collect()
    }
}
