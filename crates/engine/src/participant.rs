//! One participant's view of a domain
//!
//! A [`ParticipantContext`] carries the rank and a handle on the shared
//! domain state. Region lifecycle operations are collective: every
//! participant calls them in the same order with the same arguments.
//!
//! ## Region creation
//!
//! ```text
//! use_existing:  open ─────────────────────────────► barrier
//! rank 0:        create ──► barrier ───────────────► barrier
//! rank != 0:                barrier ──► open ──────► barrier
//! ```
//!
//! Unnamed regions are named from a per-participant counter; since every
//! participant creates regions in the same order, all derive the same name.

use crate::control::ControlBlock;
use crate::domain::DomainShared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tagmem_concurrency::{SharedArray, TransactionHandle, TxItem, WaitPolicy};
use tagmem_core::{RegionConfig, Result};
use tagmem_storage::RegionRegistry;

/// Prefix of generated region names
pub const GENERATED_REGION_PREFIX: &str = "/tagmem_region_";

/// A participant: rank plus shared domain state
#[derive(Debug)]
pub struct ParticipantContext {
    rank: usize,
    shared: Arc<DomainShared>,
    region_counter: AtomicU64,
}

impl ParticipantContext {
    pub(crate) fn new(rank: usize, shared: Arc<DomainShared>) -> Self {
        Self {
            rank,
            shared,
            region_counter: AtomicU64::new(0),
        }
    }

    /// 0-based rank of this participant
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of participants in the domain
    pub fn participant_count(&self) -> usize {
        self.shared.config.participants
    }

    /// True for rank 0, the participant doing one-time initialization
    pub fn is_master(&self) -> bool {
        self.rank == 0
    }

    /// Wait policy of the domain
    pub fn policy(&self) -> WaitPolicy {
        self.shared.policy
    }

    pub(crate) fn control(&self) -> &ControlBlock {
        &self.shared.control
    }

    pub(crate) fn registry(&self) -> &RegionRegistry {
        &self.shared.registry
    }

    /// Create (or attach to) a region, collectively
    ///
    /// Rank 0 creates the region and the others attach after a barrier. With
    /// `use_existing` every participant attaches to a region already in the
    /// registry, failing with `RegionNotFound` if there is none. A trailing
    /// barrier makes the region visible to everyone before anyone uses it.
    pub fn create_region(&self, config: RegionConfig) -> Result<SharedArray> {
        config.validate()?;
        let mut config = config;
        let name = match config.name.clone() {
            Some(name) => name,
            None => {
                let n = self.region_counter.fetch_add(1, Ordering::Relaxed);
                config.persist = false;
                format!("{}{}", GENERATED_REGION_PREFIX, n)
            }
        };

        let region = if config.use_existing {
            let opened = self.registry().open(&name);
            self.barrier()?;
            opened?
        } else if self.is_master() {
            let created = self.registry().create(&name, &config);
            self.barrier()?;
            created?
        } else {
            self.barrier()?;
            self.registry().open(&name)?
        };
        self.barrier()?;

        tracing::debug!(
            region = %name,
            id = region.id().as_u32(),
            rank = self.rank,
            "region attached"
        );
        Ok(SharedArray::new(region, self.policy()))
    }

    /// Destroy a region, collectively
    ///
    /// The region leaves the registry if `unlink` is set or it is not
    /// persistent. Handles already held keep working on the detached region.
    /// Returns whether the region was removed.
    pub fn destroy_region(&self, array: &SharedArray, unlink: bool) -> Result<bool> {
        self.barrier()?;
        let removed = self.is_master() && self.registry().destroy(array.name(), unlink);
        if removed {
            tracing::debug!(region = array.name(), unlink, "region destroyed");
        }
        self.barrier()?;
        Ok(!self.registry().contains(array.name()))
    }

    /// Begin a transaction over `items`
    ///
    /// Shorthand for [`tagmem_concurrency::transaction_begin`].
    pub fn transaction_begin(
        &self,
        items: impl IntoIterator<Item = TxItem>,
    ) -> Result<TransactionHandle> {
        tagmem_concurrency::transaction_begin(items)
    }
}
