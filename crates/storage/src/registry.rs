//! Region registry
//!
//! Every domain owns one [`RegionRegistry`]: the name → region table that
//! participants use to attach to a region created by rank 0.
//!
//! # Design
//!
//! - DashMap keyed by name: attaching never blocks unrelated regions
//! - Region ids come from a monotonic counter and are never reused, so
//!   `(RegionId, address)` stays a valid total order for the whole domain
//! - Id 0 is reserved for the domain's control region

use crate::region::Region;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tagmem_core::{Error, RegionConfig, RegionId, Result};

/// Id reserved for the domain control region
pub const CONTROL_REGION_ID: RegionId = RegionId(0);

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Name → region table for one domain
#[derive(Debug)]
pub struct RegionRegistry {
    regions: FxDashMap<String, Arc<Region>>,
    next_id: AtomicU32,
}

impl RegionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            regions: DashMap::with_hasher(Default::default()),
            next_id: AtomicU32::new(CONTROL_REGION_ID.as_u32() + 1),
        }
    }

    /// Create and register a region, replacing any region of the same name
    pub fn create(&self, name: &str, config: &RegionConfig) -> Result<Arc<Region>> {
        config.validate()?;
        let id = RegionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let region = Arc::new(Region::new(id, name, config)?);
        if let Some(old) = self.regions.insert(name.to_string(), Arc::clone(&region)) {
            tracing::debug!(region = name, old_id = old.id().as_u32(), "replaced existing region");
        }
        Ok(region)
    }

    /// Look up a registered region
    pub fn open(&self, name: &str) -> Result<Arc<Region>> {
        self.regions
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| Error::RegionNotFound(name.to_string()))
    }

    /// Drop a region from the registry
    ///
    /// Persistent regions stay registered unless `unlink` is set. Returns
    /// true if the region was removed.
    pub fn destroy(&self, name: &str, unlink: bool) -> bool {
        let removed = self
            .regions
            .remove_if(name, |_, region| unlink || !region.is_persistent())
            .is_some();
        tracing::debug!(region = name, unlink, removed, "region destroyed");
        removed
    }

    /// True if a region of this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    /// Number of registered regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True if no region is registered
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Names of all registered regions, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.regions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
