//! Full/empty synchronization primitives
//!
//! [`SharedArray`] is a participant's handle on a region. Every tagged
//! operation follows the same protocol:
//!
//! 1. Wait (with back-off) until the cell's tag satisfies the precondition,
//!    then move it to `Busy` with a single compare-and-swap
//! 2. Read or write the value while holding `Busy`
//! 3. Publish the final tag
//!
//! | Operation   | Waits for            | Leaves     |
//! |-------------|----------------------|------------|
//! | `write_ef`  | Empty                | Full       |
//! | `write_xf`  | anything but Busy    | Full       |
//! | `write_xe`  | anything but Busy    | Empty      |
//! | `read_fe`   | Full                 | Empty      |
//! | `read_ff`   | Full                 | Full       |
//! | `read_rw`   | Full or RwLocked     | RwLocked   |
//! | `faa`/`cas` | Full                 | Full       |
//! | `read`/`write` | nothing (untagged) | unchanged |
//!
//! `write_xf`/`write_xe` and `set_tag` evict shared readers: the reader count
//! is cleared with the tag, and a later `release_rw` is a protocol violation.
//!
//! Operations on one cell serialize through its tag; operations on different
//! cells never interact.

use crate::backoff::WaitPolicy;
use std::sync::Arc;
use std::time::Duration;
use tagmem_core::{Error, Key, RegionId, Result, Tag, Value};
use tagmem_storage::{CellStore, Region, TagWord, TaggedCell};

/// A participant's handle on one region
#[derive(Debug, Clone)]
pub struct SharedArray {
    region: Arc<Region>,
    policy: WaitPolicy,
}

impl SharedArray {
    /// Wrap a region with the given wait policy
    pub fn new(region: Arc<Region>, policy: WaitPolicy) -> Self {
        Self { region, policy }
    }

    /// Underlying region
    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    /// Region name
    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Region identifier
    pub fn id(&self) -> RegionId {
        self.region.region_id()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.region.len()
    }

    /// True if the region has no cells
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Wait policy applied to every wait point
    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Handle on the same region with a different timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            region: Arc::clone(&self.region),
            policy: self.policy.with_timeout(timeout),
        }
    }

    /// Resolve a key to a cell address
    pub fn resolve(&self, key: &Key, allocate: bool) -> Result<Option<usize>> {
        self.region.resolve(key, allocate)
    }

    /// Key stored at `index` of a key-mapped region
    pub fn index_to_key(&self, index: usize) -> Result<Option<Key>> {
        self.region.index_to_key(index)
    }

    /// Current tag of a cell, without waiting
    pub fn tag(&self, key: impl Into<Key>) -> Result<Tag> {
        let key = key.into();
        match self.resolve(&key, false)? {
            Some(addr) => Ok(self.region.cell(addr)?.tag()),
            None => Err(Error::invalid(format!("key {} is not present in {}", key, self.name()))),
        }
    }

    // ========================================================================
    // Untagged access
    // ========================================================================

    /// Read a value, ignoring the tag
    ///
    /// A missing key of a mapped region reads as `Undefined` and is not
    /// allocated.
    pub fn read(&self, key: impl Into<Key>) -> Result<Value> {
        match self.resolve(&key.into(), false)? {
            Some(addr) => Ok(self.region.cell(addr)?.read_value()),
            None => Ok(Value::Undefined),
        }
    }

    /// Write a value, leaving the tag unchanged
    pub fn write(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let addr = self.locate(&key.into())?;
        self.write_at(addr, value.into())
    }

    /// Alias for [`read`](Self::read)
    pub fn get(&self, key: impl Into<Key>) -> Result<Value> {
        self.read(key)
    }

    /// Alias for [`write`](Self::write)
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        self.write(key, value)
    }

    // ========================================================================
    // Tagged writes
    // ========================================================================

    /// Wait for Empty, write, mark Full
    pub fn write_ef(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let addr = self.locate(&key.into())?;
        self.write_ef_at(addr, value.into())
    }

    /// Wait until the cell is not Busy, write, mark Full
    ///
    /// An RwLocked cell is overwritten and its readers are evicted.
    pub fn write_xf(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let addr = self.locate(&key.into())?;
        self.write_held("write_xf", addr, value.into(), Tag::Full)
    }

    /// Wait until the cell is not Busy, write, mark Empty
    ///
    /// An RwLocked cell is overwritten and its readers are evicted.
    pub fn write_xe(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let addr = self.locate(&key.into())?;
        self.write_held("write_xe", addr, value.into(), Tag::Empty)
    }

    /// Force the tag to Full or Empty without waiting
    ///
    /// Clears the reader count of an RwLocked cell, so its readers no longer
    /// hold it and their `release_rw` fails.
    pub fn set_tag(&self, key: impl Into<Key>, tag: Tag) -> Result<()> {
        if !tag.is_stable() {
            return Err(Error::invalid(format!("set_tag accepts Full or Empty, got {}", tag)));
        }
        let addr = self.locate(&key.into())?;
        self.set_tag_at(addr, tag)
    }

    // ========================================================================
    // Tagged reads
    // ========================================================================

    /// Wait for Full, read, mark Empty
    pub fn read_fe(&self, key: impl Into<Key>) -> Result<Value> {
        let addr = self.locate(&key.into())?;
        self.read_fe_at(addr)
    }

    /// Wait for Full, read, leave Full
    pub fn read_ff(&self, key: impl Into<Key>) -> Result<Value> {
        let addr = self.locate(&key.into())?;
        let cell = self.region.cell(addr)?;
        self.acquire("read_ff", cell, |w| w.tag() == Tag::Full)?;
        let value = cell.read_value();
        cell.set_tag(Tag::Full);
        Ok(value)
    }

    /// Join the shared readers of a cell and read it
    ///
    /// Must be paired with [`release_rw`](Self::release_rw).
    pub fn read_rw(&self, key: impl Into<Key>) -> Result<Value> {
        let addr = self.locate(&key.into())?;
        self.read_rw_at(addr)
    }

    /// Leave the shared readers of a cell
    ///
    /// Returns the number of readers still holding the cell; the last reader
    /// restores Full.
    pub fn release_rw(&self, key: impl Into<Key>) -> Result<u32> {
        let key = key.into();
        match self.resolve(&key, false)? {
            Some(addr) => self.release_rw_at(addr),
            None => Err(Error::protocol(format!(
                "release_rw on {} key {} that was never read",
                self.name(),
                key
            ))),
        }
    }

    // ========================================================================
    // Atomic read-modify-write
    // ========================================================================

    /// Fetch-and-add: wait for Full, add `delta`, return the previous value
    ///
    /// Both the stored value and `delta` must be numeric; otherwise the cell
    /// is left unchanged and `TypeMismatch` is returned.
    pub fn faa(&self, key: impl Into<Key>, delta: impl Into<Value>) -> Result<Value> {
        let addr = self.locate(&key.into())?;
        let delta = delta.into();
        let cell = self.region.cell(addr)?;
        self.acquire("faa", cell, |w| w.tag() == Tag::Full)?;
        let result = {
            let mut value = cell.value();
            value.checked_add(&delta).map(|sum| std::mem::replace(&mut *value, sum))
        };
        cell.set_tag(Tag::Full);
        result
    }

    /// Compare-and-swap: wait for Full, swap if the value equals `expected`
    ///
    /// Returns the value observed before the swap; the swap happened iff it
    /// equals `expected`. Equality never coerces between kinds.
    pub fn cas(
        &self,
        key: impl Into<Key>,
        expected: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Result<Value> {
        let key = key.into();
        let expected = expected.into();
        let addr = match self.resolve(&key, expected.is_undefined())? {
            Some(addr) => addr,
            // An absent mapped key holds Undefined, which cannot match
            None => return Ok(Value::Undefined),
        };
        let cell = self.region.cell(addr)?;
        self.acquire("cas", cell, |w| w.tag() == Tag::Full)?;
        let observed = {
            let mut value = cell.value();
            if *value == expected {
                std::mem::replace(&mut *value, new.into())
            } else {
                value.clone()
            }
        };
        cell.set_tag(Tag::Full);
        Ok(observed)
    }

    // ========================================================================
    // Address-level operations (transactions, collectives)
    // ========================================================================

    pub(crate) fn locate(&self, key: &Key) -> Result<usize> {
        self.resolve(key, true)?.ok_or_else(|| {
            Error::invalid(format!("key {} could not be placed in {}", key, self.name()))
        })
    }

    /// Move a cell to Busy once `accept` holds for its tag word
    ///
    /// The reader count is carried over. Returns the word observed before the
    /// transition.
    pub(crate) fn acquire(
        &self,
        operation: &'static str,
        cell: &TaggedCell,
        accept: impl Fn(TagWord) -> bool,
    ) -> Result<TagWord> {
        self.policy.wait_until(operation, || {
            let current = cell.load();
            if accept(current) && cell.compare_exchange(current, current.with_tag(Tag::Busy)).is_ok()
            {
                Ok(Some(current))
            } else {
                Ok(None)
            }
        })
    }

    pub(crate) fn write_at(&self, addr: usize, value: Value) -> Result<()> {
        self.region.cell(addr)?.replace_value(value);
        Ok(())
    }

    pub(crate) fn write_ef_at(&self, addr: usize, value: Value) -> Result<()> {
        let cell = self.region.cell(addr)?;
        self.acquire("write_ef", cell, |w| w.tag() == Tag::Empty)?;
        cell.replace_value(value);
        cell.set_tag(Tag::Full);
        Ok(())
    }

    fn write_held(&self, operation: &'static str, addr: usize, value: Value, tag: Tag) -> Result<()> {
        let cell = self.region.cell(addr)?;
        self.acquire(operation, cell, |w| w.tag() != Tag::Busy)?;
        cell.replace_value(value);
        cell.set_tag(tag);
        Ok(())
    }

    /// Publishes a bare tag word; any reader count is dropped
    pub(crate) fn set_tag_at(&self, addr: usize, tag: Tag) -> Result<()> {
        self.region.cell(addr)?.set_tag(tag);
        Ok(())
    }

    pub(crate) fn read_fe_at(&self, addr: usize) -> Result<Value> {
        let cell = self.region.cell(addr)?;
        self.acquire("read_fe", cell, |w| w.tag() == Tag::Full)?;
        let value = cell.read_value();
        cell.set_tag(Tag::Empty);
        Ok(value)
    }

    pub(crate) fn read_rw_at(&self, addr: usize) -> Result<Value> {
        let cell = self.region.cell(addr)?;
        let joined = self.policy.wait_until("read_rw", || {
            let current = cell.load();
            let open = matches!(current.tag(), Tag::Full | Tag::RwLocked) && current.has_reader_capacity();
            if !open {
                return Ok(None);
            }
            let readers = current.readers() + 1;
            Ok(cell
                .compare_exchange(current, TagWord::new(Tag::Busy, readers))
                .ok()
                .map(|_| readers))
        })?;
        let value = cell.read_value();
        cell.store(TagWord::new(Tag::RwLocked, joined));
        Ok(value)
    }

    pub(crate) fn release_rw_at(&self, addr: usize) -> Result<u32> {
        let cell = self.region.cell(addr)?;
        self.policy.wait_until("release_rw", || {
            let current = cell.load();
            match current.tag() {
                Tag::RwLocked if current.readers() == 0 => {
                    Err(self.violation(addr, "cell is RW-locked with no readers"))
                }
                Tag::RwLocked => {
                    let remaining = current.readers() - 1;
                    let next = if remaining == 0 {
                        TagWord::of(Tag::Full)
                    } else {
                        TagWord::new(Tag::RwLocked, remaining)
                    };
                    Ok(cell.compare_exchange(current, next).ok().map(|_| remaining))
                }
                // Another reader is joining; retry once it publishes
                Tag::Busy => Ok(None),
                other => Err(self.violation(addr, &format!("cell is {} rather than RW-locked", other))),
            }
        })
    }

    fn violation(&self, addr: usize, detail: &str) -> Error {
        tracing::warn!(region = self.name(), addr, detail, "release_rw protocol violation");
        Error::protocol(format!("release_rw on {}[{}]: {}", self.name(), addr, detail))
    }
}
