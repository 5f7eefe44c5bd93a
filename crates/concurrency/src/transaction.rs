//! Multi-cell transactions with sorted acquisition
//!
//! A transaction takes every cell it names before the body runs and holds
//! them until [`TransactionHandle::end`]. Deadlock freedom comes from the
//! acquisition order: every transaction takes its cells in ascending
//! `(RegionId, address)` order, so no two transactions can each hold a cell
//! the other is waiting for.
//!
//! ## Lifecycle
//!
//! ```text
//! transaction_begin(items)
//!   1. resolve every key, order by (RegionId, address)
//!   2. reject items from two regions that share a RegionId
//!   3. merge items naming the same cell (read-only only if all were)
//!   4. acquire in order: read-only via read_rw, read-write via read_fe
//!   5. on failure release what was taken and return the error
//!
//! handle.end(commit)
//!   commit RO -> release_rw     commit RW -> set_tag(Full)
//!   abort  RO -> release_rw     abort  RW -> write_ef(original)
//! ```
//!
//! While the handle is active the read-write cells are Empty and owned by the
//! transaction; write them with [`TransactionHandle::set`] or untagged
//! writes.
//!
//! Region ids are only unique within one domain, so every item must come from
//! the same domain. Two distinct regions with one id are `InvalidArgument`.

use crate::primitives::SharedArray;
use smallvec::SmallVec;
use std::sync::Arc;
use tagmem_core::{Error, Key, RegionId, Result, Tag, Value};

/// One cell a transaction wants
#[derive(Debug, Clone)]
pub struct TxItem {
    /// Array holding the cell
    pub array: SharedArray,
    /// Key of the cell
    pub key: Key,
    /// Shared (read-only) or exclusive access
    pub read_only: bool,
}

impl TxItem {
    /// Shared access to `key`
    pub fn read(array: &SharedArray, key: impl Into<Key>) -> Self {
        Self {
            array: array.clone(),
            key: key.into(),
            read_only: true,
        }
    }

    /// Exclusive access to `key`
    pub fn write(array: &SharedArray, key: impl Into<Key>) -> Self {
        Self {
            array: array.clone(),
            key: key.into(),
            read_only: false,
        }
    }
}

/// Transaction state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Cells are held
    Active,
    /// Ended with commit
    Committed,
    /// Ended with abort
    Aborted {
        /// Why the transaction was aborted
        reason: String,
    },
}

#[derive(Debug)]
struct TxEntry {
    array: SharedArray,
    region: RegionId,
    address: usize,
    read_only: bool,
    original: Value,
}

impl TxEntry {
    fn order(&self) -> (RegionId, usize) {
        (self.region, self.address)
    }

    fn same_region(&self, other: &TxEntry) -> bool {
        Arc::ptr_eq(self.array.region(), other.array.region())
    }

    fn release(&self, commit: bool) -> Result<()> {
        match (self.read_only, commit) {
            (true, _) => self.array.release_rw_at(self.address).map(|_| ()),
            (false, true) => self.array.set_tag_at(self.address, Tag::Full),
            (false, false) => self.array.write_ef_at(self.address, self.original.clone()),
        }
    }
}

/// Cells held by one transaction
///
/// Dropping an active handle aborts it.
#[derive(Debug)]
pub struct TransactionHandle {
    entries: SmallVec<[TxEntry; 8]>,
    status: TransactionStatus,
}

/// Acquire every cell named by `items` in deadlock-free order
pub fn transaction_begin(items: impl IntoIterator<Item = TxItem>) -> Result<TransactionHandle> {
    let mut entries: SmallVec<[TxEntry; 8]> = SmallVec::new();
    for item in items {
        let address = item.array.locate(&item.key)?;
        entries.push(TxEntry {
            region: item.array.id(),
            array: item.array,
            address,
            read_only: item.read_only,
            original: Value::Undefined,
        });
    }
    entries.sort_by_key(TxEntry::order);
    if let Some(pair) = entries
        .windows(2)
        .find(|pair| pair[0].region == pair[1].region && !pair[0].same_region(&pair[1]))
    {
        return Err(Error::invalid(format!(
            "transaction names two regions with id {} ({} and {}); items must come from one domain",
            pair[0].region,
            pair[0].array.name(),
            pair[1].array.name()
        )));
    }
    entries.dedup_by(|later, kept| {
        if later.order() == kept.order() {
            kept.read_only &= later.read_only;
            true
        } else {
            false
        }
    });

    for i in 0..entries.len() {
        let entry = &entries[i];
        let acquired = if entry.read_only {
            entry.array.read_rw_at(entry.address)
        } else {
            entry.array.read_fe_at(entry.address)
        };
        match acquired {
            Ok(value) => entries[i].original = value,
            Err(e) => {
                tracing::warn!(
                    acquired = i,
                    cells = entries.len(),
                    error = %e,
                    "transaction begin failed, releasing acquired cells"
                );
                for held in &entries[..i] {
                    if let Err(release_err) = held.release(false) {
                        tracing::warn!(error = %release_err, "rollback release failed");
                    }
                }
                return Err(e);
            }
        }
    }

    tracing::debug!(cells = entries.len(), "transaction begin");
    Ok(TransactionHandle {
        entries,
        status: TransactionStatus::Active,
    })
}

impl TransactionHandle {
    /// Current state
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// True until the transaction is ended
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Number of distinct cells held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the transaction holds no cells
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, array: &SharedArray, key: &Key) -> Result<&TxEntry> {
        let address = array.resolve(key, false)?;
        address
            .and_then(|address| {
                self.entries
                    .iter()
                    .find(|e| e.order() == (array.id(), address))
            })
            .ok_or_else(|| {
                Error::invalid(format!("{}[{}] is not part of this transaction", array.name(), key))
            })
    }

    /// Value a cell held when it was acquired
    pub fn value(&self, array: &SharedArray, key: impl Into<Key>) -> Result<&Value> {
        self.entry(array, &key.into()).map(|e| &e.original)
    }

    /// Write a cell held for exclusive access
    pub fn set(&self, array: &SharedArray, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        if !self.is_active() {
            return Err(Error::protocol("write through a transaction that has ended"));
        }
        let key = key.into();
        let entry = self.entry(array, &key)?;
        if entry.read_only {
            return Err(Error::protocol(format!(
                "{}[{}] is held read-only by this transaction",
                array.name(),
                key
            )));
        }
        entry.array.write_at(entry.address, value.into())
    }

    /// Release every held cell, committing or rolling back
    ///
    /// Every cell is released even if one release fails; the first error is
    /// returned. Ending a handle twice is a protocol violation.
    pub fn end(&mut self, commit: bool) -> Result<()> {
        if !self.is_active() {
            tracing::warn!(status = ?self.status, "transaction ended twice");
            return Err(Error::protocol(format!(
                "transaction already ended ({:?})",
                self.status
            )));
        }
        self.status = if commit {
            TransactionStatus::Committed
        } else {
            TransactionStatus::Aborted {
                reason: "aborted by caller".to_string(),
            }
        };

        let mut first_err = None;
        for entry in &self.entries {
            if let Err(e) = entry.release(commit) {
                first_err.get_or_insert(e);
            }
        }
        tracing::debug!(cells = self.entries.len(), commit, "transaction end");
        first_err.map_or(Ok(()), Err)
    }

    /// End with commit
    pub fn commit(mut self) -> Result<()> {
        self.end(true)
    }

    /// End with abort, restoring every read-write cell
    pub fn abort(mut self) -> Result<()> {
        self.end(false)
    }
}

impl Drop for TransactionHandle {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::warn!(cells = self.entries.len(), "active transaction dropped, aborting");
            if let Err(e) = self.end(false) {
                tracing::warn!(error = %e, "abort on drop failed");
            }
        }
    }
}
