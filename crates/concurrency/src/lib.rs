//! Synchronization layer for tagged shared memory
//!
//! This crate drives the cells of `tagmem-storage` through their tags:
//! - SharedArray: full/empty reads and writes, shared readers, fetch-and-add,
//!   compare-and-swap, stack and queue operations
//! - Transactions: multi-cell acquisition in `(RegionId, address)` order
//! - WaitPolicy: bounded exponential back-off for every wait point

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod primitives;
pub mod queue;
pub mod transaction;

pub use backoff::{Backoff, WaitPolicy, DEFAULT_MAX_BACKOFF, DEFAULT_TIMEOUT};
pub use primitives::SharedArray;
pub use transaction::{transaction_begin, TransactionHandle, TransactionStatus, TxItem};
