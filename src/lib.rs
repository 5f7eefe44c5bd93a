//! # tagmem
//!
//! Tagged shared memory for cooperating threads.
//!
//! Every cell of a region carries a synchronization tag (Full, Empty, Busy or
//! RW-locked) next to its value. On top of the tags sit full/empty reads and
//! writes, atomic read-modify-write, deadlock-free multi-cell transactions,
//! and collectives (barrier, single, master, critical, parallel loops).
//!
//! ## Quick Start
//!
//! ```ignore
//! use tagmem::prelude::*;
//!
//! let mem = TagMem::builder().participants(4).open()?;
//!
//! let sums = mem.run(|ctx| {
//!     let counter = ctx.create_region(RegionConfig::with_len(1).name("counter").fill(0i64))?;
//!     ctx.par_for_each(0, 1000, Schedule::Guided, 1, |i| {
//!         counter.faa(0, i).unwrap();
//!     })?;
//!     counter.read(0)
//! })?;
//! ```
//!
//! ## Layers
//!
//! - `tagmem-core`: values, tags, keys, errors, region configuration
//! - `tagmem-storage`: tagged cells, key maps, regions, the region registry
//! - `tagmem-concurrency`: full/empty primitives, stacks and queues, transactions
//! - `tagmem-engine`: domains, participants, collectives, loop scheduling

#![warn(missing_docs)]

mod domain;

pub mod prelude;

pub use domain::{TagMem, TagMemBuilder};

pub use tagmem_concurrency::{
    transaction_begin, SharedArray, TransactionHandle, TransactionStatus, TxItem, WaitPolicy,
};
pub use tagmem_core::{Error, Key, RegionConfig, RegionId, Result, Tag, Value, ValueKind};
pub use tagmem_engine::{
    static_partition, CriticalGuard, Domain, DomainConfig, LoopPartition, LoopSummary,
    ParticipantContext, Schedule,
};
