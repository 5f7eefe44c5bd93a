//! Convenient imports for tagmem.
//!
//! ```ignore
//! use tagmem::prelude::*;
//!
//! let mem = TagMem::builder().participants(2).open()?;
//! ```

// Main entry point
pub use crate::domain::{TagMem, TagMemBuilder};

// Error handling
pub use tagmem_core::{Error, Result};

// Cells and regions
pub use tagmem_core::{Key, RegionConfig, Tag, Value};
pub use tagmem_concurrency::SharedArray;

// Transactions
pub use tagmem_concurrency::{TransactionHandle, TxItem};

// Coordination
pub use tagmem_engine::{DomainConfig, LoopSummary, ParticipantContext, Schedule};

// Re-export serde_json for JSON cell values
pub use serde_json::json;
