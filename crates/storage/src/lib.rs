//! Cell storage for tagged shared memory
//!
//! This crate implements the store that the synchronization layer drives:
//! - TaggedCell: value plus packed tag word
//! - KeyMap: open-addressed key → slot map for mapped regions
//! - Region: fixed-shape array of cells with addressing
//! - RegionRegistry: per-domain name → region table

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod key_map;
pub mod region;
pub mod registry;
pub mod tag_word;

pub use cell::TaggedCell;
pub use key_map::{KeyMap, MAX_PROBES};
pub use region::{CellStore, Region};
pub use registry::{RegionRegistry, CONTROL_REGION_ID};
pub use tag_word::{TagWord, MAX_READERS};
