//! Core types for tagged shared memory
//!
//! This crate defines the vocabulary shared by every other layer:
//! - [`Value`]: the typed payload stored in a cell
//! - [`Tag`]: the synchronization state carried by a cell
//! - [`Key`] / [`RegionId`]: addressing
//! - [`RegionConfig`]: how a region is laid out and initialized
//! - [`Error`]: the error type returned by every fallible operation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod tag;
pub mod types;
pub mod value;

pub use config::RegionConfig;
pub use error::{Error, Result};
pub use tag::Tag;
pub use types::{Key, RegionId};
pub use value::{Value, ValueKind};
