//! Synchronization tags carried by every cell

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full/empty state of a cell
///
/// Only `Full` and `Empty` are stable states a caller may request. `Busy`
/// marks a cell whose value is being modified by exactly one participant;
/// `RwLocked` marks a cell held by one or more shared readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tag {
    /// Holds a value available to consumers
    #[default]
    Full,
    /// Awaiting a producer
    Empty,
    /// Being modified; transient
    Busy,
    /// Held by shared readers
    RwLocked,
}

impl Tag {
    /// Tags a caller may set directly or use as an initial state.
    pub fn is_stable(&self) -> bool {
        matches!(self, Tag::Full | Tag::Empty)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::Full => "Full",
            Tag::Empty => "Empty",
            Tag::Busy => "Busy",
            Tag::RwLocked => "RwLocked",
        };
        f.write_str(s)
    }
}
