//! Core addressing types
//!
//! This module defines the identifiers used to locate a cell:
//! - [`RegionId`]: identifier of a region within a domain
//! - [`Key`]: what a caller passes to name a cell inside a region

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a region within one domain
///
/// Ids are handed out in creation order and never reused while the domain is
/// alive, so `(RegionId, address)` gives a total order over every cell of the
/// domain. Transactions acquire cells in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Raw numeric id
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Name of a cell within a region
///
/// Unmapped regions accept `Int` (a flat index) and `Coords` (one index per
/// dimension). Key-mapped regions accept any scalar key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Key {
    /// Flat integer index, or an integer map key
    Int(i64),
    /// Floating point map key
    Float(f64),
    /// Boolean map key
    Bool(bool),
    /// String map key
    Str(String),
    /// Multi-dimensional coordinates, one per region dimension
    Coords(Vec<i64>),
}

impl Key {
    /// Returns the flat integer index, if this key is one
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(x) => write!(f, "{}", x),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Str(s) => write!(f, "{:?}", s),
            Key::Coords(c) => write!(f, "{:?}", c),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

impl From<f64> for Key {
    fn from(x: f64) -> Self {
        Key::Float(x)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<Vec<i64>> for Key {
    fn from(c: Vec<i64>) -> Self {
        Key::Coords(c)
    }
}

impl<const N: usize> From<[i64; N]> for Key {
    fn from(c: [i64; N]) -> Self {
        Key::Coords(c.to_vec())
    }
}
