//! Region configuration
//!
//! A [`RegionConfig`] describes a region before it exists: its shape, whether
//! keys go through a key map, how cells are initialized and whether the
//! region outlives a non-unlinking destroy.
//!
//! # Example
//!
//! ```
//! use tagmem_core::{RegionConfig, Tag, Value};
//!
//! let config = RegionConfig::new(&[100, 4])
//!     .name("scores")
//!     .fill(Value::Int(0))
//!     .initial_tag(Tag::Empty);
//! assert_eq!(config.len().unwrap(), 400);
//! ```

use crate::error::{Error, Result};
use crate::tag::Tag;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Description of a region to create or attach to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Registry name; unnamed regions get a generated name
    pub name: Option<String>,
    /// Extent of each dimension; the region holds their product of cells
    pub dimensions: Vec<usize>,
    /// Resolve keys through a key map instead of as indices
    pub use_map: bool,
    /// Value every cell starts with (`Undefined` if not set)
    pub fill: Option<Value>,
    /// Tag every cell starts with
    pub initial_tag: Tag,
    /// Keep the region registered when destroyed without unlink
    pub persist: bool,
    /// Attach to an already registered region instead of creating one
    pub use_existing: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: None,
            dimensions: vec![1],
            use_map: false,
            fill: None,
            initial_tag: Tag::Full,
            persist: true,
            use_existing: false,
        }
    }
}

impl RegionConfig {
    /// Config for a region with the given dimensions
    pub fn new(dimensions: &[usize]) -> Self {
        Self {
            dimensions: dimensions.to_vec(),
            ..Self::default()
        }
    }

    /// Config for a one-dimensional region of `len` cells
    pub fn with_len(len: usize) -> Self {
        Self::new(&[len])
    }

    /// Set the registry name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolve keys through a key map
    pub fn mapped(mut self) -> Self {
        self.use_map = true;
        self
    }

    /// Initialize every cell with `value`
    pub fn fill(mut self, value: impl Into<Value>) -> Self {
        self.fill = Some(value.into());
        self
    }

    /// Initialize every cell's tag; only `Full` and `Empty` are accepted
    pub fn initial_tag(mut self, tag: Tag) -> Self {
        self.initial_tag = tag;
        self
    }

    /// Keep or drop the region on a destroy without unlink
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Attach to an existing region of the same name
    pub fn use_existing(mut self) -> Self {
        self.use_existing = true;
        self
    }

    /// Total number of cells
    pub fn len(&self) -> Result<usize> {
        self.dimensions.iter().try_fold(1usize, |acc, &d| {
            acc.checked_mul(d)
                .ok_or_else(|| Error::invalid(format!("region dimensions {:?} overflow", self.dimensions)))
        })
    }

    /// True if the region would hold no cells
    pub fn is_empty(&self) -> bool {
        self.dimensions.iter().any(|&d| d == 0)
    }

    /// Stride of each dimension: the running product of the preceding extents
    pub fn strides(&self) -> Vec<usize> {
        let mut stride = 1usize;
        self.dimensions
            .iter()
            .map(|&d| {
                let s = stride;
                stride = stride.saturating_mul(d);
                s
            })
            .collect()
    }

    /// Check the config can describe a region
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(Error::invalid("region needs at least one dimension"));
        }
        if self.is_empty() {
            return Err(Error::invalid(format!(
                "region dimensions {:?} contain a zero extent",
                self.dimensions
            )));
        }
        if !self.initial_tag.is_stable() {
            return Err(Error::invalid(format!(
                "initial tag must be Full or Empty, got {}",
                self.initial_tag
            )));
        }
        if self.use_existing && self.name.is_none() {
            return Err(Error::invalid("use_existing requires a region name"));
        }
        self.len().map(|_| ())
    }
}
