//! Regions: fixed-size arrays of tagged cells
//!
//! A [`Region`] is created once with a [`RegionConfig`] and never resized.
//! Address resolution is a pure function of the region's shape and the
//! contents of its key map, so every participant resolves a key to the same
//! cell.

use crate::cell::TaggedCell;
use crate::key_map::KeyMap;
use tagmem_core::{Error, Key, RegionConfig, RegionId, Result, Tag, Value};

/// Store contract used by the synchronization layer
///
/// Anything that can turn a key into a cell can be driven by the tagged
/// primitives.
pub trait CellStore: Send + Sync {
    /// Identifier used to order cells across stores
    fn region_id(&self) -> RegionId;

    /// Number of cells
    fn len(&self) -> usize;

    /// True if the store has no cells
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve `key` to a cell address
    ///
    /// For key-mapped stores a missing key yields `Ok(None)` unless
    /// `allocate` is set, in which case a slot is claimed for it.
    fn resolve(&self, key: &Key, allocate: bool) -> Result<Option<usize>>;

    /// Cell at `address`
    fn cell(&self, address: usize) -> Result<&TaggedCell>;

    /// Key stored at `address` of a key-mapped store
    fn index_to_key(&self, address: usize) -> Result<Option<Key>>;
}

/// A named, fixed-shape array of tagged cells
#[derive(Debug)]
pub struct Region {
    id: RegionId,
    name: String,
    dimensions: Vec<usize>,
    strides: Vec<usize>,
    cells: Box<[TaggedCell]>,
    map: Option<KeyMap>,
    persist: bool,
    stack_top: TaggedCell,
    queue_bottom: TaggedCell,
}

impl Region {
    /// Build a region from a validated config
    pub fn new(id: RegionId, name: impl Into<String>, config: &RegionConfig) -> Result<Self> {
        config.validate()?;
        let len = config.len()?;
        let fill = config.fill.clone().unwrap_or_default();
        let cells = (0..len)
            .map(|_| TaggedCell::new(fill.clone(), config.initial_tag))
            .collect();
        let name = name.into();
        tracing::debug!(
            region = %name,
            id = id.as_u32(),
            len,
            mapped = config.use_map,
            "region allocated"
        );
        Ok(Self {
            id,
            name,
            dimensions: config.dimensions.clone(),
            strides: config.strides(),
            cells,
            map: config.use_map.then(|| KeyMap::new(len)),
            persist: config.persist,
            stack_top: TaggedCell::new(Value::Int(0), Tag::Full),
            queue_bottom: TaggedCell::new(Value::Int(0), Tag::Full),
        })
    }

    /// Region identifier
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extent of each dimension
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// Stride of each dimension
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// True if keys go through a key map
    pub fn is_mapped(&self) -> bool {
        self.map.is_some()
    }

    /// Key map of a mapped region
    pub fn key_map(&self) -> Option<&KeyMap> {
        self.map.as_ref()
    }

    /// True if the region survives a destroy without unlink
    pub fn is_persistent(&self) -> bool {
        self.persist
    }

    /// Shared insertion counter for stack and queue use
    pub fn stack_top(&self) -> &TaggedCell {
        &self.stack_top
    }

    /// Removal counter for queue use
    pub fn queue_bottom(&self) -> &TaggedCell {
        &self.queue_bottom
    }

    /// Iterate over every cell in address order
    pub fn cells(&self) -> impl Iterator<Item = &TaggedCell> {
        self.cells.iter()
    }

    fn check_index(&self, index: i64, len: usize) -> Result<usize> {
        if index < 0 || index as u64 >= len as u64 {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        Ok(index as usize)
    }

    fn resolve_coords(&self, coords: &[i64]) -> Result<usize> {
        if coords.len() != self.dimensions.len() {
            return Err(Error::invalid(format!(
                "expected {} coordinates, got {}",
                self.dimensions.len(),
                coords.len()
            )));
        }
        let mut address = 0usize;
        for ((&c, &extent), &stride) in coords.iter().zip(&self.dimensions).zip(&self.strides) {
            address += self.check_index(c, extent)? * stride;
        }
        Ok(address)
    }
}

impl CellStore for Region {
    fn region_id(&self) -> RegionId {
        self.id
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn resolve(&self, key: &Key, allocate: bool) -> Result<Option<usize>> {
        match (&self.map, key) {
            (Some(_), Key::Coords(_)) => Err(Error::invalid(format!(
                "region {} is key-mapped and does not accept coordinates",
                self.name
            ))),
            (Some(map), key) if allocate => map.insert_or_lookup(key).map(Some),
            (Some(map), key) => map.lookup(key),
            (None, Key::Int(i)) => self.check_index(*i, self.cells.len()).map(Some),
            (None, Key::Coords(c)) => self.resolve_coords(c).map(Some),
            (None, other) => Err(Error::invalid(format!(
                "region {} is not key-mapped; key {} is not an index",
                self.name, other
            ))),
        }
    }

    fn cell(&self, address: usize) -> Result<&TaggedCell> {
        self.cells.get(address).ok_or(Error::IndexOutOfBounds {
            index: address as i64,
            len: self.cells.len(),
        })
    }

    fn index_to_key(&self, address: usize) -> Result<Option<Key>> {
        let map = self.map.as_ref().ok_or_else(|| {
            Error::invalid(format!("region {} is not key-mapped", self.name))
        })?;
        self.check_index(address as i64, self.cells.len())?;
        Ok(map.key_at(address))
    }
}
