//! Key map for mapped regions
//!
//! Mapped regions translate arbitrary scalar keys into cell addresses by open
//! addressing: a key hashes to a home slot and probes forward (wrapping) until
//! it finds itself or an unused slot. Slots are never freed, so the first
//! participant to reach an unused slot for a key claims it and everyone else
//! probing for the same key will meet it there.
//!
//! # Probe Limit
//!
//! At most [`MAX_PROBES`] slots are examined. A key whose probe sequence is
//! entirely occupied by other keys cannot be inserted.

use parking_lot::Mutex;
use tagmem_core::{Error, Key, Result};

/// Longest probe sequence examined for one key
pub const MAX_PROBES: usize = 200;

/// Open-addressed map from keys to slot indices
#[derive(Debug)]
pub struct KeyMap {
    slots: Box<[Mutex<Option<Key>>]>,
}

impl KeyMap {
    /// Map with `len` unused slots
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the map has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a key
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.lock().is_some()).count()
    }

    /// Find the slot holding `key`, without claiming one
    pub fn lookup(&self, key: &Key) -> Result<Option<usize>> {
        let home = self.home_slot(key)?;
        for idx in self.probe_sequence(home) {
            match &*self.slots[idx].lock() {
                None => return Ok(None),
                Some(stored) if stored == key => return Ok(Some(idx)),
                Some(_) => {}
            }
        }
        Ok(None)
    }

    /// Find the slot holding `key`, claiming an unused one if it is absent
    pub fn insert_or_lookup(&self, key: &Key) -> Result<usize> {
        let home = self.home_slot(key)?;
        for idx in self.probe_sequence(home) {
            let mut slot = self.slots[idx].lock();
            match &*slot {
                None => {
                    *slot = Some(key.clone());
                    return Ok(idx);
                }
                Some(stored) if stored == key => return Ok(idx),
                Some(_) => {}
            }
        }
        tracing::warn!(key = %key, slots = self.len(), "key map probe sequence exhausted");
        Err(Error::CapacityExceeded(format!(
            "no free key map slot for {} within {} probes",
            key,
            MAX_PROBES.min(self.len())
        )))
    }

    /// Key stored at `idx`, if the slot is in use
    pub fn key_at(&self, idx: usize) -> Option<Key> {
        self.slots.get(idx).and_then(|s| s.lock().clone())
    }

    fn probe_sequence(&self, home: usize) -> impl Iterator<Item = usize> {
        let len = self.len();
        (0..MAX_PROBES.min(len)).map(move |step| (home + step) % len)
    }

    fn home_slot(&self, key: &Key) -> Result<usize> {
        let len = self.len() as u64;
        if len == 0 {
            return Err(Error::CapacityExceeded("key map has no slots".to_string()));
        }
        let hash = match key {
            Key::Int(i) => i.rem_euclid(len as i64) as u64,
            Key::Bool(b) => *b as u64,
            Key::Float(x) if x.is_nan() => {
                return Err(Error::invalid("NaN cannot be used as a map key"));
            }
            Key::Float(x) => x.to_bits(),
            Key::Str(s) => hash_str(s),
            Key::Coords(_) => {
                return Err(Error::invalid("coordinate keys cannot be used with a key map"));
            }
        };
        Ok((hash % len) as usize)
    }
}

/// String hash for key map home slots
///
/// Shift-add mix over the bytes, then a multiplicative scramble so that
/// similar strings land far apart.
pub fn hash_str(s: &str) -> u64 {
    let mut hash: u64 = 0;
    for b in s.bytes() {
        hash = (b as u64)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    (hash.wrapping_mul(1_191_613) as i64).unsigned_abs()
}
