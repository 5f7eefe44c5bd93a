//! Tagged cells
//!
//! A [`TaggedCell`] pairs a [`Value`] with a [`TagWord`]. The tag word is only
//! ever changed by compare-and-swap (or a plain store by the participant that
//! currently owns the cell through `Busy`). The value sits behind a mutex so
//! that untagged access stays memory-safe; tagged operations only touch it
//! while they hold the cell through the tag.

use crate::tag_word::TagWord;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU32, Ordering};
use tagmem_core::{Tag, Value};

/// One addressable cell: value plus synchronization tag
#[derive(Debug)]
pub struct TaggedCell {
    word: AtomicU32,
    value: Mutex<Value>,
}

impl TaggedCell {
    /// Create a cell holding `value` with tag `tag`
    pub fn new(value: Value, tag: Tag) -> Self {
        Self {
            word: AtomicU32::new(TagWord::of(tag).raw()),
            value: Mutex::new(value),
        }
    }

    /// Current tag word
    #[inline]
    pub fn load(&self) -> TagWord {
        TagWord::from_raw(self.word.load(Ordering::Acquire))
    }

    /// Current full/empty state
    #[inline]
    pub fn tag(&self) -> Tag {
        self.load().tag()
    }

    /// Swap the whole tag word if it still equals `current`
    ///
    /// Returns the observed word on failure.
    #[inline]
    pub fn compare_exchange(&self, current: TagWord, new: TagWord) -> Result<TagWord, TagWord> {
        self.word
            .compare_exchange(current.raw(), new.raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(TagWord::from_raw)
            .map_err(TagWord::from_raw)
    }

    /// Move the tag from `from` to `to`, keeping the reader count
    ///
    /// Fails (returning the observed word) if the tag is not `from`.
    pub fn compare_and_set_tag(&self, from: Tag, to: Tag) -> Result<TagWord, TagWord> {
        let current = self.load();
        if current.tag() != from {
            return Err(current);
        }
        self.compare_exchange(current, current.with_tag(to))
    }

    /// Publish a new tag word unconditionally
    ///
    /// Only the owner of a `Busy` cell (or a caller forcing the state with
    /// `set_tag`) may do this.
    #[inline]
    pub fn store(&self, word: TagWord) {
        self.word.store(word.raw(), Ordering::Release);
    }

    /// Publish `tag` with no readers
    #[inline]
    pub fn set_tag(&self, tag: Tag) {
        self.store(TagWord::of(tag));
    }

    /// Guarded access to the value
    pub fn value(&self) -> MutexGuard<'_, Value> {
        self.value.lock()
    }

    /// Clone of the value
    pub fn read_value(&self) -> Value {
        self.value.lock().clone()
    }

    /// Replace the value, returning the previous one
    pub fn replace_value(&self, value: Value) -> Value {
        std::mem::replace(&mut *self.value.lock(), value)
    }

    /// Tag and value at one instant, for diagnostics and tests
    pub fn snapshot(&self) -> (Tag, Value) {
        let value = self.value.lock();
        (self.tag(), value.clone())
    }
}

impl Default for TaggedCell {
    fn default() -> Self {
        Self::new(Value::Undefined, Tag::Full)
    }
}
