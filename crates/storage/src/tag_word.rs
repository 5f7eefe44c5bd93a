//! Packed tag word
//!
//! A cell's synchronization state fits in one `u32` so that every transition
//! is a single compare-and-swap:
//!
//! ```text
//! bit  31                                2 1   0
//!     +-----------------------------------+-----+
//!     |           reader count            | tag |
//!     +-----------------------------------+-----+
//! ```
//!
//! Tag codes: Full = 0, Empty = 1, Busy = 2, RwLocked = 3.

use tagmem_core::Tag;

const TAG_BITS: u32 = 2;
const TAG_MASK: u32 = (1 << TAG_BITS) - 1;

/// Most shared readers a cell can hold at once
pub const MAX_READERS: u32 = u32::MAX >> TAG_BITS;

/// Tag plus shared-reader count, as stored in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagWord(u32);

impl TagWord {
    /// Word for `tag` with `readers` shared readers (saturated at [`MAX_READERS`])
    #[inline]
    pub const fn new(tag: Tag, readers: u32) -> Self {
        let readers = if readers > MAX_READERS { MAX_READERS } else { readers };
        TagWord((readers << TAG_BITS) | encode(tag))
    }

    /// Word for `tag` with no readers
    #[inline]
    pub const fn of(tag: Tag) -> Self {
        Self::new(tag, 0)
    }

    /// Rebuild from the raw atomic representation
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TagWord(raw)
    }

    /// Raw atomic representation
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The full/empty state
    #[inline]
    pub const fn tag(self) -> Tag {
        decode(self.0 & TAG_MASK)
    }

    /// Number of shared readers
    #[inline]
    pub const fn readers(self) -> u32 {
        self.0 >> TAG_BITS
    }

    /// Same reader count, different tag
    #[inline]
    pub const fn with_tag(self, tag: Tag) -> Self {
        TagWord((self.0 & !TAG_MASK) | encode(tag))
    }

    /// Same tag, different reader count
    #[inline]
    pub const fn with_readers(self, readers: u32) -> Self {
        Self::new(self.tag(), readers)
    }

    /// True if another shared reader can join
    #[inline]
    pub const fn has_reader_capacity(self) -> bool {
        self.readers() < MAX_READERS
    }
}

const fn encode(tag: Tag) -> u32 {
    match tag {
        Tag::Full => 0,
        Tag::Empty => 1,
        Tag::Busy => 2,
        Tag::RwLocked => 3,
    }
}

const fn decode(code: u32) -> Tag {
    match code {
        0 => Tag::Full,
        1 => Tag::Empty,
        2 => Tag::Busy,
        _ => Tag::RwLocked,
    }
}
