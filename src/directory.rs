use core::fmt;
use std::num::NonZeroU32;
use std::ops::Range;

use crate::decoder::ifd::{Entry, ENTRY_LEN};
use crate::tags::Tag;

/// An Image File Directory (IFD).
///
/// A directory is an ordered list of [`Entry`]s plus the pointer to the next directory in the
/// chain. Values are stored anywhere in the stream; the entries only hold their type, count and
/// either the value itself or its offset.
///
/// Directories are produced by [`parse_directory`](crate::decoder::ifd::parse_directory) and are
/// read-only afterwards.
#[doc(alias = "IFD")]
#[derive(Clone, PartialEq, Eq)]
pub struct Directory {
    /// Absolute position of the entry count.
    offset: usize,
    /// Entries in file order. The order in the file is supposed to be ascending by tag, but
    /// nothing here relies on it.
    entries: Vec<Entry>,
    next_ifd: Option<NonZeroU32>,
}

impl Directory {
    pub(crate) fn new(offset: usize, entries: Vec<Entry>, next_ifd: Option<NonZeroU32>) -> Self {
        Directory {
            offset,
            entries,
            next_ifd,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Retrieve the first entry with the given tag id.
    pub fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag() == tag)
    }

    /// Retrieve the first entry for a known tag.
    pub fn get_tag(&self, tag: Tag) -> Option<&Entry> {
        self.get(tag.to_u16())
    }

    /// Check if the directory contains a specified tag.
    pub fn contains(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }

    /// Iterate over all entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stream-relative pointer to the next IFD, if it was defined.
    pub fn next(&self) -> Option<NonZeroU32> {
        self.next_ifd
    }

    /// Bytes occupied by the count, the entry table and the next pointer.
    pub fn byte_range(&self) -> Range<usize> {
        let len = 2 + self.entries.len() * ENTRY_LEN + 4;
        self.offset..self.offset.saturating_add(len)
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("offset", &self.offset)
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|e| (Tag::from_u16_exhaustive(e.tag()), e.type_code(), e.count()))
                    .collect::<Vec<_>>(),
            )
            .field("next_ifd", &self.next_ifd)
            .finish()
    }
}
