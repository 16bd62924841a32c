#[cfg(feature = "serde")]
use std::io::prelude::*;

use indexmap::map::{Iter, Keys};
use indexmap::IndexMap;

/**
An ordered mapping from scan number to byte offset into the document
it was written to, or the file it was read from.

A wrapper around [`indexmap::IndexMap`].
*/
#[derive(Default, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetIndex {
    /// The name of the index, written as the `name` attribute of the `index` element
    pub name: String,

    /// The mapping from scan number to byte offset, ordered by occurrence
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    pub offsets: IndexMap<u64, u64>,
}

impl OffsetIndex {
    pub fn new(name: impl Into<String>) -> OffsetIndex {
        OffsetIndex {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the offset of the specified key
    #[inline]
    pub fn get(&self, key: u64) -> Option<u64> {
        self.offsets.get(&key).copied()
    }

    /// Get the associated key and offset for the specified index position
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<(u64, u64)> {
        self.offsets
            .get_index(index)
            .map(|(key, offset)| (*key, *offset))
    }

    /// Insert `key` into the index with an offset value, returning the previous offset
    /// if the key was already present
    #[inline]
    pub fn insert(&mut self, key: u64, offset: u64) -> Option<u64> {
        self.offsets.insert(key, offset)
    }

    /// The most recently inserted entry
    pub fn last(&self) -> Option<(u64, u64)> {
        self.offsets.last().map(|(key, offset)| (*key, *offset))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn keys(&self) -> Keys<'_, u64, u64> {
        self.offsets.keys()
    }

    /// Iterate over the keys and offsets
    pub fn iter(&self) -> Iter<'_, u64, u64> {
        self.offsets.iter()
    }

    #[inline]
    pub fn contains_key(&self, key: u64) -> bool {
        self.offsets.contains_key(&key)
    }

    /// Whether both keys and offsets strictly increase in insertion order
    pub fn is_ascending(&self) -> bool {
        self.offsets
            .iter()
            .zip(self.offsets.iter().skip(1))
            .all(|((k0, o0), (k1, o1))| k0 < k1 && o0 < o1)
    }

    #[cfg(feature = "serde")]
    /// Write the index out in JSON format to `writer`
    pub fn to_writer<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    #[cfg(feature = "serde")]
    /// Read an index in JSON format from `reader`
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}
