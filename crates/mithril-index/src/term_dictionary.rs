use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use fst::{Map, MapBuilder};
use memmap2::Mmap;

use crate::error::IndexError;

/// Builds `path` as an `fst::Map` from term to its byte offset into
/// `final_index.data`'s posting-data section (i.e. not counting the
/// leading `u32` term count). `entries` must already be sorted by term,
/// which [`crate::merge::merge_blocks`] guarantees by construction.
pub fn build_term_dictionary(path: impl AsRef<Path>, entries: &[(String, u64)]) -> Result<(), IndexError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    let mut builder = MapBuilder::new(BufWriter::new(file))?;
    for (term, offset) in entries {
        builder.insert(term, *offset)?;
    }
    builder.finish()?;
    Ok(())
}

/// A loaded, mmap-backed term dictionary: `term -> byte offset` lookups in
/// `O(len(term))` time with no full-file deserialization. Generalizes the
/// original's `TermDictionary`, which loaded a flat sorted array into
/// memory and binary-searched it; an FST gives the same sorted-lookup
/// semantics with a far smaller resident footprint, the role `fst::Map`
/// plays for word lookups in `milli`.
pub struct TermDictionary {
    map: Map<Mmap>,
}

impl TermDictionary {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let map = Map::new(mmap)?;
        Ok(TermDictionary { map })
    }

    /// Returns the byte offset of `term`'s posting-data record, if present.
    pub fn lookup(&self, term: &str) -> Option<u64> {
        self.map.get(term)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
