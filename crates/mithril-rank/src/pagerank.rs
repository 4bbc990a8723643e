//! Mmap reader over the offline PageRank vector (`pagerank.out`), per
//! spec.md §6: `f64[N]` in big-endian, indexed directly by doc id. Mirrors
//! `examples/original_source/common/src/ranking/PageRankReader.cpp`'s
//! `mmap` + `ntohll`-style byte swap; the producer itself is out of scope
//! (spec.md §1).

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use mithril_crawler::DocId;

use crate::error::RankError;

/// Read-only, `Send + Sync` handle over a PageRank score vector. The mmap
/// is unmapped on drop; scores are read lazily per lookup rather than
/// copied into memory up front.
pub struct PageRankReader {
    mmap: Mmap,
    len: usize,
}

impl PageRankReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RankError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RankError::Io { path: path.display().to_string(), source })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| RankError::Io { path: path.display().to_string(), source })?;

        if mmap.len() % 8 != 0 {
            return Err(RankError::Corrupt { what: format!("pagerank file length {} is not a multiple of 8", mmap.len()) });
        }
        let len = mmap.len() / 8;
        Ok(PageRankReader { mmap, len })
    }

    /// Number of documents this vector covers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// PageRank score for `doc_id`, or `0.0` if it falls outside the
    /// vector (a document indexed after the PageRank pass last ran).
    pub fn get(&self, doc_id: DocId) -> f64 {
        let offset = doc_id as usize * 8;
        let Some(bytes) = self.mmap.get(offset..offset + 8) else {
            return 0.0;
        };
        f64::from_be_bytes(bytes.try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scores_by_doc_id() {
        let dir = std::env::temp_dir().join(format!("mithril-rank-pagerank-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pagerank.out");

        let scores = [0.5_f64, 1.25, 0.0];
        let mut bytes = Vec::new();
        for s in scores {
            bytes.extend_from_slice(&s.to_be_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        let reader = PageRankReader::open(&path).unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.get(0), 0.5);
        assert_eq!(reader.get(1), 1.25);
        assert_eq!(reader.get(2), 0.0);
        assert_eq!(reader.get(99), 0.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = std::env::temp_dir().join(format!("mithril-rank-pagerank-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pagerank.out");
        std::fs::write(&path, [0u8; 5]).unwrap();
        assert!(PageRankReader::open(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
