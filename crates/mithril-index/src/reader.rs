use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::document_map::DocumentMapReader;
use crate::error::IndexError;
use crate::index_stats::IndexStats;
use crate::position_index::PositionIndex;
use crate::term_dictionary::TermDictionary;
use crate::term_reader::{parse_term_entry, TermReader};

/// Top-level handle over a finished index directory, as written by
/// [`crate::builder::IndexBuilder::finalize`]: the term dictionary, the
/// mmapped posting data it points into, the document map, and (if phrase
/// support was built) the position index. This is the entry point
/// `mithril-query` opens once per index generation and holds for the
/// lifetime of the serving process.
pub struct IndexReader {
    dictionary: TermDictionary,
    data: Mmap,
    documents: DocumentMapReader,
    stats: IndexStats,
    positions: Option<PositionIndex>,
}

impl IndexReader {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let dir = dir.as_ref();

        let dictionary = TermDictionary::open(dir.join("term_dictionary.bin"))?;

        let data_path = dir.join("final_index.data");
        let data_file = File::open(&data_path).map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;
        let data = unsafe { Mmap::map(&data_file) }.map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;

        let documents = DocumentMapReader::open(dir.join("document_map.data"))?;
        let stats = IndexStats::open(dir.join("index_stats.data"))?;

        let positions_data = dir.join("positions.data");
        let positions_dict = dir.join("positions.dict");
        let positions = if positions_data.exists() && positions_dict.exists() {
            Some(PositionIndex::open(&positions_data, &positions_dict)?)
        } else {
            None
        };

        Ok(IndexReader { dictionary, data, documents, stats, positions })
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.document_count()
    }

    pub fn documents(&self) -> &DocumentMapReader {
        &self.documents
    }

    pub fn positions(&self) -> Option<&PositionIndex> {
        self.positions.as_ref()
    }

    /// Opens a cursor over `term`'s posting list, or `None` if the term
    /// never appears in the index.
    pub fn open_term(&self, term: &str) -> Result<Option<TermReader>, IndexError> {
        let Some(offset) = self.dictionary.lookup(term) else {
            return Ok(None);
        };
        let (postings, sync_points) = parse_term_entry(&self.data, offset, term)?;
        Ok(Some(TermReader::new(term.to_string(), postings, sync_points)))
    }
}

/// Paths produced by a completed build, handed to callers that want to
/// move or publish the index directory as a unit (e.g. an atomic rename
/// into the serving path).
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub dir: PathBuf,
    pub final_index: PathBuf,
    pub term_dictionary: PathBuf,
    pub document_map: PathBuf,
    pub index_stats: PathBuf,
    pub positions_data: Option<PathBuf>,
    pub position_dictionary: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{IndexBuilder, IndexBuilderConfig};
    use mithril_crawler::Document;

    fn doc(id: u32, words: &[&str]) -> Document {
        Document {
            id,
            url: format!("http://example.test/{id}"),
            title: vec!["title".to_string()],
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    #[test]
    fn builds_and_reopens_an_index() {
        let dir = std::env::temp_dir().join(format!("mithril-index-reader-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        builder.add_document(&doc(1, &["apple", "banana"])).unwrap();
        builder.add_document(&doc(2, &["banana", "cherry"])).unwrap();
        let paths = builder.finalize().unwrap();

        let reader = IndexReader::open(&paths.dir).unwrap();
        assert_eq!(reader.document_count(), 2);

        let mut term = reader.open_term("banana").unwrap().unwrap();
        assert_eq!(term.current_doc_id(), Some(1));
        term.move_next();
        assert_eq!(term.current_doc_id(), Some(2));

        assert!(reader.open_term("missing").unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
