use std::path::PathBuf;

use mithril_crawler::Document;

use crate::block::write_block;
use crate::dictionary::Dictionary;
use crate::document_map::write_document_map;
use crate::error::IndexError;
use crate::index_stats::write_index_stats;
use crate::merge::merge_blocks;
use crate::normalize::normalize_tokens;
use crate::position_index::{merge_position_blocks, write_position_block, PositionDictionary};
use crate::reader::IndexPaths;

/// Default in-memory size, in estimated bytes, at which the builder flushes
/// its current [`Dictionary`]/[`PositionDictionary`] to a block file and
/// starts a fresh one. Mirrors the original `IndexBuilder`'s
/// `MAX_BLOCK_SIZE` (64 MiB of estimated posting data per block).
pub const DEFAULT_BLOCK_SIZE_BYTES: usize = 64 * 1024 * 1024;

pub struct IndexBuilderConfig {
    pub output_dir: PathBuf,
    pub block_size_bytes: usize,
    pub build_positions: bool,
}

impl Default for IndexBuilderConfig {
    fn default() -> Self {
        IndexBuilderConfig { output_dir: PathBuf::from("index"), block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES, build_positions: true }
    }
}

/// Drives the two-pass build: `add_document` accumulates postings (and,
/// unless disabled, term positions) in memory, periodically flushing to
/// block files once the in-memory dictionary grows past
/// `block_size_bytes`; `finalize` k-way merges every flushed block into the
/// final on-disk index and writes the document map alongside it. Mirrors
/// the original `IndexBuilder`'s two-phase block-then-merge pipeline.
pub struct IndexBuilder {
    config: IndexBuilderConfig,
    dictionary: Dictionary,
    positions: PositionDictionary,
    documents: Vec<Document>,
    block_paths: Vec<PathBuf>,
    position_block_paths: Vec<PathBuf>,
    next_block_id: usize,
}

impl IndexBuilder {
    pub fn new(config: IndexBuilderConfig) -> Self {
        IndexBuilder {
            config,
            dictionary: Dictionary::new(),
            positions: PositionDictionary::new(),
            documents: Vec::new(),
            block_paths: Vec::new(),
            position_block_paths: Vec::new(),
            next_block_id: 0,
        }
    }

    /// Accumulates `doc` into the current in-memory block, flushing first
    /// if the previous document pushed the dictionary past the configured
    /// size threshold. `doc`'s title/description/body tokens are
    /// normalized (lowercased already by the crawler; this drops
    /// digit-bearing, URL-fragment, overlong, and letterless tokens, per
    /// `crate::normalize`) before postings or positions are accumulated,
    /// and the normalized document is what gets stored in the document
    /// map, so field token counts stay consistent with what was actually
    /// indexed.
    pub fn add_document(&mut self, doc: &Document) -> Result<(), IndexError> {
        if self.dictionary.estimated_bytes() >= self.config.block_size_bytes {
            self.flush()?;
        }

        let normalized = Document {
            id: doc.id,
            url: doc.url.clone(),
            title: normalize_tokens(&doc.title),
            description: normalize_tokens(&doc.description),
            words: normalize_tokens(&doc.words),
            forward_links: doc.forward_links.clone(),
        };

        self.dictionary.add_document(&normalized);
        if self.config.build_positions {
            self.positions.add_document(&normalized);
        }
        self.documents.push(normalized);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IndexError> {
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|source| IndexError::Io { path: self.config.output_dir.display().to_string(), source })?;

        if !self.dictionary.is_empty() {
            let path = self.config.output_dir.join(format!("block{}.bin", self.next_block_id));
            tracing::debug!(path = %path.display(), bytes = self.dictionary.estimated_bytes(), "flushing posting block");
            write_block(&path, &self.dictionary)?;
            self.block_paths.push(path);
            self.dictionary.clear();
        }

        if self.config.build_positions && !self.positions.is_empty() {
            let path = self.config.output_dir.join(format!("pos_block{}.bin", self.next_block_id));
            write_position_block(&path, &self.positions)?;
            self.position_block_paths.push(path);
            self.positions.clear();
        }

        self.next_block_id += 1;
        Ok(())
    }

    /// Flushes any remaining in-memory postings, merges every block into
    /// the final index, writes the document map, and returns the set of
    /// paths produced. Intermediate block files are left in place; callers
    /// that don't want them kept around should remove `output_dir`'s
    /// `block*.bin`/`pos_block*.bin` files themselves.
    pub fn finalize(mut self) -> Result<IndexPaths, IndexError> {
        self.flush()?;

        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|source| IndexError::Io { path: self.config.output_dir.display().to_string(), source })?;

        tracing::info!(blocks = self.block_paths.len(), documents = self.documents.len(), "merging index blocks");
        let merge_output = merge_blocks(&self.block_paths, &self.config.output_dir)?;
        tracing::info!(terms = merge_output.term_count, "merge complete");

        let document_map_path = self.config.output_dir.join("document_map.data");
        write_document_map(&document_map_path, &self.documents)?;

        let index_stats_path = self.config.output_dir.join("index_stats.data");
        write_index_stats(&index_stats_path, &self.documents)?;

        let (positions_data, position_dictionary) = if self.config.build_positions && !self.position_block_paths.is_empty() {
            let result = merge_position_blocks(&self.position_block_paths, &self.config.output_dir)?;
            (Some(result.data_path), Some(result.dict_path))
        } else {
            (None, None)
        };

        Ok(IndexPaths {
            dir: self.config.output_dir,
            final_index: merge_output.final_index_path,
            term_dictionary: merge_output.term_dictionary_path,
            document_map: document_map_path,
            index_stats: index_stats_path,
            positions_data,
            position_dictionary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, words: &[&str]) -> Document {
        Document {
            id,
            url: format!("http://example.test/{id}"),
            title: vec![],
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    #[test]
    fn flushes_multiple_blocks_when_undersized_threshold() {
        let dir = std::env::temp_dir().join(format!("mithril-index-builder-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let config = IndexBuilderConfig { output_dir: dir.clone(), block_size_bytes: 1, build_positions: false };
        let mut builder = IndexBuilder::new(config);
        builder.add_document(&doc(1, &["a"])).unwrap();
        builder.add_document(&doc(2, &["b"])).unwrap();
        builder.add_document(&doc(3, &["c"])).unwrap();

        assert!(builder.block_paths.len() >= 2);

        let paths = builder.finalize().unwrap();
        assert!(paths.final_index.exists());
        assert!(paths.document_map.exists());
        assert!(paths.positions_data.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn builds_positions_when_enabled() {
        let dir = std::env::temp_dir().join(format!("mithril-index-builder-test-pos-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        builder.add_document(&doc(1, &["quick", "fox"])).unwrap();
        let paths = builder.finalize().unwrap();

        assert!(paths.positions_data.is_some());
        assert!(paths.position_dictionary.is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
