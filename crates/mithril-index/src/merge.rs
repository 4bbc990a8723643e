use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::block::BlockReader;
use crate::codec;
use crate::error::IndexError;
use crate::posting::{Posting, SyncPoint, SYNC_INTERVAL};
use crate::term_dictionary::build_term_dictionary;

/// Result of a successful merge: where the posting data and term
/// dictionary ended up, and how many distinct terms were written.
pub struct MergeOutput {
    pub final_index_path: PathBuf,
    pub term_dictionary_path: PathBuf,
    pub term_count: usize,
}

/// K-way merges every block in `block_paths` (in the order they were
/// flushed — earliest block first, so a term's postings stay sorted by
/// `doc_id` once concatenated) into `output_dir/final_index.data`, and
/// builds `output_dir/term_dictionary.bin` alongside it. Mirrors the
/// original's `merge_block_subset`, minus its tiered-merge chunking (this
/// merges all blocks in one pass).
pub fn merge_blocks(block_paths: &[PathBuf], output_dir: &Path) -> Result<MergeOutput, IndexError> {
    let mut readers: Vec<BlockReader> = block_paths.iter().map(BlockReader::open).collect::<Result<_, _>>()?;

    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    for (i, r) in readers.iter().enumerate() {
        if r.has_next {
            heap.push(Reverse((r.current_term.clone(), i)));
        }
    }

    let final_index_path = output_dir.join("final_index.data");
    let term_dictionary_path = output_dir.join("term_dictionary.bin");

    let mut postings_section = Vec::new();
    let mut entries: Vec<(String, u64)> = Vec::new();

    while let Some(Reverse((term, first_idx))) = heap.pop() {
        // The heap orders (term, block_index) tuples ascending, so ties on
        // `term` surface in block order — exactly the order needed to keep
        // a term's postings sorted by `doc_id` once concatenated, since
        // each block's own postings are already doc_id-ascending.
        let mut postings: Vec<Posting> = readers[first_idx].current_postings.clone();
        advance_reader(&mut readers, &mut heap, first_idx);

        while let Some(Reverse((next_term, _))) = heap.peek() {
            if *next_term != term {
                break;
            }
            let Reverse((_, idx)) = heap.pop().unwrap();
            postings.extend_from_slice(&readers[idx].current_postings);
            advance_reader(&mut readers, &mut heap, idx);
        }

        let offset = postings_section.len() as u64;
        write_term_entry(&mut postings_section, &term, &postings);
        entries.push((term, offset));
    }

    let file = File::create(&final_index_path)
        .map_err(|source| IndexError::Io { path: final_index_path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);
    w.write_u32::<LittleEndian>(entries.len() as u32)
        .and_then(|_| w.write_all(&postings_section))
        .and_then(|_| w.flush())
        .map_err(|source| IndexError::Io { path: final_index_path.display().to_string(), source })?;

    build_term_dictionary(&term_dictionary_path, &entries)?;

    Ok(MergeOutput { final_index_path, term_dictionary_path, term_count: entries.len() })
}

fn advance_reader(readers: &mut [BlockReader], heap: &mut BinaryHeap<Reverse<(String, usize)>>, idx: usize) {
    readers[idx].read_next();
    if readers[idx].has_next {
        heap.push(Reverse((readers[idx].current_term.clone(), idx)));
    }
}

/// Appends one term's full on-disk record to `out`:
/// `[u32 term_len][term][u32 postings_count][u32 sync_count][sync points]
/// [VByte doc-id deltas][VByte freqs]`, per spec.md §4.5.
fn write_term_entry(out: &mut Vec<u8>, term: &str, postings: &[Posting]) {
    let term_bytes = term.as_bytes();
    out.extend_from_slice(&(term_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(term_bytes);
    out.extend_from_slice(&(postings.len() as u32).to_le_bytes());

    let sync_points: Vec<SyncPoint> = postings
        .iter()
        .enumerate()
        .step_by(SYNC_INTERVAL)
        .map(|(i, p)| SyncPoint { doc_id: p.doc_id, posting_index: i as u32 })
        .collect();
    out.extend_from_slice(&(sync_points.len() as u32).to_le_bytes());
    for sp in &sync_points {
        out.extend_from_slice(&sp.doc_id.to_le_bytes());
        out.extend_from_slice(&sp.posting_index.to_le_bytes());
    }

    let mut last_doc_id = 0u32;
    for p in postings {
        codec::encode(p.doc_id - last_doc_id, out);
        last_doc_id = p.doc_id;
    }
    for p in postings {
        codec::encode(p.freq, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::write_block;
    use crate::dictionary::Dictionary;
    use mithril_crawler::Document;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mithril-index-merge-test-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

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
    fn merges_two_blocks_preserving_doc_id_order() {
        let dir = temp_dir("basic");

        let mut d1 = Dictionary::new();
        d1.add_document(&doc(1, &["apple", "shared"]));
        let b1 = dir.join("block0.bin");
        write_block(&b1, &d1).unwrap();

        let mut d2 = Dictionary::new();
        d2.add_document(&doc(2, &["banana", "shared"]));
        let b2 = dir.join("block1.bin");
        write_block(&b2, &d2).unwrap();

        let result = merge_blocks(&[b1, b2], &dir).unwrap();
        assert_eq!(result.term_count, 3);

        let raw = std::fs::read(&result.final_index_path).unwrap();
        let term_count = u32::from_le_bytes(raw[0..4].try_into().unwrap());
        assert_eq!(term_count, 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
