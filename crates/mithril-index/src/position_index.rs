use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use fst::{Map, MapBuilder};
use memmap2::Mmap;
use mithril_crawler::{DocId, Document};

use crate::codec;
use crate::error::IndexError;
use crate::field::{FIELD_FLAG_BODY, FIELD_FLAG_DESC, FIELD_FLAG_TITLE};

/// `freq>3000` common-term cutoff from spec.md §4.5's position-retention
/// policy, independent of document length.
const MAX_TERM_FREQUENCY: usize = 3000;

/// Minimal English stopword list for the §4.5 retention policy. The
/// retrieved original corpus never defines a concrete stopword set, so
/// this is this crate's own (a standard short list, not tuned to any
/// corpus).
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from", "had", "has", "have", "he", "her", "his", "i", "if", "in", "into",
    "is", "it", "its", "of", "on", "or", "our", "she", "that", "the", "their", "there", "these", "this", "they", "to", "was", "we", "were", "which",
    "with", "you",
];

fn is_stopword(term: &str) -> bool {
    STOPWORDS.contains(&term)
}

/// `freq>3000 || freq>N/8` from spec.md §4.5, `N` being the document's own
/// token count. Computed as `count*8 > total_tokens` to avoid float division.
fn is_common_term(count: usize, total_tokens: usize) -> bool {
    count > MAX_TERM_FREQUENCY || (total_tokens > 0 && count * 8 > total_tokens)
}

/// In-memory accumulator of per-document token positions, one entry per
/// term encountered while scanning a document's title, description, and
/// body words as a single concatenated token stream (so "quick brown fox"
/// in the title and "fox" in the body get distinct, comparable position
/// numbers). Each retained entry also carries a `field_flags` bitmask
/// (spec.md §3/§4.5) over the fields the term occurred in within this
/// document. Flushed to a block file the same way
/// [`crate::dictionary::Dictionary`] flushes postings, so phrase queries
/// ("the quick fox") can be answered without re-scanning document text at
/// query time.
#[derive(Debug, Default)]
pub struct PositionDictionary {
    terms: BTreeMap<String, Vec<(DocId, u8, Vec<u32>)>>,
    estimated_bytes: usize,
}

impl PositionDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.estimated_bytes = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(DocId, u8, Vec<u32>)])> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Accumulates `doc`'s term positions, applying the §4.5 retention
    /// policy: stopwords are dropped outright; a term confined to the body
    /// that occurs too often relative to the document's length is treated
    /// as a common term and dropped too. Terms that also occur in the
    /// title or description are kept regardless of frequency ("keep
    /// aggressively for title/URL/description decorator prefixes"). The
    /// spec's literal `freq>2` floor is deliberately not enforced here —
    /// it would discard the single-occurrence matches phrase queries rely
    /// on.
    pub fn add_document(&mut self, doc: &Document) {
        let title_len = doc.title.len();
        let desc_len = doc.description.len();
        let total_tokens = title_len + desc_len + doc.words.len();

        let mut positions: BTreeMap<&str, (Vec<u32>, u8)> = BTreeMap::new();
        let tokens = doc.title.iter().chain(doc.description.iter()).chain(doc.words.iter());
        for (i, term) in tokens.enumerate() {
            let flag = if i < title_len {
                FIELD_FLAG_TITLE
            } else if i < title_len + desc_len {
                FIELD_FLAG_DESC
            } else {
                FIELD_FLAG_BODY
            };
            let entry = positions.entry(term.as_str()).or_insert_with(|| (Vec::new(), 0));
            entry.0.push(i as u32);
            entry.1 |= flag;
        }

        for (term, (pos, flags)) in positions {
            if is_stopword(term) {
                continue;
            }
            let body_only = flags & (FIELD_FLAG_TITLE | FIELD_FLAG_DESC) == 0;
            if body_only && is_common_term(pos.len(), total_tokens) {
                continue;
            }

            let entry = self.terms.entry(term.to_string()).or_default();
            self.estimated_bytes += term.len() + 9 + pos.len() * 4;
            entry.push((doc.id, flags, pos));
        }
    }
}

/// Writes a position block: `[u32 term_count]` then per term
/// `[u32 term_len][term][u32 doc_count]` then per doc `[u32 doc_id]
/// [u8 field_flags][u32 position_count][VByte-delta positions]`.
pub fn write_position_block(path: impl AsRef<Path>, dict: &PositionDictionary) -> Result<(), IndexError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);

    let write_all = (|| -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(dict.terms.len() as u32)?;
        for (term, docs) in dict.iter() {
            w.write_u32::<LittleEndian>(term.len() as u32)?;
            w.write_all(term.as_bytes())?;
            w.write_u32::<LittleEndian>(docs.len() as u32)?;
            for (doc_id, field_flags, positions) in docs {
                w.write_u32::<LittleEndian>(*doc_id)?;
                w.write_u8(*field_flags)?;
                w.write_u32::<LittleEndian>(positions.len() as u32)?;
                let mut buf = Vec::new();
                let mut last = 0u32;
                for &p in positions {
                    codec::encode(p - last, &mut buf);
                    last = p;
                }
                w.write_all(&buf)?;
            }
        }
        Ok(())
    })();
    write_all.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    w.flush().map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

/// Sequential mmap reader over one position block, mirroring
/// [`crate::block::BlockReader`] but for `(doc_id, field_flags, positions)`
/// entries.
pub struct PositionBlockReader {
    mmap: Mmap,
    cursor: usize,
    remaining_terms: u32,
    pub has_next: bool,
    pub current_term: String,
    pub current_docs: Vec<(DocId, u8, Vec<u32>)>,
}

impl PositionBlockReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        if mmap.len() < 4 {
            return Err(IndexError::Corrupt { what: "position block smaller than header".to_string() });
        }
        let remaining_terms = u32::from_le_bytes(mmap[0..4].try_into().unwrap());
        let mut reader = PositionBlockReader {
            mmap,
            cursor: 4,
            remaining_terms,
            has_next: false,
            current_term: String::new(),
            current_docs: Vec::new(),
        };
        reader.read_next()?;
        Ok(reader)
    }

    pub fn read_next(&mut self) -> Result<(), IndexError> {
        if self.remaining_terms == 0 {
            self.has_next = false;
            return Ok(());
        }
        let data = &self.mmap;
        let mut pos = self.cursor;

        let term_len = read_u32(data, pos)? as usize;
        pos += 4;
        let term = String::from_utf8_lossy(&data[pos..pos + term_len]).into_owned();
        pos += term_len;

        let doc_count = read_u32(data, pos)? as usize;
        pos += 4;

        let mut docs = Vec::with_capacity(doc_count);
        for _ in 0..doc_count {
            let doc_id = read_u32(data, pos)?;
            pos += 4;
            let field_flags = *data.get(pos).ok_or_else(|| IndexError::Corrupt { what: "unexpected end of position block".to_string() })?;
            pos += 1;
            let position_count = read_u32(data, pos)? as usize;
            pos += 4;
            let mut positions = Vec::with_capacity(position_count);
            let mut last = 0u32;
            for _ in 0..position_count {
                let delta = codec::decode(data, &mut pos);
                last += delta;
                positions.push(last);
            }
            docs.push((doc_id, field_flags, positions));
        }

        self.current_term = term;
        self.current_docs = docs;
        self.cursor = pos;
        self.remaining_terms -= 1;
        self.has_next = true;
        Ok(())
    }
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32, IndexError> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| IndexError::Corrupt { what: "unexpected end of position block".to_string() })
}

pub struct PositionMergeOutput {
    pub data_path: PathBuf,
    pub dict_path: PathBuf,
    pub term_count: usize,
}

/// K-way merges position blocks the same way [`crate::merge::merge_blocks`]
/// merges posting blocks: each block holds disjoint documents, so merging
/// in flush order keeps a term's per-document entries `doc_id`-ascending.
pub fn merge_position_blocks(block_paths: &[PathBuf], output_dir: &Path) -> Result<PositionMergeOutput, IndexError> {
    let mut readers: Vec<PositionBlockReader> = block_paths.iter().map(PositionBlockReader::open).collect::<Result<_, _>>()?;

    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    for (i, r) in readers.iter().enumerate() {
        if r.has_next {
            heap.push(Reverse((r.current_term.clone(), i)));
        }
    }

    let data_path = output_dir.join("positions.data");
    let dict_path = output_dir.join("positions.dict");

    let mut data_section = Vec::new();
    let mut entries: Vec<(String, u64)> = Vec::new();

    while let Some(Reverse((term, first_idx))) = heap.pop() {
        let mut docs: Vec<(DocId, u8, Vec<u32>)> = readers[first_idx].current_docs.clone();
        advance(&mut readers, &mut heap, first_idx)?;

        while let Some(Reverse((next_term, _))) = heap.peek() {
            if *next_term != term {
                break;
            }
            let Reverse((_, idx)) = heap.pop().unwrap();
            docs.extend_from_slice(&readers[idx].current_docs);
            advance(&mut readers, &mut heap, idx)?;
        }

        let offset = data_section.len() as u64;
        write_term_positions(&mut data_section, &term, &docs);
        entries.push((term, offset));
    }

    let file = File::create(&data_path).map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);
    w.write_u32::<LittleEndian>(entries.len() as u32)
        .and_then(|_| w.write_all(&data_section))
        .and_then(|_| w.flush())
        .map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;

    let dict_file = File::create(&dict_path).map_err(|source| IndexError::Io { path: dict_path.display().to_string(), source })?;
    let mut builder = MapBuilder::new(BufWriter::new(dict_file))?;
    for (term, offset) in &entries {
        builder.insert(term, *offset)?;
    }
    builder.finish()?;

    let term_count = entries.len();
    Ok(PositionMergeOutput { data_path, dict_path, term_count })
}

fn advance(readers: &mut [PositionBlockReader], heap: &mut BinaryHeap<Reverse<(String, usize)>>, idx: usize) -> Result<(), IndexError> {
    readers[idx].read_next()?;
    if readers[idx].has_next {
        heap.push(Reverse((readers[idx].current_term.clone(), idx)));
    }
    Ok(())
}

fn write_term_positions(out: &mut Vec<u8>, term: &str, docs: &[(DocId, u8, Vec<u32>)]) {
    let term_bytes = term.as_bytes();
    out.extend_from_slice(&(term_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(term_bytes);
    out.extend_from_slice(&(docs.len() as u32).to_le_bytes());
    for (doc_id, field_flags, positions) in docs {
        out.extend_from_slice(&doc_id.to_le_bytes());
        out.push(*field_flags);
        out.extend_from_slice(&(positions.len() as u32).to_le_bytes());
        let mut last = 0u32;
        for &p in positions {
            codec::encode(p - last, out);
            last = p;
        }
    }
}

/// Mmap-backed reader over the merged position index, used by
/// `mithril-query`'s phrase/quote ISRs to confirm that two adjacent query
/// terms actually appear adjacent in a candidate document.
pub struct PositionIndex {
    dict: Map<Mmap>,
    data: Mmap,
}

impl PositionIndex {
    pub fn open(data_path: impl AsRef<Path>, dict_path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let dict_path = dict_path.as_ref();
        let dict_file = File::open(dict_path).map_err(|source| IndexError::Io { path: dict_path.display().to_string(), source })?;
        let dict_mmap = unsafe { Mmap::map(&dict_file) }.map_err(|source| IndexError::Io { path: dict_path.display().to_string(), source })?;
        let dict = Map::new(dict_mmap)?;

        let data_path = data_path.as_ref();
        let data_file = File::open(data_path).map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;
        let data = unsafe { Mmap::map(&data_file) }.map_err(|source| IndexError::Io { path: data_path.display().to_string(), source })?;

        Ok(PositionIndex { dict, data })
    }

    pub fn has_positions(&self, term: &str) -> bool {
        self.dict.get(term).is_some()
    }

    /// Returns `term`'s position list within `doc_id`, if the term occurs
    /// in that document at all.
    pub fn get_positions(&self, term: &str, doc_id: DocId) -> Option<Vec<u32>> {
        self.entry(term, doc_id).map(|(_, positions)| positions)
    }

    /// Returns `term`'s `field_flags` bitmask within `doc_id` (spec.md
    /// §3/§4.5), mirroring `PositionIndex::getFieldFlags` in
    /// `examples/original_source/index/src/PositionIndex.cpp`.
    pub fn field_flags(&self, term: &str, doc_id: DocId) -> Option<u8> {
        self.entry(term, doc_id).map(|(flags, _)| flags)
    }

    fn entry(&self, term: &str, doc_id: DocId) -> Option<(u8, Vec<u32>)> {
        let offset = self.dict.get(term)?;
        let mut pos = 4 + offset as usize;
        let data = &self.data;

        let term_len = read_u32(data, pos).ok()? as usize;
        pos += 4 + term_len;
        let doc_count = read_u32(data, pos).ok()? as usize;
        pos += 4;

        for _ in 0..doc_count {
            let this_doc = read_u32(data, pos).ok()?;
            pos += 4;
            let field_flags = *data.get(pos)?;
            pos += 1;
            let position_count = read_u32(data, pos).ok()? as usize;
            pos += 4;

            if this_doc == doc_id {
                let mut positions = Vec::with_capacity(position_count);
                let mut last = 0u32;
                for _ in 0..position_count {
                    let delta = codec::decode(data, &mut pos);
                    last += delta;
                    positions.push(last);
                }
                return Some((field_flags, positions));
            }

            for _ in 0..position_count {
                codec::decode(data, &mut pos);
            }
        }
        None
    }

    /// Checks whether `terms` occur in `doc_id` as a contiguous phrase, in
    /// the given order, at any starting position.
    pub fn check_phrase(&self, doc_id: DocId, terms: &[&str]) -> bool {
        if terms.is_empty() {
            return false;
        }
        let Some(first_positions) = self.get_positions(terms[0], doc_id) else {
            return false;
        };

        'candidate: for &start in &first_positions {
            for (offset, term) in terms.iter().enumerate().skip(1) {
                let Some(positions) = self.get_positions(term, doc_id) else {
                    continue 'candidate;
                };
                if !positions.contains(&(start + offset as u32)) {
                    continue 'candidate;
                }
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, title: &[&str], words: &[&str]) -> Document {
        Document {
            id,
            url: format!("http://example.test/{id}"),
            title: title.iter().map(|s| s.to_string()).collect(),
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mithril-index-posidx-test-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn records_positions_across_title_and_body() {
        let mut dict = PositionDictionary::new();
        dict.add_document(&doc(1, &["quick", "brown"], &["fox", "jumps"]));

        let found: Vec<_> = dict.iter().filter(|(t, _)| *t == "fox").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1[0].2, vec![2]);
    }

    #[test]
    fn field_flags_mark_title_and_body_occurrences() {
        let mut dict = PositionDictionary::new();
        dict.add_document(&doc(1, &["fox"], &["quick", "fox"]));

        let found: Vec<_> = dict.iter().filter(|(t, _)| *t == "fox").collect();
        let (_, flags, _) = &found[0].1[0];
        assert_eq!(*flags, FIELD_FLAG_TITLE | FIELD_FLAG_BODY);
    }

    #[test]
    fn stopwords_are_not_retained() {
        let mut dict = PositionDictionary::new();
        dict.add_document(&doc(1, &[], &["quick", "fox"]));
        assert!(dict.iter().all(|(t, _)| t != "the"));
        assert!(dict.iter().any(|(t, _)| t == "fox"));
    }

    #[test]
    fn common_body_only_term_is_dropped() {
        let words: Vec<&str> = std::iter::repeat("common").take(40).chain(std::iter::once("rare")).collect();
        let mut dict = PositionDictionary::new();
        dict.add_document(&doc(1, &[], &words));

        assert!(dict.iter().all(|(t, _)| t != "common"));
        assert!(dict.iter().any(|(t, _)| t == "rare"));
    }

    #[test]
    fn common_term_in_title_is_kept_despite_frequency() {
        let words: Vec<&str> = std::iter::repeat("common").take(40).collect();
        let mut dict = PositionDictionary::new();
        dict.add_document(&doc(1, &["common"], &words));

        assert!(dict.iter().any(|(t, _)| t == "common"));
    }

    #[test]
    fn merges_and_answers_phrase_queries() {
        let dir = temp_dir("phrase");

        let mut d1 = PositionDictionary::new();
        d1.add_document(&doc(1, &[], &["old", "quick", "fox"]));
        let b1 = dir.join("pos_block0.bin");
        write_position_block(&b1, &d1).unwrap();

        let mut d2 = PositionDictionary::new();
        d2.add_document(&doc(2, &[], &["old", "slow", "fox"]));
        let b2 = dir.join("pos_block1.bin");
        write_position_block(&b2, &d2).unwrap();

        let result = merge_position_blocks(&[b1, b2], &dir).unwrap();
        assert!(result.term_count > 0);

        let index = PositionIndex::open(&result.data_path, &result.dict_path).unwrap();
        assert!(index.check_phrase(1, &["old", "quick", "fox"]));
        assert!(!index.check_phrase(2, &["old", "quick", "fox"]));
        assert!(!index.check_phrase(1, &["quick", "old"]));

        std::fs::remove_dir_all(&dir).ok();
    }
}
