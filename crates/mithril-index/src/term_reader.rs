use mithril_crawler::DocId;

use crate::codec;
use crate::error::IndexError;
use crate::posting::{Posting, SyncPoint};

/// Parses one term's full on-disk record out of `final_index.data`'s
/// posting-data section, starting at `offset` (as looked up from the term
/// dictionary, relative to right after the leading `u32` term count).
/// Mirrors `TermReader::findTermWithDict`: the whole posting list and its
/// sync points are decoded eagerly into memory rather than streamed.
pub(crate) fn parse_term_entry(data: &[u8], offset: u64, term: &str) -> Result<(Vec<Posting>, Vec<SyncPoint>), IndexError> {
    let mut pos = 4 + offset as usize; // skip the leading term-count field

    let term_len = read_u32(data, &mut pos)? as usize;
    if term_len != term.len() {
        return Err(IndexError::Corrupt { what: format!("term length mismatch for '{term}'") });
    }
    pos += term_len;

    let postings_count = read_u32(data, &mut pos)? as usize;
    let sync_count = read_u32(data, &mut pos)? as usize;

    let mut sync_points = Vec::with_capacity(sync_count);
    for _ in 0..sync_count {
        let doc_id = read_u32(data, &mut pos)?;
        let posting_index = read_u32(data, &mut pos)?;
        sync_points.push(SyncPoint { doc_id, posting_index });
    }

    let mut doc_ids = Vec::with_capacity(postings_count);
    let mut last_doc_id: DocId = 0;
    for _ in 0..postings_count {
        let delta = codec::decode(data, &mut pos);
        last_doc_id += delta;
        doc_ids.push(last_doc_id);
    }

    let mut postings = Vec::with_capacity(postings_count);
    for doc_id in doc_ids {
        let freq = codec::decode(data, &mut pos);
        postings.push(Posting { doc_id, freq });
    }

    Ok((postings, sync_points))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, IndexError> {
    if *pos + 4 > data.len() {
        return Err(IndexError::Corrupt { what: "unexpected end of posting data".to_string() });
    }
    let v = u32::from_le_bytes(data[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    Ok(v)
}

/// An in-memory cursor over one term's posting list, implementing the
/// index stream reader contract (`has_next`/`next`/`current_doc`/`seek`)
/// that `mithril-query`'s ISR family composes over. Mirrors the original
/// `TermReader`.
#[derive(Debug, Clone)]
pub struct TermReader {
    term: String,
    postings: Vec<Posting>,
    sync_points: Vec<SyncPoint>,
    pos: usize,
    at_end: bool,
}

impl TermReader {
    pub(crate) fn new(term: String, postings: Vec<Posting>, sync_points: Vec<SyncPoint>) -> Self {
        let at_end = postings.is_empty();
        TermReader { term, postings, sync_points, pos: 0, at_end }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn document_count(&self) -> usize {
        self.postings.len()
    }

    pub fn has_next(&self) -> bool {
        !self.at_end && self.pos < self.postings.len()
    }

    pub fn current_doc_id(&self) -> Option<DocId> {
        self.has_next().then(|| self.postings[self.pos].doc_id)
    }

    pub fn current_frequency(&self) -> Option<u32> {
        self.has_next().then(|| self.postings[self.pos].freq)
    }

    pub fn move_next(&mut self) {
        if self.has_next() {
            self.pos += 1;
        }
        if self.pos >= self.postings.len() {
            self.at_end = true;
        }
    }

    /// Advances to the first posting with `doc_id >= target`, using the
    /// sync-point skip list to avoid a full linear scan when `target` is
    /// far ahead of the current position.
    pub fn seek(&mut self, target: DocId) {
        if self.at_end || self.postings.is_empty() {
            return;
        }
        if self.postings[self.pos].doc_id >= target {
            return;
        }
        if target > self.postings.last().unwrap().doc_id {
            self.pos = self.postings.len();
            self.at_end = true;
            return;
        }

        if !self.sync_points.is_empty() {
            let mut best = 0usize;
            for sp in &self.sync_points {
                if sp.doc_id as u64 <= target as u64 {
                    best = sp.posting_index as usize;
                } else {
                    break;
                }
            }
            if best > self.pos {
                self.pos = best;
            }
        }

        while self.pos < self.postings.len() && self.postings[self.pos].doc_id < target {
            self.pos += 1;
        }
        if self.pos >= self.postings.len() {
            self.at_end = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(doc_ids: &[u32]) -> TermReader {
        let postings: Vec<Posting> = doc_ids.iter().map(|&d| Posting { doc_id: d, freq: 1 }).collect();
        TermReader::new("t".to_string(), postings, vec![])
    }

    #[test]
    fn iterates_in_order() {
        let mut r = reader(&[1, 5, 9]);
        let mut seen = vec![];
        while r.has_next() {
            seen.push(r.current_doc_id().unwrap());
            r.move_next();
        }
        assert_eq!(seen, vec![1, 5, 9]);
    }

    #[test]
    fn seek_advances_to_first_match() {
        let mut r = reader(&[1, 5, 9, 20]);
        r.seek(9);
        assert_eq!(r.current_doc_id(), Some(9));
        r.seek(10);
        assert_eq!(r.current_doc_id(), Some(20));
    }

    #[test]
    fn seek_past_end_exhausts_reader() {
        let mut r = reader(&[1, 5]);
        r.seek(100);
        assert!(!r.has_next());
    }

    #[test]
    fn seek_never_moves_backward() {
        let mut r = reader(&[1, 5, 9]);
        r.move_next();
        r.seek(1);
        assert_eq!(r.current_doc_id(), Some(5));
    }

    #[test]
    fn uses_sync_points_to_skip_ahead() {
        let postings: Vec<Posting> = (0..300u32).map(|d| Posting { doc_id: d * 2, freq: 1 }).collect();
        let sync_points = vec![SyncPoint { doc_id: 0, posting_index: 0 }, SyncPoint { doc_id: 256, posting_index: 128 }];
        let mut r = TermReader::new("t".to_string(), postings, sync_points);
        r.seek(260);
        assert_eq!(r.current_doc_id(), Some(260));
    }
}
