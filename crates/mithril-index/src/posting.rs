use mithril_crawler::DocId;

/// One (document, frequency) pair in a term's posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub freq: u32,
}

/// Number of postings between consecutive sync points in a term's posting
/// list, allowing [`crate::term_reader::TermReader::seek`] to binary-search
/// down to a nearby offset before scanning linearly.
pub const SYNC_INTERVAL: usize = 128;

/// A skip-list entry: the `posting_index`-th posting in a term's list has
/// this `doc_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint {
    pub doc_id: DocId,
    pub posting_index: u32,
}
