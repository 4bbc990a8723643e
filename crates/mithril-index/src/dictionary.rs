use std::collections::BTreeMap;

use mithril_crawler::{DocId, Document};

use crate::field::{decorate, url_tokens, FIELD_DESC, FIELD_TITLE, FIELD_URL};
use crate::posting::Posting;

/// In-memory accumulation of postings for the documents added since the
/// last flush. A `BTreeMap` keeps terms sorted, which is exactly the order
/// [`crate::block::write_block`] needs and lets [`crate::merge::merge_blocks`]
/// treat every block as already term-sorted. Mirrors the original's
/// `Dictionary` member of `IndexBuilder`.
#[derive(Debug, Default)]
pub struct Dictionary {
    terms: BTreeMap<String, Vec<Posting>>,
    estimated_bytes: usize,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary::default()
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

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Posting>)> {
        self.terms.iter()
    }

    /// Counts term frequencies across `doc`'s title, description, and body
    /// words and folds them into this dictionary under `doc.id`, both
    /// undecorated (so an unqualified query term matches any field) and
    /// decorated per spec.md §4.6's field-qualified ISR prefixes, so a
    /// `title:`/`url:`/`desc:` query can resolve straight to that field's
    /// posting list instead of filtering the undecorated one. Per-field
    /// weighting for BM25F lives in `mithril-rank`, which recovers
    /// per-field token counts from the document map instead.
    pub fn add_document(&mut self, doc: &Document) {
        let mut freqs: BTreeMap<String, u32> = BTreeMap::new();
        for word in doc.title.iter().chain(doc.description.iter()).chain(doc.words.iter()) {
            *freqs.entry(word.clone()).or_insert(0) += 1;
        }
        for word in &doc.title {
            *freqs.entry(decorate(FIELD_TITLE, word)).or_insert(0) += 1;
        }
        for word in &doc.description {
            *freqs.entry(decorate(FIELD_DESC, word)).or_insert(0) += 1;
        }
        for word in url_tokens(&doc.url) {
            *freqs.entry(decorate(FIELD_URL, &word)).or_insert(0) += 1;
        }

        for (term, freq) in freqs {
            let postings = self.terms.entry(term.clone()).or_default();
            self.estimated_bytes += if postings.is_empty() { term.len() + 16 } else { 8 };
            postings.push(Posting { doc_id: doc.id, freq });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, words: &[&str]) -> Document {
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
    fn accumulates_term_frequencies_per_document() {
        let mut dict = Dictionary::new();
        dict.add_document(&doc(1, &["a", "b", "a"]));
        let postings: Vec<_> = dict.iter().collect();
        let a = postings.iter().find(|(t, _)| t.as_str() == "a").unwrap();
        assert_eq!(a.1, &vec![Posting { doc_id: 1, freq: 2 }]);
    }

    #[test]
    fn keeps_terms_sorted() {
        let mut dict = Dictionary::new();
        dict.add_document(&doc(1, &["zebra", "apple", "mango"]));
        let terms: Vec<&String> = dict.iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn appends_postings_across_documents() {
        let mut dict = Dictionary::new();
        dict.add_document(&doc(1, &["a"]));
        dict.add_document(&doc(2, &["a"]));
        let (_, postings) = dict.iter().find(|(t, _)| t.as_str() == "a").unwrap();
        assert_eq!(postings.len(), 2);
    }
}
