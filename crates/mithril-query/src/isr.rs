//! The Index Stream Reader (ISR) family: lazy, seekable streams of matching
//! document ids, composed by [`crate::plan::compile`] from a parsed query
//! tree. Mirrors `examples/original_source/index/src/ISR.{h,cpp}`'s
//! `ISR`/`TermISR`/`AndISR`/`OrISR` class hierarchy, re-expressed as a
//! trait object sum type per spec.md §9's redesign note rather than a C++
//! virtual base class. `NotISR`/`PhraseISR`/`QuoteISR` have no counterpart
//! in the original's header but follow the same `next_doc`/`seek`/
//! `current_doc` contract (spec.md §4.6).

use mithril_crawler::DocId;
use mithril_index::{PositionIndex, TermReader};

/// Default maximum gap (in token positions) a fuzzy phrase tolerates
/// between its first and last term, per spec.md §4.6.
pub const DEFAULT_MAX_SPAN: u32 = 5;

/// Shared contract every index stream reader implements (spec.md §4.6).
/// `current_doc`'s behavior when `!has_next()` is unspecified by the
/// caller's contract (the spec calls it "UB"); implementations here return
/// `None` rather than panicking, which is the safe Rust rendering of that
/// precondition.
pub trait Isr {
    fn has_next(&self) -> bool;
    fn current_doc(&self) -> Option<DocId>;
    fn next_doc(&mut self);
    fn seek(&mut self, target: DocId);
    fn current_frequency(&self) -> Option<u32> {
        None
    }

    /// Total number of documents this stream can ever produce, if known
    /// up front. `AndIsr` uses this to order its children rarest-first
    /// (spec.md §4.6) before converging; `None` means unknown (composite
    /// ISRs don't report one) and sorts after every known value.
    fn document_frequency(&self) -> Option<usize> {
        None
    }
}

/// Wraps a single term's decoded posting list.
pub struct TermIsr {
    reader: TermReader,
}

impl TermIsr {
    pub fn new(reader: TermReader) -> Self {
        TermIsr { reader }
    }

    /// An ISR over zero documents, for a term absent from the index
    /// (spec.md §4.11: "a missing term in an ISR yields an empty stream").
    pub fn empty() -> EmptyIsr {
        EmptyIsr
    }
}

impl Isr for TermIsr {
    fn has_next(&self) -> bool {
        self.reader.has_next()
    }

    fn current_doc(&self) -> Option<DocId> {
        self.reader.current_doc_id()
    }

    fn next_doc(&mut self) {
        self.reader.move_next();
    }

    fn seek(&mut self, target: DocId) {
        self.reader.seek(target);
    }

    fn current_frequency(&self) -> Option<u32> {
        self.reader.current_frequency()
    }

    fn document_frequency(&self) -> Option<usize> {
        Some(self.reader.document_count())
    }
}

/// An always-exhausted stream, used for terms that never appear in the
/// index instead of surfacing an error (spec.md §4.11).
pub struct EmptyIsr;

impl Isr for EmptyIsr {
    fn has_next(&self) -> bool {
        false
    }

    fn current_doc(&self) -> Option<DocId> {
        None
    }

    fn next_doc(&mut self) {}

    fn seek(&mut self, _target: DocId) {}
}

/// Intersection of K children, rarest-first leader-based convergence, per
/// spec.md §4.6: repeatedly seek every follower to the leader's current
/// doc; if a follower lands past it, restart the leader there.
pub struct AndIsr {
    children: Vec<Box<dyn Isr>>,
    at_end: bool,
}

impl AndIsr {
    pub fn new(mut children: Vec<Box<dyn Isr>>) -> Box<dyn Isr> {
        if children.iter().any(|c| !c.has_next()) {
            return Box::new(EmptyIsr);
        }
        if children.is_empty() {
            return Box::new(EmptyIsr);
        }
        if children.len() == 1 {
            return children.pop().unwrap();
        }
        children.sort_by_key(|c| c.document_frequency().unwrap_or(usize::MAX));
        let mut isr = AndIsr { children, at_end: false };
        isr.converge();
        Box::new(isr)
    }

    /// Advances every child until they all sit on the same doc id, or one
    /// is exhausted. Leaves `children[0]` at the converged doc on success.
    fn converge(&mut self) {
        loop {
            if self.children.iter().any(|c| !c.has_next()) {
                self.at_end = true;
                return;
            }
            let target = self.children.iter().filter_map(|c| c.current_doc()).max().unwrap();
            let mut all_match = true;
            for child in &mut self.children {
                child.seek(target);
                if !child.has_next() {
                    self.at_end = true;
                    return;
                }
                if child.current_doc() != Some(target) {
                    all_match = false;
                }
            }
            if all_match {
                return;
            }
        }
    }
}

impl Isr for AndIsr {
    fn has_next(&self) -> bool {
        !self.at_end
    }

    fn current_doc(&self) -> Option<DocId> {
        if self.at_end {
            return None;
        }
        self.children[0].current_doc()
    }

    fn next_doc(&mut self) {
        if self.at_end {
            return;
        }
        self.children[0].next_doc();
        self.converge();
    }

    fn seek(&mut self, target: DocId) {
        if self.at_end {
            return;
        }
        self.children[0].seek(target);
        self.converge();
    }

    fn current_frequency(&self) -> Option<u32> {
        self.children.iter().filter_map(|c| c.current_frequency()).max()
    }
}

/// Union of K children: always at the minimum current doc across every
/// non-exhausted child (spec.md §4.6).
pub struct OrIsr {
    children: Vec<Box<dyn Isr>>,
}

impl OrIsr {
    pub fn new(mut children: Vec<Box<dyn Isr>>) -> Box<dyn Isr> {
        children.retain(|c| c.has_next());
        if children.is_empty() {
            return Box::new(EmptyIsr);
        }
        if children.len() == 1 {
            return children.pop().unwrap();
        }
        Box::new(OrIsr { children })
    }

    fn min_doc(&self) -> Option<DocId> {
        self.children.iter().filter_map(|c| c.has_next().then(|| c.current_doc()).flatten()).min()
    }
}

impl Isr for OrIsr {
    fn has_next(&self) -> bool {
        self.children.iter().any(|c| c.has_next())
    }

    fn current_doc(&self) -> Option<DocId> {
        self.min_doc()
    }

    fn next_doc(&mut self) {
        let Some(min) = self.min_doc() else { return };
        for child in &mut self.children {
            if child.has_next() && child.current_doc() == Some(min) {
                child.next_doc();
            }
        }
    }

    fn seek(&mut self, target: DocId) {
        for child in &mut self.children {
            child.seek(target);
        }
    }

    fn current_frequency(&self) -> Option<u32> {
        let min = self.min_doc()?;
        self.children.iter().filter(|c| c.current_doc() == Some(min)).filter_map(|c| c.current_frequency()).max()
    }
}

/// Complement of a child over `[0, max_doc_id)` (spec.md §4.6): produces
/// every doc id the child does *not* produce.
pub struct NotIsr {
    child: Box<dyn Isr>,
    max_doc_id: DocId,
    current: DocId,
}

impl NotIsr {
    pub fn new(child: Box<dyn Isr>, max_doc_id: DocId) -> Self {
        let mut isr = NotIsr { child, max_doc_id, current: 0 };
        isr.skip_matches();
        isr
    }

    fn skip_matches(&mut self) {
        while self.current < self.max_doc_id {
            if self.child.has_next() {
                self.child.seek(self.current);
            }
            if self.child.has_next() && self.child.current_doc() == Some(self.current) {
                self.current += 1;
                continue;
            }
            break;
        }
    }
}

impl Isr for NotIsr {
    fn has_next(&self) -> bool {
        self.current < self.max_doc_id
    }

    fn current_doc(&self) -> Option<DocId> {
        self.has_next().then_some(self.current)
    }

    fn next_doc(&mut self) {
        if !self.has_next() {
            return;
        }
        self.current += 1;
        self.skip_matches();
    }

    fn seek(&mut self, target: DocId) {
        if target > self.current {
            self.current = target;
        }
        self.skip_matches();
    }
}

/// Confirms, for each doc the AND of its term ISRs matches, that the query
/// terms' positions in that doc satisfy a span constraint. `strict=true`
/// (the double-quoted `QuoteISR`) requires consecutive positions;
/// `strict=false` (single-quoted `PhraseISR`) allows any ordered span up to
/// `max_span`.
pub struct PhraseIsr<'a> {
    and: Box<dyn Isr + 'a>,
    positions: &'a PositionIndex,
    terms: Vec<String>,
    strict: bool,
    max_span: u32,
}

impl<'a> PhraseIsr<'a> {
    pub fn new(term_readers: Vec<TermReader>, terms: Vec<String>, positions: &'a PositionIndex, strict: bool, max_span: u32) -> Box<dyn Isr + 'a> {
        let children: Vec<Box<dyn Isr>> = term_readers.into_iter().map(|r| Box::new(TermIsr::new(r)) as Box<dyn Isr>).collect();
        let and = AndIsr::new(children);
        let mut isr = PhraseIsr { and, positions, terms, strict, max_span };
        isr.skip_to_match();
        Box::new(isr)
    }

    fn matches(&self, doc_id: DocId) -> bool {
        let refs: Vec<&str> = self.terms.iter().map(|s| s.as_str()).collect();
        if self.strict {
            self.positions.check_phrase(doc_id, &refs)
        } else {
            check_fuzzy_phrase(self.positions, doc_id, &refs, self.max_span)
        }
    }

    fn skip_to_match(&mut self) {
        while self.and.has_next() {
            let Some(doc_id) = self.and.current_doc() else { break };
            if self.matches(doc_id) {
                return;
            }
            self.and.next_doc();
        }
    }
}

/// Checks whether `terms` occur in `doc_id` in order with `p_last - p_first
/// <= max_span`, per spec.md §4.6/§8 (the single-quoted `'...'` semantics).
fn check_fuzzy_phrase(positions: &PositionIndex, doc_id: DocId, terms: &[&str], max_span: u32) -> bool {
    let Some(first_positions) = (!terms.is_empty()).then(|| positions.get_positions(terms[0], doc_id)).flatten() else {
        return false;
    };

    'start: for &start in &first_positions {
        let mut prev = start;
        for term in &terms[1..] {
            let Some(next_positions) = positions.get_positions(term, doc_id) else { continue 'start };
            let Some(&next) = next_positions.iter().find(|&&p| p > prev) else { continue 'start };
            prev = next;
        }
        if prev.saturating_sub(start) <= max_span {
            return true;
        }
    }
    false
}

impl<'a> Isr for PhraseIsr<'a> {
    fn has_next(&self) -> bool {
        self.and.has_next()
    }

    fn current_doc(&self) -> Option<DocId> {
        self.and.current_doc()
    }

    fn next_doc(&mut self) {
        if !self.and.has_next() {
            return;
        }
        self.and.next_doc();
        self.skip_to_match();
    }

    fn seek(&mut self, target: DocId) {
        self.and.seek(target);
        self.skip_to_match();
    }

    fn current_frequency(&self) -> Option<u32> {
        self.and.current_frequency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_index::{IndexBuilder, IndexBuilderConfig, IndexReader};

    fn doc(id: u32, words: &[&str]) -> mithril_crawler::Document {
        mithril_crawler::Document {
            id,
            url: format!("http://example.test/{id}"),
            title: vec![],
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    fn build_reader(docs: &[(u32, &[&str])]) -> (std::path::PathBuf, IndexReader) {
        let dir = std::env::temp_dir().join(format!("mithril-query-isr-test-{}-{}", std::process::id(), rand_suffix()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        for (id, words) in docs {
            builder.add_document(&doc(*id, words)).unwrap();
        }
        let paths = builder.finalize().unwrap();
        (dir, IndexReader::open(&paths.dir).unwrap())
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
    }

    fn drain(mut isr: Box<dyn Isr>) -> Vec<DocId> {
        let mut out = vec![];
        while isr.has_next() {
            out.push(isr.current_doc().unwrap());
            isr.next_doc();
        }
        out
    }

    #[test]
    fn term_isr_reports_document_frequency() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["cat"]), (2, &["dog"])]);
        let cat = TermIsr::new(reader.open_term("cat").unwrap().unwrap());
        assert_eq!(cat.document_frequency(), Some(2));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn and_isr_intersects_regardless_of_input_order() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["cat"]), (2, &["dog"]), (3, &["dog"]), (4, &["dog"])]);
        let cat = Box::new(TermIsr::new(reader.open_term("cat").unwrap().unwrap())) as Box<dyn Isr>;
        let dog = Box::new(TermIsr::new(reader.open_term("dog").unwrap().unwrap())) as Box<dyn Isr>;
        // "dog" has the higher document frequency here; AndIsr::new should
        // still converge correctly after reordering children rarest-first.
        let and = AndIsr::new(vec![dog, cat]);
        assert_eq!(drain(and), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn and_isr_intersects() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["cat"]), (2, &["dog"])]);
        let cat = Box::new(TermIsr::new(reader.open_term("cat").unwrap().unwrap())) as Box<dyn Isr>;
        let dog = Box::new(TermIsr::new(reader.open_term("dog").unwrap().unwrap())) as Box<dyn Isr>;
        let and = AndIsr::new(vec![cat, dog]);
        assert_eq!(drain(and), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn or_isr_unions() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["cat"]), (2, &["dog"])]);
        let cat = Box::new(TermIsr::new(reader.open_term("cat").unwrap().unwrap())) as Box<dyn Isr>;
        let dog = Box::new(TermIsr::new(reader.open_term("dog").unwrap().unwrap())) as Box<dyn Isr>;
        let or = OrIsr::new(vec![cat, dog]);
        assert_eq!(drain(or), vec![0, 1, 2]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn not_isr_complements() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["cat"]), (2, &["dog"])]);
        let dog = Box::new(TermIsr::new(reader.open_term("dog").unwrap().unwrap())) as Box<dyn Isr>;
        let not_dog = NotIsr::new(dog, 3);
        assert_eq!(drain(Box::new(not_dog)), vec![1]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_term_yields_empty_stream() {
        let (dir, reader) = build_reader(&[(0, &["cat"])]);
        assert!(reader.open_term("zzz").unwrap().is_none());
        let empty = TermIsr::empty();
        assert!(!empty.has_next());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn strict_phrase_requires_consecutive_positions() {
        let (dir, reader) = build_reader(&[(0, &["cat", "dog"]), (1, &["dog", "cat"])]);
        let positions = reader.positions().unwrap();
        let terms = vec!["cat".to_string(), "dog".to_string()];
        let readers = vec![reader.open_term("cat").unwrap().unwrap(), reader.open_term("dog").unwrap().unwrap()];
        let isr = PhraseIsr::new(readers, terms, positions, true, DEFAULT_MAX_SPAN);
        assert_eq!(drain(isr), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fuzzy_phrase_allows_a_gap_within_max_span() {
        let (dir, reader) = build_reader(&[(0, &["cat", "in", "the", "hat", "dog"])]);
        let positions = reader.positions().unwrap();
        let terms = vec!["cat".to_string(), "dog".to_string()];
        let readers = vec![reader.open_term("cat").unwrap().unwrap(), reader.open_term("dog").unwrap().unwrap()];
        let isr = PhraseIsr::new(readers, terms, positions, false, DEFAULT_MAX_SPAN);
        assert_eq!(drain(isr), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
