//! Compiles a parsed [`QueryNode`] tree into a live [`Isr`] tree over a
//! concrete [`IndexReader`] generation, resolving field qualifiers to the
//! decorated posting lists `mithril-index` writes (spec.md §4.6) and
//! reporting missing terms as empty streams rather than errors (spec.md
//! §4.11).

use mithril_crawler::DocId;
use mithril_index::{decorate, IndexReader, FIELD_DESC, FIELD_TITLE, FIELD_URL};

use crate::isr::{AndIsr, EmptyIsr, Isr, NotIsr, OrIsr, PhraseIsr, DEFAULT_MAX_SPAN};
use crate::parser::{Field, QueryNode};

/// Resolves a parsed term's text to the posting-list key it should look up,
/// per field.rs's decoration scheme. `Text` and `Anchor` have no dedicated
/// prefix and fall through to the undecorated (`All`) postings.
fn posting_key(field: Field, text: &str) -> String {
    match field {
        Field::Title => decorate(FIELD_TITLE, text),
        Field::Url => decorate(FIELD_URL, text),
        Field::Desc => decorate(FIELD_DESC, text),
        Field::All | Field::Text | Field::Anchor => text.to_string(),
    }
}

fn open_term<'a>(reader: &'a IndexReader, field: Field, text: &str) -> Box<dyn Isr + 'a> {
    let key = posting_key(field, text);
    match reader.open_term(&key) {
        Ok(Some(term_reader)) => Box::new(crate::isr::TermIsr::new(term_reader)),
        Ok(None) => Box::new(EmptyIsr),
        Err(err) => {
            tracing::warn!(term = %key, error = %err, "failed to open term posting list");
            Box::new(EmptyIsr)
        }
    }
}

/// Compiles `node` into an [`Isr`] over `reader`. The returned stream's
/// lifetime is tied to `reader`, which must outlive any search using it.
pub fn compile<'a>(node: &QueryNode, reader: &'a IndexReader) -> Box<dyn Isr + 'a> {
    match node {
        QueryNode::Term { field, text } => open_term(reader, *field, text),

        QueryNode::And(children) => {
            let compiled = children.iter().map(|c| compile(c, reader)).collect();
            AndIsr::new(compiled)
        }

        QueryNode::Or(children) => {
            let compiled = children.iter().map(|c| compile(c, reader)).collect();
            OrIsr::new(compiled)
        }

        QueryNode::Not(inner) => {
            let child = compile(inner, reader);
            Box::new(NotIsr::new(child, reader.document_count() as DocId))
        }

        QueryNode::Phrase { field, terms } => compile_phrase(reader, *field, terms, false),
        QueryNode::Quote { field, terms } => compile_phrase(reader, *field, terms, true),
    }
}

/// Compiles a phrase/quote node. The AND gate is built over the
/// field-decorated posting lists (so `title:'a b'` only considers
/// documents where both terms appear in the title); the span check itself
/// runs against the undecorated position index, since
/// [`mithril_index::position_index::PositionDictionary`] records positions
/// over the raw title+description+body token stream rather than per-field
/// streams.
fn compile_phrase<'a>(reader: &'a IndexReader, field: Field, terms: &[String], strict: bool) -> Box<dyn Isr + 'a> {
    if terms.is_empty() {
        return Box::new(EmptyIsr);
    }

    let Some(positions) = reader.positions() else {
        tracing::warn!("phrase query requested but this index generation has no position data; falling back to AND semantics");
        let compiled = terms.iter().map(|t| open_term(reader, field, t)).collect();
        return AndIsr::new(compiled);
    };

    let mut term_readers = Vec::with_capacity(terms.len());
    for term in terms {
        let key = posting_key(field, term);
        match reader.open_term(&key) {
            Ok(Some(tr)) => term_readers.push(tr),
            Ok(None) => return Box::new(EmptyIsr),
            Err(err) => {
                tracing::warn!(term = %key, error = %err, "failed to open term posting list for phrase");
                return Box::new(EmptyIsr);
            }
        }
    }

    PhraseIsr::new(term_readers, terms.to_vec(), positions, strict, DEFAULT_MAX_SPAN)
}

/// Flattens every leaf term out of a parsed query tree, in left-to-right
/// order, for callers that need the plain term list rather than the
/// compiled ISR tree — `mithril-rank`'s scorer takes query terms this way
/// (spec.md §4.8's "boolean presence of the query" / "coverage" features
/// are defined over the term set, not the boolean tree shape).
pub fn collect_terms(node: &QueryNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_terms_into(node, &mut out);
    out
}

fn collect_terms_into(node: &QueryNode, out: &mut Vec<String>) {
    match node {
        QueryNode::Term { text, .. } => out.push(text.clone()),
        QueryNode::Phrase { terms, .. } | QueryNode::Quote { terms, .. } => out.extend(terms.iter().cloned()),
        QueryNode::And(children) | QueryNode::Or(children) => {
            for child in children {
                collect_terms_into(child, out);
            }
        }
        QueryNode::Not(inner) => collect_terms_into(inner, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_index::{IndexBuilder, IndexBuilderConfig};

    fn doc(id: u32, title: &[&str], words: &[&str]) -> mithril_crawler::Document {
        mithril_crawler::Document {
            id,
            url: format!("http://example.test/{id}"),
            title: title.iter().map(|s| s.to_string()).collect(),
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    fn build_reader(name: &str, docs: &[(u32, &[&str], &[&str])]) -> (std::path::PathBuf, IndexReader) {
        let dir = std::env::temp_dir().join(format!("mithril-query-plan-test-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        for (id, title, words) in docs {
            builder.add_document(&doc(*id, title, words)).unwrap();
        }
        let paths = builder.finalize().unwrap();
        (dir, IndexReader::open(&paths.dir).unwrap())
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
    fn compiles_and_query() {
        let (dir, reader) = build_reader("and", &[(0, &[], &["cat", "dog"]), (1, &[], &["cat"])]);
        let query = crate::parser::parse_query("cat dog").unwrap();
        assert_eq!(drain(compile(&query, &reader)), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn compiles_field_qualified_query_over_title_postings() {
        let (dir, reader) = build_reader("field", &[(0, &["fox"], &["cat"]), (1, &[], &["fox"])]);
        let query = crate::parser::parse_query("title:fox").unwrap();
        assert_eq!(drain(compile(&query, &reader)), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn compiles_not_query_as_complement() {
        let (dir, reader) = build_reader("not", &[(0, &[], &["cat"]), (1, &[], &["dog"])]);
        let query = crate::parser::parse_query("NOT cat").unwrap();
        assert_eq!(drain(compile(&query, &reader)), vec![1]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_term_compiles_to_empty_stream() {
        let (dir, reader) = build_reader("missing", &[(0, &[], &["cat"])]);
        let query = crate::parser::parse_query("zzz").unwrap();
        assert_eq!(drain(compile(&query, &reader)), Vec::<DocId>::new());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn compiles_strict_phrase_query() {
        let (dir, reader) = build_reader("phrase", &[(0, &[], &["quick", "fox"]), (1, &[], &["fox", "quick"])]);
        let query = crate::parser::parse_query("\"quick fox\"").unwrap();
        assert_eq!(drain(compile(&query, &reader)), vec![0]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
