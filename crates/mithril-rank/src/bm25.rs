//! Okapi BM25 and its field-weighted BM25F variant. Mirrors
//! `examples/original_source/ranking/src/BM25.{h,cpp}` and `BM25F.{h,cpp}`,
//! with one deliberate departure from both: per-field term frequency is
//! read directly off the field-decorated posting lists `mithril-index`
//! writes (`@`/`$`/`%`-prefixed terms, see `mithril_index::field`), which
//! carry an exact per-field count, rather than `PositionIndex::field_flags`'s
//! presence-only bitmask (which exists for phrase/position lookups, see
//! `mithril_index::PositionIndex::field_flags`).

use mithril_crawler::DocId;
use mithril_index::{decorate, IndexReader, IndexStats, FIELD_DESC, FIELD_TITLE, FIELD_URL};

/// Okapi BM25 over the body field only, per `BM25.cpp`'s `ScoreTermForDoc`:
/// `idf = ln((N - n + 0.5) / (n + 0.5))`, saturating term frequency via
/// `k1`/`b` length normalization, one natural log applied to the final
/// per-term score (the spec.md §4.8 / DESIGN.md Open Question decision:
/// summing logged per-term contributions across a whole query, not
/// re-logging per term).
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    doc_count: u32,
    average_body_length: f64,
    k1: f64,
    b: f64,
}

impl Bm25 {
    pub const DEFAULT_K1: f64 = 1.2;
    pub const DEFAULT_B: f64 = 0.75;

    pub fn new(stats: IndexStats) -> Self {
        Bm25 { doc_count: stats.doc_count, average_body_length: stats.average_body_length(), k1: Self::DEFAULT_K1, b: Self::DEFAULT_B }
    }

    pub fn with_params(stats: IndexStats, k1: f64, b: f64) -> Self {
        Bm25 { doc_count: stats.doc_count, average_body_length: stats.average_body_length(), k1, b }
    }

    fn idf(&self, doc_freq: u32) -> f64 {
        let n = self.doc_count as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Scores one term's contribution to a single document. `term_freq` of
    /// `0` is treated as `1` (a term the caller already knows occurs in the
    /// document, per the original's defensive clamp). Returns `0.0` if the
    /// term never occurs in the corpus (`doc_freq == 0`).
    pub fn score_term(&self, doc_freq: u32, term_freq: u32, body_length: u32) -> f64 {
        if doc_freq == 0 {
            return 0.0;
        }
        let term_freq = if term_freq == 0 { 1 } else { term_freq };

        let idf = self.idf(doc_freq);
        let norm = if self.average_body_length > 0.0 { (1.0 - self.b) + self.b * (body_length as f64 / self.average_body_length) } else { 1.0 };
        let tf = if norm > 0.0 { term_freq as f64 / norm } else { 0.0 };

        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1)
    }

    /// Sums every query term's contribution for `doc_id` and applies a
    /// single closing `ln`, per spec.md §4.8. Terms absent from the
    /// document contribute `0.0`.
    pub fn score_query(&self, reader: &IndexReader, query_terms: &[&str], doc_id: DocId) -> f64 {
        let Some(record) = reader.documents().get(doc_id) else { return 0.0 };
        let mut total = 0.0;
        for term in query_terms {
            let Ok(Some(mut cursor)) = reader.open_term(term) else { continue };
            cursor.seek(doc_id);
            if cursor.current_doc_id() != Some(doc_id) {
                continue;
            }
            let term_freq = cursor.current_frequency().unwrap_or(0);
            total += self.score_term(cursor.document_count() as u32, term_freq, record.body_tokens);
        }
        if total > 0.0 {
            total.ln()
        } else {
            0.0
        }
    }
}

/// Per-field weight/normalization parameters, one set per field, mirroring
/// `BM25F`'s `weights_`/`b_` arrays (defaults: body 1.0, title 3.0, url 1.0,
/// desc 1.5 — titles count roughly 3x a body term, matching the original's
/// config defaults).
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct Bm25fParams {
    pub k1: f64,
    pub b_body: f64,
    pub b_title: f64,
    pub b_url: f64,
    pub b_desc: f64,
    pub weight_body: f64,
    pub weight_title: f64,
    pub weight_url: f64,
    pub weight_desc: f64,
}

impl Default for Bm25fParams {
    fn default() -> Self {
        Bm25fParams {
            k1: Bm25::DEFAULT_K1,
            b_body: 0.75,
            b_title: 0.75,
            b_url: 0.75,
            b_desc: 0.75,
            weight_body: 1.0,
            weight_title: 3.0,
            weight_url: 1.0,
            weight_desc: 1.5,
        }
    }
}

/// Field-weighted BM25, combining the undecorated (body) posting list with
/// the `@`/`$`/`%`-decorated title/url/description ones for the same term.
pub struct Bm25f {
    stats: IndexStats,
    params: Bm25fParams,
}

impl Bm25f {
    pub fn new(stats: IndexStats, params: Bm25fParams) -> Self {
        Bm25f { stats, params }
    }

    fn idf(&self, doc_freq: u32) -> f64 {
        let n = self.stats.doc_count as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Combined weighted term frequency for one query term across all four
    /// fields, then saturated and IDF-weighted once, per `BM25F::scoreTermForDoc`.
    fn score_term(&self, reader: &IndexReader, term: &str, doc_id: DocId, record: &mithril_index::DocRecord) -> f64 {
        let body_freq = field_frequency(reader, term, doc_id);
        let title_freq = field_frequency(reader, &decorate(FIELD_TITLE, term), doc_id);
        let url_freq = field_frequency(reader, &decorate(FIELD_URL, term), doc_id);
        let desc_freq = field_frequency(reader, &decorate(FIELD_DESC, term), doc_id);

        if body_freq == 0 && title_freq == 0 && url_freq == 0 && desc_freq == 0 {
            return 0.0;
        }

        let doc_freq = match reader.open_term(term) {
            Ok(Some(cursor)) => cursor.document_count() as u32,
            _ => return 0.0,
        };
        let idf = self.idf(doc_freq);

        let mut tf_combined = 0.0;
        tf_combined += self.field_contribution(body_freq, record.body_tokens, self.stats.average_body_length(), self.params.b_body, self.params.weight_body);
        tf_combined += self.field_contribution(title_freq, record.title_tokens, self.stats.average_title_length(), self.params.b_title, self.params.weight_title);
        tf_combined += self.field_contribution(url_freq, record.url_tokens, self.stats.average_url_length(), self.params.b_url, self.params.weight_url);
        tf_combined += self.field_contribution(desc_freq, record.desc_tokens, self.stats.average_desc_length(), self.params.b_desc, self.params.weight_desc);

        idf * (tf_combined * (self.params.k1 + 1.0)) / (tf_combined + self.params.k1)
    }

    fn field_contribution(&self, freq: u32, field_length: u32, average_length: f64, b: f64, weight: f64) -> f64 {
        if freq == 0 {
            return 0.0;
        }
        let norm = if average_length > 0.0 { (1.0 - b) + b * (field_length as f64 / average_length) } else { 1.0 };
        if norm > 0.0 {
            weight * freq as f64 / norm
        } else {
            0.0
        }
    }

    pub fn score_query(&self, reader: &IndexReader, query_terms: &[&str], doc_id: DocId) -> f64 {
        let Some(record) = reader.documents().get(doc_id) else { return 0.0 };
        query_terms.iter().map(|term| self.score_term(reader, term, doc_id, &record)).sum()
    }
}

fn field_frequency(reader: &IndexReader, key: &str, doc_id: DocId) -> u32 {
    let Ok(Some(mut cursor)) = reader.open_term(key) else { return 0 };
    cursor.seek(doc_id);
    if cursor.current_doc_id() != Some(doc_id) {
        return 0;
    }
    cursor.current_frequency().unwrap_or(0)
}
