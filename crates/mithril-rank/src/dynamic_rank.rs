//! Weighted dynamic ranker combining BM25, static rank, pagerank and a set
//! of query-time text features, per spec.md §4.8 and the newer
//! `RankerFeatures`/`RankerWeights` revision DESIGN.md selects out of
//! `examples/original_source/ranking/src/DynamicRanker.h`. The boolean
//! presence flags follow `Ranker.cpp`'s `GetFinalScore` (substring search
//! over the joined field text); coverage/density/order/earliest-position
//! features have no surviving reference implementation in the original
//! (`OrderedMatchScore` is declared, never defined) and are built directly
//! from spec.md §4.8's description of each feature name.

use mithril_index::{url_tokens, DocRecord, PositionIndex};

/// Mirrors `DynamicRanker.h`'s `RankerFeatures` exactly (newer revision:
/// `order_sensitive_title`, `density_percent_*`, no `short_spans`/
/// `query_in_order`/`body_term_freq`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RankerFeatures {
    pub query_in_url: bool,
    pub query_in_title: bool,
    pub query_in_description: bool,
    pub query_in_body: bool,

    pub coverage_percent_query_url: f32,
    pub coverage_percent_query_title: f32,
    pub coverage_percent_query_description: f32,

    pub order_sensitive_title: f32,

    pub density_percent_query_url: f32,
    pub density_percent_query_title: f32,
    pub density_percent_query_description: f32,

    pub earliest_pos_title: f32,
    pub earliest_pos_body: f32,

    pub bm25: f32,
    pub static_rank: f32,
    pub pagerank: f32,
}

/// Mirrors `DynamicRanker.h`'s `RankerWeights`. Loaded from a TOML config
/// file the way `Bm25fParams` is (the original reads each field from a
/// `core::Config` backed by `dynamicranker.conf`, a file not present in
/// the corpus — defaults here are this crate's own tuning, documented in
/// DESIGN.md).
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct RankerWeights {
    pub query_in_title: f32,
    pub query_in_url: f32,
    pub query_in_description: f32,
    pub query_in_body: f32,

    pub coverage_percent_query_url: f32,
    pub coverage_percent_query_title: f32,
    pub coverage_percent_query_description: f32,

    pub order_sensitive_title: f32,

    pub density_percent_query_url: f32,
    pub density_percent_query_title: f32,
    pub density_percent_query_description: f32,

    pub earliest_pos_title: f32,
    pub earliest_pos_body: f32,

    pub bm25: f32,
    pub static_rank: f32,
    pub pagerank: f32,
}

impl Default for RankerWeights {
    fn default() -> Self {
        RankerWeights {
            query_in_title: 500.0,
            query_in_url: 300.0,
            query_in_description: 150.0,
            query_in_body: 200.0,

            coverage_percent_query_url: 200.0,
            coverage_percent_query_title: 400.0,
            coverage_percent_query_description: 150.0,

            order_sensitive_title: 300.0,

            density_percent_query_url: 100.0,
            density_percent_query_title: 200.0,
            density_percent_query_description: 100.0,

            earliest_pos_title: 250.0,
            earliest_pos_body: 150.0,

            bm25: 2000.0,
            static_rank: 600.0,
            pagerank: 600.0,
        }
    }
}

impl RankerWeights {
    fn total(&self) -> f32 {
        self.query_in_title
            + self.query_in_url
            + self.query_in_description
            + self.query_in_body
            + self.coverage_percent_query_url
            + self.coverage_percent_query_title
            + self.coverage_percent_query_description
            + self.order_sensitive_title
            + self.density_percent_query_url
            + self.density_percent_query_title
            + self.density_percent_query_description
            + self.earliest_pos_title
            + self.earliest_pos_body
            + self.bm25
            + self.static_rank
            + self.pagerank
    }
}

/// Dividing line between title/description/body positions in the combined
/// token stream `mithril_index::PositionDictionary::add_document` builds
/// (title tokens first, then description, then body — see that module's
/// doc comment).
struct FieldSpan {
    title_end: u32,
    body_start: u32,
}

fn field_span(record: &DocRecord) -> FieldSpan {
    let title_end = record.title_tokens;
    let body_start = record.title_tokens + record.desc_tokens;
    FieldSpan { title_end, body_start }
}

/// Coverage/density/earliest-position features computed by segmenting one
/// term's positions (over the title+description+body concatenated
/// stream) by field, per [`field_span`].
struct FieldHits {
    title: Vec<u32>,
    description: Vec<u32>,
    body: Vec<u32>,
}

fn collect_hits(positions: &PositionIndex, terms: &[String], doc_id: mithril_crawler::DocId, span: &FieldSpan) -> FieldHits {
    let mut hits = FieldHits { title: Vec::new(), description: Vec::new(), body: Vec::new() };
    for term in terms {
        let Some(positions) = positions.get_positions(term, doc_id) else { continue };
        for p in positions {
            if p < span.title_end {
                hits.title.push(p);
            } else if p < span.body_start {
                hits.description.push(p);
            } else {
                hits.body.push(p - span.body_start);
            }
        }
    }
    hits
}

/// `GetUrlDynamicRank`'s computation of `RankerFeatures` for one
/// (query, document) pair, given the document's precomputed `bm25`,
/// `static_rank` and `pagerank` scores. `positions` is `None` for index
/// generations built without position data (spec.md §3 invariant 5): in
/// that case every text feature that needs positions (coverage, density,
/// order, earliest-position) degrades to its zero value rather than
/// erroring, matching spec.md §4.11's "missing data yields an empty
/// result, not an error" policy.
pub fn compute_features(query_terms: &[String], record: &DocRecord, positions: Option<&PositionIndex>, bm25: f32, static_rank: f32, pagerank: f32) -> RankerFeatures {
    let url_tokens = url_tokens(&record.url);
    let url_lower = record.url.to_ascii_lowercase();
    let title_lower = record.title.to_ascii_lowercase();
    let title_tokens: Vec<&str> = title_lower.split_whitespace().collect();

    let query_lower: Vec<String> = query_terms.iter().map(|t| t.to_ascii_lowercase()).collect();

    let query_in_url = query_lower.iter().any(|t| url_lower.contains(t.as_str()));
    let query_in_title = query_lower.iter().any(|t| title_lower.contains(t.as_str()));

    let url_matches = query_lower.iter().filter(|t| url_tokens.iter().any(|u| u == *t)).count();
    let coverage_percent_query_url = ratio(url_matches, query_lower.len());
    let density_percent_query_url = ratio(url_matches, url_tokens.len().max(1));

    let title_matches = query_lower.iter().filter(|t| title_tokens.contains(&t.as_str())).count();
    let coverage_percent_query_title = ratio(title_matches, query_lower.len());
    let density_percent_query_title = ratio(title_matches, title_tokens.len().max(1));

    let order_sensitive_title = ordered_match_score(&query_lower, &title_tokens);

    let (mut query_in_description, mut query_in_body) = (false, false);
    let mut coverage_percent_query_description = 0.0_f32;
    let mut density_percent_query_description = 0.0_f32;
    let mut earliest_pos_title = 0.0_f32;
    let mut earliest_pos_body = 0.0_f32;

    if let Some(positions) = positions {
        let span = field_span(record);
        let hits = collect_hits(positions, query_terms, record.id, &span);

        query_in_body = !hits.body.is_empty();
        query_in_description = !hits.description.is_empty();

        let desc_term_matches = query_terms.iter().filter(|t| positions.get_positions(t, record.id).map(|p| p.iter().any(|&pos| pos >= span.title_end && pos < span.body_start)).unwrap_or(false)).count();
        coverage_percent_query_description = ratio(desc_term_matches, query_lower.len());
        density_percent_query_description = ratio(hits.description.len(), record.desc_tokens.max(1) as usize);

        if let Some(&min_title) = hits.title.iter().min() {
            earliest_pos_title = normalized_position(min_title, record.title_tokens);
        }
        if let Some(&min_body) = hits.body.iter().min() {
            earliest_pos_body = normalized_position(min_body, record.body_tokens);
        }
    }

    RankerFeatures {
        query_in_url,
        query_in_title,
        query_in_description,
        query_in_body,
        coverage_percent_query_url,
        coverage_percent_query_title,
        coverage_percent_query_description,
        order_sensitive_title,
        density_percent_query_url,
        density_percent_query_title,
        density_percent_query_description,
        earliest_pos_title,
        earliest_pos_body,
        bm25,
        static_rank,
        pagerank,
    }
}

fn ratio(matches: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        matches as f32 / total as f32
    }
}

/// Position `pos` (0-based within a field of `field_len` tokens)
/// normalized to `[0, 1]`, `0` meaning "first token". Matches
/// `Ranker.cpp`'s `(1.0 - earliest_pos_*)` early-occurrence bonus
/// convention used by [`GetUrlDynamicRank`]-equivalent scoring below.
fn normalized_position(pos: u32, field_len: u32) -> f32 {
    if field_len <= 1 {
        0.0
    } else {
        pos as f32 / (field_len - 1) as f32
    }
}

/// Fraction of `query_terms` that appear in `title_tokens` in
/// non-decreasing order (a greedy subsequence match), implementing
/// `DynamicRanker.h`'s declared-but-undefined `OrderedMatchScore`.
fn ordered_match_score(query_terms: &[String], title_tokens: &[&str]) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut cursor = 0usize;
    let mut matched = 0usize;
    for term in query_terms {
        if let Some(offset) = title_tokens[cursor..].iter().position(|t| t == term) {
            cursor += offset + 1;
            matched += 1;
        }
    }
    matched as f32 / query_terms.len() as f32
}

/// `GetUrlDynamicRank`: the weighted linear combination of `features`,
/// normalized to an integer in `[0, 10000]` per spec.md §4.8.
pub fn score(features: &RankerFeatures, weights: &RankerWeights) -> u32 {
    let total_weight = weights.total();
    if total_weight <= 0.0 {
        return 0;
    }

    let mut score = 0.0_f32;
    score += weights.bm25 * features.bm25;
    score += weights.query_in_title * features.query_in_title as u8 as f32;
    score += weights.query_in_url * features.query_in_url as u8 as f32;
    score += weights.query_in_description * features.query_in_description as u8 as f32;
    score += weights.query_in_body * features.query_in_body as u8 as f32;

    score += weights.coverage_percent_query_url * features.coverage_percent_query_url;
    score += weights.coverage_percent_query_title * features.coverage_percent_query_title;
    score += weights.coverage_percent_query_description * features.coverage_percent_query_description;

    score += weights.order_sensitive_title * features.order_sensitive_title;

    score += weights.density_percent_query_url * features.density_percent_query_url;
    score += weights.density_percent_query_title * features.density_percent_query_title;
    score += weights.density_percent_query_description * features.density_percent_query_description;

    score += weights.earliest_pos_title * (1.0 - features.earliest_pos_title);
    score += weights.earliest_pos_body * (1.0 - features.earliest_pos_body);

    score += weights.static_rank * features.static_rank;
    score += weights.pagerank * features.pagerank;

    let normalized = (score / total_weight).clamp(0.0, 1.0);
    (normalized * 10000.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_crawler::Document;
    use mithril_index::{IndexBuilder, IndexBuilderConfig};

    fn doc(id: u32, url: &str, title: &[&str], words: &[&str]) -> Document {
        Document { id, url: url.to_string(), title: title.iter().map(|s| s.to_string()).collect(), description: vec![], words: words.iter().map(|s| s.to_string()).collect(), forward_links: vec![] }
    }

    #[test]
    fn title_match_outranks_no_match() {
        let docs = vec![doc(0, "http://a.test/", &["fox", "hunt"], &["other"]), doc(1, "http://b.test/", &["other"], &["words"])];
        let dir = std::env::temp_dir().join(format!("mithril-rank-dynamic-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        for d in &docs {
            builder.add_document(d).unwrap();
        }
        let paths = builder.finalize().unwrap();
        let reader = mithril_index::IndexReader::open(&paths.dir).unwrap();

        let query = vec!["fox".to_string()];
        let weights = RankerWeights::default();

        let rec0 = reader.documents().get(0).unwrap();
        let rec1 = reader.documents().get(1).unwrap();

        let f0 = compute_features(&query, &rec0, reader.positions(), 0.0, 0.0, 0.0);
        let f1 = compute_features(&query, &rec1, reader.positions(), 0.0, 0.0, 0.0);

        assert!(f0.query_in_title);
        assert!(!f1.query_in_title);
        assert!(score(&f0, &weights) > score(&f1, &weights));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ordered_match_rewards_in_order_terms() {
        let title = vec!["quick", "brown", "fox"];
        let in_order = ordered_match_score(&["quick".to_string(), "fox".to_string()], &title);
        let out_of_order_title = vec!["fox", "brown", "quick"];
        let out_of_order = ordered_match_score(&["quick".to_string(), "fox".to_string()], &out_of_order_title);
        assert_eq!(in_order, 1.0);
        assert!(out_of_order < in_order);
    }

    #[test]
    fn empty_weights_total_yields_zero_score() {
        let weights = RankerWeights {
            query_in_title: 0.0,
            query_in_url: 0.0,
            query_in_description: 0.0,
            query_in_body: 0.0,
            coverage_percent_query_url: 0.0,
            coverage_percent_query_title: 0.0,
            coverage_percent_query_description: 0.0,
            order_sensitive_title: 0.0,
            density_percent_query_url: 0.0,
            density_percent_query_title: 0.0,
            density_percent_query_description: 0.0,
            earliest_pos_title: 0.0,
            earliest_pos_body: 0.0,
            bm25: 0.0,
            static_rank: 0.0,
            pagerank: 0.0,
        };
        let features = RankerFeatures::default();
        assert_eq!(score(&features, &weights), 0);
    }
}
