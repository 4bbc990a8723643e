//! Document scoring: static URL-structure rank, BM25/BM25F, PageRank
//! reading, and the weighted dynamic ranker that combines all three with
//! query-time text features (spec.md §4.8).

mod bm25;
mod dynamic_rank;
mod error;
mod pagerank;
pub mod static_rank;

pub use bm25::{Bm25, Bm25f, Bm25fParams};
pub use dynamic_rank::{compute_features, score as dynamic_score, RankerFeatures, RankerWeights};
pub use error::RankError;
pub use pagerank::PageRankReader;

use mithril_crawler::DocId;
use mithril_index::IndexReader;

/// Ties BM25(F), static rank, PageRank and the dynamic weighted combiner
/// together into the single entry point `mithril-coordinator`'s per-shard
/// worker calls once per matching document, per spec.md §4.9's
/// "computes BM25 + dynamic rank" step.
pub struct Ranker {
    bm25: Bm25,
    weights: RankerWeights,
    pagerank: Option<PageRankReader>,
}

impl Ranker {
    pub fn new(reader: &IndexReader, weights: RankerWeights, pagerank: Option<PageRankReader>) -> Self {
        Ranker { bm25: Bm25::new(reader.stats()), weights, pagerank }
    }

    pub fn with_bm25_params(reader: &IndexReader, k1: f64, b: f64, weights: RankerWeights, pagerank: Option<PageRankReader>) -> Self {
        Ranker { bm25: Bm25::with_params(reader.stats(), k1, b), weights, pagerank }
    }

    /// Final dynamic-rank integer score in `[0, 10000]` for `doc_id`
    /// against `query_terms`, or `None` if the document id is unknown to
    /// this index generation.
    pub fn score(&self, reader: &IndexReader, query_terms: &[String], doc_id: DocId) -> Option<u32> {
        let record = reader.documents().get(doc_id)?;
        let term_refs: Vec<&str> = query_terms.iter().map(|s| s.as_str()).collect();
        let bm25 = self.bm25.score_query(reader, &term_refs, doc_id) as f32;
        let static_rank = static_rank::score(&record.url);
        let pagerank = self.pagerank.as_ref().map(|p| p.get(doc_id) as f32).unwrap_or(record.pagerank_score);

        let features = compute_features(query_terms, &record, reader.positions(), bm25, static_rank, pagerank);
        Some(dynamic_score(&features, &self.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_crawler::Document;
    use mithril_index::{IndexBuilder, IndexBuilderConfig};

    #[test]
    fn ranker_scores_matching_document_higher_than_non_matching() {
        let docs = vec![
            Document { id: 0, url: "https://example.org/fox".to_string(), title: vec!["fox".to_string()], description: vec![], words: vec!["quick".to_string(), "fox".to_string()], forward_links: vec![] },
            Document { id: 1, url: "https://example.org/other".to_string(), title: vec!["other".to_string()], description: vec![], words: vec!["unrelated".to_string()], forward_links: vec![] },
        ];
        let dir = std::env::temp_dir().join(format!("mithril-rank-lib-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        for d in &docs {
            builder.add_document(d).unwrap();
        }
        let paths = builder.finalize().unwrap();
        let reader = IndexReader::open(&paths.dir).unwrap();

        let ranker = Ranker::new(&reader, RankerWeights::default(), None);
        let query = vec!["fox".to_string()];
        let s0 = ranker.score(&reader, &query, 0).unwrap();
        let s1 = ranker.score(&reader, &query, 1).unwrap();
        assert!(s0 > s1, "s0={s0} s1={s1}");
        assert!(s0 <= 10000);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_doc_id_returns_none() {
        let dir = std::env::temp_dir().join(format!("mithril-rank-lib-unknown-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        builder.add_document(&Document { id: 0, url: "https://example.org/".to_string(), title: vec![], description: vec![], words: vec!["a".to_string()], forward_links: vec![] }).unwrap();
        let paths = builder.finalize().unwrap();
        let reader = IndexReader::open(&paths.dir).unwrap();

        let ranker = Ranker::new(&reader, RankerWeights::default(), None);
        assert!(ranker.score(&reader, &["a".to_string()], 99).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
