use serde::{Deserialize, Serialize};

/// A dense document identifier, assigned once by the crawler and stable
/// across every downstream artifact (spec.md §3, invariant 1).
pub type DocId = u32;

/// The record the crawler produces and the indexer consumes, per spec.md
/// §3's `Document` data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: String,
    pub title: Vec<String>,
    pub description: Vec<String>,
    pub words: Vec<String>,
    pub forward_links: Vec<String>,
}
