#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("failed to open document store at {path}: {source}")]
    Store { path: String, #[source] source: std::io::Error },
    #[error("failed to encode document {id}: {source}")]
    Encode { id: crate::document::DocId, #[source] source: bincode::Error },
    #[error("failed to decode document record: {source}")]
    Decode { #[source] source: bincode::Error },
    #[error(transparent)]
    Http(#[from] mithril_http::Error),
}
