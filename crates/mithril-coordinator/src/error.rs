#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("I/O error on {what}: {source}")]
    Io { what: String, #[source] source: std::io::Error },
    #[error("shard config {path} is invalid: {reason}")]
    InvalidConfig { path: String, reason: String },
    #[error("malformed shard RPC frame: {0}")]
    Protocol(String),
    #[error(transparent)]
    Index(#[from] mithril_index::IndexError),
}
