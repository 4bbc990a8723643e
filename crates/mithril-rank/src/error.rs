#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("I/O error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("corrupt pagerank data: {what}")]
    Corrupt { what: String },
    #[error("failed to parse ranker weights: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Index(#[from] mithril_index::IndexError),
}
