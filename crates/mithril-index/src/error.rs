#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("corrupt index data: {what}")]
    Corrupt { what: String },
    #[error("failed to build term dictionary: {0}")]
    Fst(#[from] fst::Error),
}
