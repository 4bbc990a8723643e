/// A query grammar error, carrying the 1-based line/column it was raised at
/// (per spec.md §4.7: "Parser errors are specific"). Never surfaces a raw
/// `nom` error to callers — [`crate::parser::parse_query`] translates the
/// combinator failure into one of these at the outermost call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query parse error at line {line}, column {column}: {message}")]
pub struct QueryParseError {
    pub line: u32,
    pub column: usize,
    pub message: String,
}
