//! Boolean query grammar and the Index Stream Reader (ISR) family that
//! answers a parsed query against a `mithril-index` generation.

mod error;
mod isr;
mod parser;
mod plan;

pub use error::QueryParseError;
pub use isr::{AndIsr, EmptyIsr, Isr, NotIsr, OrIsr, PhraseIsr, TermIsr, DEFAULT_MAX_SPAN};
pub use parser::{parse_query, Field, QueryNode};
pub use plan::{collect_terms, compile};
