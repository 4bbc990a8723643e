//! Per-field term decoration, per spec.md §4.6's "Field-qualified TermISR":
//! the undecorated term indexes ALL fields, while prefixed variants index
//! one field specifically, so a query like `title:fox` can resolve to the
//! `%fox` posting list instead of the general `fox` one. `TEXT`/`ANCHOR`
//! field qualifiers have no dedicated prefix here — body words have no
//! anchor-text equivalent in this crawler's `Document` model, and `TEXT`
//! falls back to the undecorated (ALL) postings, since body is already the
//! bulk of what the undecorated index covers.

pub const FIELD_URL: char = '@';
pub const FIELD_DESC: char = '$';
pub const FIELD_TITLE: char = '%';

/// Bitmask values for the per-(term, doc) `field_flags` byte the position
/// index stores alongside each doc's positions (spec.md §3/§4.5). The
/// retrieved original corpus references `field_flags` throughout
/// `ranking/src/BM25F.cpp` and `index/src/PositionIndex.cpp` but never
/// defines concrete bit values for `FieldType`, so this assignment is
/// this crate's own.
pub const FIELD_FLAG_BODY: u8 = 0x01;
pub const FIELD_FLAG_TITLE: u8 = 0x02;
pub const FIELD_FLAG_URL: u8 = 0x04;
pub const FIELD_FLAG_DESC: u8 = 0x08;

/// Tokenizes a URL the same way [`crate::document_map`]'s `url_token_count`
/// does, but returning the tokens themselves so they can be indexed.
pub fn url_tokens(url: &str) -> Vec<String> {
    url.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).map(|s| s.to_ascii_lowercase()).collect()
}

pub fn decorate(prefix: char, term: &str) -> String {
    format!("{prefix}{term}")
}
