mod block;
mod builder;
mod codec;
mod dictionary;
mod document_map;
mod error;
mod field;
mod index_stats;
mod merge;
mod normalize;
mod position_index;
mod posting;
mod reader;
mod term_dictionary;
mod term_reader;

pub use builder::{IndexBuilder, IndexBuilderConfig, DEFAULT_BLOCK_SIZE_BYTES};
pub use codec::{decode as vbyte_decode, encode as vbyte_encode};
pub use document_map::{DocRecord, DocumentMapReader};
pub use error::IndexError;
pub use field::{decorate, url_tokens, FIELD_DESC, FIELD_FLAG_BODY, FIELD_FLAG_DESC, FIELD_FLAG_TITLE, FIELD_FLAG_URL, FIELD_TITLE, FIELD_URL};
pub use index_stats::IndexStats;
pub use normalize::{normalize_token, normalize_tokens};
pub use position_index::PositionIndex;
pub use posting::{Posting, SyncPoint, SYNC_INTERVAL};
pub use reader::{IndexPaths, IndexReader};
pub use term_dictionary::TermDictionary;
pub use term_reader::TermReader;
