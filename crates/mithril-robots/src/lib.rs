//! `robots.txt` parsing (segment-trie matcher) and per-host rule caching
//! with TTL expiry and bounded in-flight fetch tracking.

mod cache;
mod rules;
mod trie;

pub use cache::{RobotRulesCache, CACHE_TTL};
pub use rules::{RobotRules, MAX_ROBOTS_TXT_SIZE};
