//! Token rejection applied at index-build time, mirroring
//! `examples/original_source/index/src/TextPreprocessor.h`'s
//! `TokenNormalizer::shouldReject()`/`isValidToken()`. The crawler's own
//! tokenizer (`mithril_crawler::html::tokenize`) already lowercases and
//! splits on non-alphanumeric characters, so the original's punctuation-
//! bearing reject patterns (`//`, `|`, `=`, `www.`, `.com`) can never
//! survive in a token reaching here; the scheme/host fragments they were
//! meant to catch still arrive as bare tokens (`http`, `https`, `www`), so
//! those are rejected by name instead.

const MAX_TOKEN_LEN: usize = 64;
const URL_FRAGMENTS: [&str; 3] = ["http", "https", "www"];

/// Returns `None` if `token` should be dropped before it reaches postings
/// or position lists, `Some(token)` otherwise. Tokens are expected already
/// lowercased and alphanumeric-only, per the crawler's tokenizer.
pub fn normalize_token(token: &str) -> Option<String> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return None;
    }
    if token.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if URL_FRAGMENTS.contains(&token) {
        return None;
    }
    if !token.bytes().any(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some(token.to_string())
}

/// Filters a token list in place order, dropping rejected tokens.
pub fn normalize_tokens(tokens: &[String]) -> Vec<String> {
    tokens.iter().filter_map(|t| normalize_token(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tokens_with_digits() {
        assert_eq!(normalize_token("covid19"), None);
        assert_eq!(normalize_token("2024"), None);
    }

    #[test]
    fn rejects_url_fragments() {
        assert_eq!(normalize_token("www"), None);
        assert_eq!(normalize_token("https"), None);
    }

    #[test]
    fn rejects_overlong_tokens() {
        assert_eq!(normalize_token(&"a".repeat(65)), None);
        assert_eq!(normalize_token(&"a".repeat(64)), Some("a".repeat(64)));
    }

    #[test]
    fn keeps_ordinary_words() {
        assert_eq!(normalize_token("fox"), Some("fox".to_string()));
    }

    #[test]
    fn normalize_tokens_preserves_order_of_survivors() {
        let input: Vec<String> = ["the", "www", "quick123", "fox"].iter().map(|s| s.to_string()).collect();
        assert_eq!(normalize_tokens(&input), vec!["the".to_string(), "fox".to_string()]);
    }
}
