use mithril_url::Url;

const NON_CRAWLABLE_PREFIXES: &[&str] =
    &["javascript:", "data:", "mailto:", "tel:", "sms:", "ftp:", "#", "about:", "file:", "ws:", "wss:"];

/// Splits `path` into its `/`-separated segments, dropping a leading
/// empty segment produced by a leading slash.
fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    path.split('/').collect()
}

/// Resolves `.`/`..` dot-segments in a path, the way a browser would
/// before issuing the request.
fn resolve_path(path: &str) -> String {
    let mut resolved: Vec<&str> = Vec::new();
    for segment in split_path(path) {
        if segment == ".." {
            if !resolved.is_empty() {
                resolved.pop();
            }
        } else if segment != "." {
            resolved.push(segment);
        }
    }
    let mut out = String::new();
    for segment in resolved {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Resolves an `href` found on the page at `current_url` (with optional
/// `<base>` override) into an absolute, crawlable URL string, or `None`
/// if `href` uses a non-HTTP(S) scheme or is otherwise not crawlable.
/// Mirrors the original crawler's `MakeAbsoluteLink`.
pub fn make_absolute_link(current_url: &Url, base: Option<&str>, href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    let lower_check_len = href.len().min(16);
    let href_prefix_lower = href[..lower_check_len].to_ascii_lowercase();
    if NON_CRAWLABLE_PREFIXES.iter().any(|p| href_prefix_lower.starts_with(p)) {
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("{}://{}", current_url.scheme, rest));
    }

    let port_part = if current_url.port.is_empty() { String::new() } else { format!(":{}", current_url.port) };

    if let Some(rest) = href.strip_prefix('/') {
        return Some(format!("{}://{}{}{}", current_url.scheme, current_url.host, port_part, resolve_path(&format!("/{rest}"))));
    }

    let mut base_path = match base {
        Some(b) if !b.is_empty() => {
            if let Ok(parsed) = mithril_url::parse_url(b) {
                parsed.path
            } else if let Some(rest) = b.strip_prefix('/') {
                format!("/{rest}")
            } else {
                format!("/{b}")
            }
        }
        _ => current_url.path.clone(),
    };

    if let Some(last_slash) = base_path.rfind('/') {
        base_path.truncate(last_slash + 1);
    }

    let resolved = resolve_path(&format!("{base_path}{href}"));
    Some(format!("{}://{}{}{}", current_url.scheme, current_url.host, port_part, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        mithril_url::parse_url(s).unwrap()
    }

    #[test]
    fn resolves_root_relative_href() {
        assert_eq!(make_absolute_link(&url("http://example.test/a"), None, "/b").as_deref(), Some("http://example.test/b"));
    }

    #[test]
    fn rejects_second_identical_link() {
        let a = make_absolute_link(&url("http://example.test/a"), None, "/b");
        let b = make_absolute_link(&url("http://example.test/a"), None, "/b");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(make_absolute_link(&url("http://example.test/a"), None, "javascript:alert(1)"), None);
        assert_eq!(make_absolute_link(&url("http://example.test/a"), None, "mailto:a@b.com"), None);
        assert_eq!(make_absolute_link(&url("http://example.test/a"), None, "#frag"), None);
    }

    #[test]
    fn resolves_protocol_relative_href() {
        assert_eq!(
            make_absolute_link(&url("https://example.test/a"), None, "//cdn.test/x").as_deref(),
            Some("https://cdn.test/x")
        );
    }

    #[test]
    fn resolves_dot_segments_against_current_path() {
        assert_eq!(
            make_absolute_link(&url("http://example.test/a/b/"), None, "../c").as_deref(),
            Some("http://example.test/a/c")
        );
    }

    #[test]
    fn absolute_href_is_returned_unchanged() {
        assert_eq!(
            make_absolute_link(&url("http://example.test/a"), None, "http://other.test/x").as_deref(),
            Some("http://other.test/x")
        );
    }
}
