//! URL parsing and canonicalization.
//!
//! The validation and canonicalization rules mirror what a web crawler
//! needs: a small, strict subset of RFC 3986 limited to `http`/`https`
//! authorities, no IPv6 literals, and a canonical form suitable for
//! deduplicating crawl targets.

mod error;

pub use error::ParseError;

use std::fmt;

/// Maximum accepted length of a raw URL string, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;
/// Minimum accepted length of a raw URL string, in bytes.
pub const MIN_URL_LENGTH: usize = 10;
/// Maximum accepted length of a host, in bytes.
pub const MAX_HOST_LENGTH: usize = 253;

/// A parsed URL, retaining the original string alongside its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

/// A canonicalized (scheme, host, port) triple, used to key per-host state
/// such as the robots cache and crawl politeness queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalHost {
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: String,
}

fn is_valid_domain_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes.iter().all(|&c| c.is_ascii_alphanumeric() || c == b'-')
}

fn is_valid_domain(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOST_LENGTH {
        return false;
    }
    if host.starts_with('.') || host.ends_with('.') {
        return false;
    }
    host.split('.').all(is_valid_domain_label)
}

/// Parses a URL string into its [`Url`] components.
///
/// Only `http` and `https` schemes with a `//` authority are accepted.
/// IPv6 literal hosts (`[...]`) are rejected. The host must be a valid
/// DNS-style domain (dot-separated labels of 1-63 alphanumeric/`-`
/// characters, never leading/trailing `-`, host no longer than 253 bytes).
pub fn parse_url(s: &str) -> Result<Url, ParseError> {
    let scheme_end = s.find(':').ok_or(ParseError::MissingScheme)?;
    if scheme_end == 0 {
        return Err(ParseError::MissingScheme);
    }

    let scheme = s[..scheme_end].to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(ParseError::UnsupportedScheme(scheme));
    }

    let bytes = s.as_bytes();
    let size = bytes.len();
    let mut i = scheme_end + 1;
    let authority_start;
    if i + 1 < size && bytes[i] == b'/' && bytes[i + 1] == b'/' {
        i += 2;
        authority_start = i;
    } else {
        return Err(ParseError::MissingAuthority);
    }

    let mut host_end = authority_start;
    while host_end < size {
        match bytes[host_end] {
            b'[' => return Err(ParseError::Ipv6NotSupported),
            b':' | b'/' | b'?' | b'#' => break,
            _ => host_end += 1,
        }
    }

    let host = &s[authority_start..host_end];
    if host.is_empty() {
        return Err(ParseError::EmptyHost);
    }
    if !is_valid_domain(host) {
        return Err(ParseError::InvalidHost(host.to_string()));
    }

    i = host_end;
    let mut port = String::new();
    if i < size && bytes[i] == b':' {
        i += 1;
        let port_start = i;
        while i < size && !matches!(bytes[i], b'/' | b'?' | b'#') {
            i += 1;
        }
        port = s[port_start..i].to_string();
        if port.is_empty() {
            return Err(ParseError::EmptyPort);
        }
        if !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::NonNumericPort(port));
        }
        match port.parse::<u32>() {
            Ok(n) if (1..=65535).contains(&n) => {}
            _ => return Err(ParseError::PortOutOfRange(port)),
        }
    }

    let path = s[i..].to_string();

    Ok(Url { url: s.to_string(), scheme, host: host.to_string(), port, path })
}

/// Returns the canonical string form of `url`: lowercased scheme/host,
/// default port stripped, duplicate path slashes collapsed, a leading
/// slash guaranteed, and anything from `#` onward dropped.
pub fn canonicalize_url(url: &Url) -> String {
    let scheme = url.scheme.to_ascii_lowercase();
    let host = url.host.to_ascii_lowercase();

    let mut canonical = format!("{scheme}://{host}");

    let is_default_port = (scheme == "http" && url.port == "80") || (scheme == "https" && url.port == "443");
    if !url.port.is_empty() && !is_default_port {
        canonical.push(':');
        canonical.push_str(&url.port);
    }

    let mut clean_path = String::with_capacity(url.path.len());
    let mut prev_slash = false;
    if url.path.is_empty() || !url.path.starts_with('/') {
        clean_path.push('/');
        prev_slash = true;
    }

    for c in url.path.chars() {
        if c == '#' {
            break;
        }
        if c == '/' {
            if !prev_slash {
                clean_path.push('/');
                prev_slash = true;
            }
            continue;
        }
        prev_slash = false;
        clean_path.push(c);
    }

    if clean_path.is_empty() || clean_path == "/" {
        canonical.push('/');
    } else {
        canonical.push_str(&clean_path);
    }

    canonical
}

/// Canonicalizes just the host portion of `url`: lowercased scheme/host,
/// with the port included only when it is both present and non-default.
pub fn canonicalize_host(url: &Url) -> CanonicalHost {
    let scheme = url.scheme.to_ascii_lowercase();
    let host = url.host.to_ascii_lowercase();
    let mut out = CanonicalHost { url: String::new(), scheme: scheme.clone(), host: host.clone(), port: String::new() };

    out.url = format!("{scheme}://{host}");

    if !url.port.is_empty() {
        let is_default = (scheme == "https" && url.port == "443") || (scheme == "http" && url.port == "80");
        if !is_default {
            out.port = url.port.clone();
            out.url.push(':');
            out.url.push_str(&out.port);
        }
    }

    out
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl fmt::Display for CanonicalHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_http_url() {
        let u = parse_url("http://example.com/foo/bar").unwrap();
        assert_eq!(u.scheme, "http");
        assert_eq!(u.host, "example.com");
        assert_eq!(u.port, "");
        assert_eq!(u.path, "/foo/bar");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert_eq!(parse_url("example.com/foo"), Err(ParseError::MissingScheme));
    }

    #[test]
    fn rejects_ftp_scheme() {
        assert_eq!(parse_url("ftp://example.com/"), Err(ParseError::UnsupportedScheme("ftp".into())));
    }

    #[test]
    fn rejects_ipv6_literal() {
        assert_eq!(parse_url("http://[::1]/"), Err(ParseError::Ipv6NotSupported));
    }

    #[test]
    fn rejects_invalid_host_label() {
        assert!(matches!(parse_url("http://-bad.example.com/"), Err(ParseError::InvalidHost(_))));
    }

    #[test]
    fn rejects_port_out_of_range() {
        assert!(matches!(parse_url("http://example.com:99999/"), Err(ParseError::PortOutOfRange(_))));
    }

    #[test]
    fn canonicalizes_default_port_and_fragment() {
        let u = parse_url("HTTP://Example.COM:80/a//b/../c#frag").unwrap();
        assert_eq!(canonicalize_url(&u), "http://example.com/a/b/../c");
    }

    #[test]
    fn canonicalizes_nondefault_port() {
        let u = parse_url("http://example.com:8080/x").unwrap();
        assert_eq!(canonicalize_url(&u), "http://example.com:8080/x");
    }

    #[test]
    fn canonicalizes_empty_path_to_slash() {
        let u = parse_url("http://example.com").unwrap();
        assert_eq!(canonicalize_url(&u), "http://example.com/");
    }

    #[test]
    fn canonical_host_drops_default_port() {
        let u = parse_url("https://Github.COM:443/x").unwrap();
        let host = canonicalize_host(&u);
        assert_eq!(host.url, "https://github.com");
        assert_eq!(host.port, "");
    }

    #[test]
    fn canonical_host_keeps_nondefault_port() {
        let u = parse_url("http://example.com:8080/x").unwrap();
        let host = canonicalize_host(&u);
        assert_eq!(host.url, "http://example.com:8080");
        assert_eq!(host.port, "8080");
    }
}
