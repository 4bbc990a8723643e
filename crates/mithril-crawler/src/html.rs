//! Minimal HTML extraction. This is deliberately not a full HTML5 parser —
//! it recovers just the title, a meta description, tokenized body words, and
//! outbound `<a href>`/`<base href>` links, which is everything the rest of
//! the crawl pipeline needs.

/// What the crawler pulls out of a fetched page before it is handed to the
/// document store and the URL frontier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Vec<String>,
    pub description: Vec<String>,
    pub words: Vec<String>,
    pub base: Option<String>,
    pub links: Vec<String>,
}

fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == b'>').map(|p| from + p)
}

fn attr_value<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{attr}=");
    let mut search_from = 0;
    while let Some(rel) = lower[search_from..].find(&needle) {
        let pos = search_from + rel;
        let preceding_ok = pos == 0 || lower.as_bytes()[pos - 1].is_ascii_whitespace();
        if preceding_ok {
            let val_start = pos + needle.len();
            let bytes = tag.as_bytes();
            if val_start >= bytes.len() {
                return None;
            }
            return match bytes[val_start] {
                b'"' => tag[val_start + 1..].find('"').map(|end| &tag[val_start + 1..val_start + 1 + end]),
                b'\'' => tag[val_start + 1..].find('\'').map(|end| &tag[val_start + 1..val_start + 1 + end]),
                _ => {
                    let end = tag[val_start..].find(|c: char| c.is_whitespace()).map(|e| val_start + e).unwrap_or(tag.len());
                    Some(&tag[val_start..end])
                }
            };
        }
        search_from = pos + needle.len();
    }
    None
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Extracts title, description, visible-text words, `<base href>`, and
/// outbound links from a raw HTML document.
pub fn extract(html: &str) -> ExtractedPage {
    let mut page = ExtractedPage::default();
    let mut text = String::with_capacity(html.len());
    let bytes = html.as_bytes();
    let mut i = 0;
    let mut skip_until_close: Option<&str> = None;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            if skip_until_close.is_none() {
                text.push(bytes[i] as char);
            }
            i += 1;
            continue;
        }

        let Some(tag_end) = find_tag_end(bytes, i) else { break };
        let raw_tag = &html[i + 1..tag_end];
        let tag_name_end = raw_tag.find(|c: char| c.is_whitespace() || c == '/').unwrap_or(raw_tag.len());
        let tag_name = raw_tag[..tag_name_end].to_ascii_lowercase();
        let is_closing = raw_tag.starts_with('/');

        if let Some(skip_tag) = skip_until_close {
            if is_closing && tag_name.trim_start_matches('/') == skip_tag {
                skip_until_close = None;
            }
            i = tag_end + 1;
            continue;
        }

        match tag_name.as_str() {
            "script" if !is_closing => skip_until_close = Some("script"),
            "style" if !is_closing => skip_until_close = Some("style"),
            "title" if !is_closing => {
                if let Some(close) = html[tag_end + 1..].find("</title>") {
                    let inner = decode_entities(&html[tag_end + 1..tag_end + 1 + close]);
                    page.title = tokenize(&inner);
                }
            }
            "meta" => {
                if attr_value(raw_tag, "name").map(|n| n.eq_ignore_ascii_case("description")).unwrap_or(false) {
                    if let Some(content) = attr_value(raw_tag, "content") {
                        page.description = tokenize(&decode_entities(content));
                    }
                }
            }
            "base" => {
                if page.base.is_none() {
                    page.base = attr_value(raw_tag, "href").map(|h| decode_entities(h));
                }
            }
            "a" => {
                if let Some(href) = attr_value(raw_tag, "href") {
                    page.links.push(decode_entities(href));
                }
            }
            _ => {}
        }

        i = tag_end + 1;
    }

    page.words = tokenize(&decode_entities(&text));
    page
}

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).map(|w| w.to_ascii_lowercase()).collect()
}
