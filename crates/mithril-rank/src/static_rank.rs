//! URL-structure heuristic scoring, independent of query terms. Mirrors
//! `examples/original_source/ranking/src/StaticRanker.{h,cpp}`'s points
//! system: a single scan of the URL builds a [`UrlShape`], then a set of
//! additive bonuses/penalties over it produce a raw integer score, which
//! [`score`] normalizes to `[0.0, 1.0]` for combination in
//! [`crate::dynamic`].

use std::collections::HashSet;
use std::sync::OnceLock;

pub const HTTPS_SCORE: i32 = 100;
pub const WHITELIST_TLD_SCORE: i32 = 200;
pub const WHITELIST_DOMAIN_SCORE: i32 = 500;

pub const DOMAIN_NAME_SCORE: i32 = 200;
pub const DOMAIN_LENGTH_ACCEPTABLE: i32 = 11;
pub const DOMAIN_PENALTY_PER_EXTRA_LENGTH: i32 = 50;

pub const URL_LENGTH_SCORE: i32 = 400;
pub const URL_LENGTH_ACCEPTABLE: i32 = 60;
pub const URL_PENALTY_PER_EXTRA_LENGTH: i32 = 50;

pub const NUMBER_PARAM_SCORE: i32 = 200;
pub const NUMBER_PARAM_ACCEPTABLE: i32 = 1;
pub const NUMBER_PARAM_PENALTY_PER_EXTRA_PARAM: i32 = 100;

pub const DEPTH_PAGE_SCORE: i32 = 400;
pub const DEPTH_PAGE_ACCEPTABLE: i32 = 1;
pub const DEPTH_PAGE_PENALTY: i32 = 50;

pub const EXTENSION_BOOST: i32 = 500;

pub const SUBDOMAIN_ACCEPTABLE: i32 = 1;
pub const SUBDOMAIN_PENALTY: i32 = 200;

pub const DOMAIN_NAME_NUMBER_PENALTY: i32 = 500;
pub const URL_NUMBER_PENALTY: i32 = 500;

/// The maximum attainable raw score (every bonus, no penalty), used to
/// normalize [`raw_score`]'s output into `[0.0, 1.0]`.
const MAX_RAW_SCORE: i32 =
    HTTPS_SCORE + WHITELIST_TLD_SCORE + WHITELIST_DOMAIN_SCORE + URL_LENGTH_SCORE + NUMBER_PARAM_SCORE + DEPTH_PAGE_SCORE + EXTENSION_BOOST;

fn whitelist_tld() -> &'static HashSet<&'static str> {
    static TLDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    TLDS.get_or_init(|| ["com", "co", "org", "net", "edu", "gov", "int"].into_iter().collect())
}

/// A representative subset of the original's whitelist, one or two
/// canonical names per category (news, education, government, science,
/// health, finance, culture, tech) — see DESIGN.md's Open Question
/// decision on whitelist size.
fn whitelist_domain() -> &'static HashSet<&'static str> {
    static DOMAINS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    DOMAINS.get_or_init(|| {
        [
            "bbc.com",
            "nytimes.com",
            "reuters.com",
            "npr.org",
            "wikipedia.org",
            "khanacademy.org",
            "arxiv.org",
            "usa.gov",
            "who.int",
            "nasa.gov",
            "europa.eu",
            "nature.com",
            "ieee.org",
            "mit.edu",
            "github.com",
            "stackoverflow.com",
            "mayoclinic.org",
            "nih.gov",
            "forbes.com",
            "economist.com",
            "investopedia.com",
            "nationalgeographic.com",
            "imdb.com",
            "python.org",
            "mozilla.org",
        ]
        .into_iter()
        .collect()
    })
}

fn good_extension() -> &'static HashSet<&'static str> {
    static EXTENSIONS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    EXTENSIONS.get_or_init(|| ["asp", "html", "htm", "php", ""].into_iter().collect())
}

/// Structural facts about a URL gathered in a single forward scan, mirroring
/// the original's `CrawlerRankingsStruct`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct UrlShape {
    tld: String,
    domain_name: String,
    extension: String,
    url_length: i32,
    parameter_count: i32,
    page_depth: i32,
    subdomain_count: i32,
    number_in_domain_name: bool,
    number_in_url: bool,
    is_https: bool,
}

/// Scans `url` once to populate a [`UrlShape`]. Mirrors
/// `StaticRanker.cpp`'s `GetStringStaticRankings`: walk the scheme looking
/// for `s` (https), skip `://`, accumulate the domain up to the first `/`
/// (tracking the final dot-segment as the TLD and counting subdomains by
/// dot), strip a leading `www.`, then scan the remainder counting
/// parameters, path depth, and digit runs longer than 4 characters.
fn scan(url: &str) -> UrlShape {
    let mut shape = UrlShape::default();
    let bytes: Vec<char> = url.chars().collect();
    let mut i = 0;

    while i < bytes.len() && bytes[i] != ':' {
        if bytes[i] == 's' {
            shape.is_https = true;
        }
        i += 1;
    }
    i = (i + 3).min(bytes.len());

    let mut read_tld = false;
    while i < bytes.len() && bytes[i] != '/' {
        let c = bytes[i];
        if read_tld {
            shape.tld.push(c);
        }
        if c == '.' {
            read_tld = true;
            shape.tld.clear();
            shape.subdomain_count += 1;
        }
        if c.is_ascii_digit() {
            shape.number_in_domain_name = true;
        }
        shape.domain_name.push(c);
        i += 1;
    }

    if let Some(stripped) = shape.domain_name.strip_prefix("www.") {
        shape.domain_name = stripped.to_string();
        shape.subdomain_count -= 1;
    }

    let mut read_extension = false;
    let mut current_number_length = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            '?' | '&' => {
                shape.parameter_count += 1;
                read_extension = false;
            }
            '/' => {
                shape.page_depth += 1;
                shape.extension.clear();
                read_extension = false;
            }
            '.' => {
                shape.extension.clear();
                read_extension = true;
            }
            _ if read_extension => shape.extension.push(c),
            _ => {}
        }

        if c.is_ascii_digit() {
            current_number_length += 1;
            if current_number_length > 4 {
                shape.number_in_url = true;
            }
        } else {
            current_number_length = 0;
        }

        shape.url_length += 1;
        i += 1;
    }

    if bytes.last() == Some(&'/') {
        shape.page_depth -= 1;
    }

    shape
}

/// The raw, unbounded points-based score (spec.md §4.8's "static rank"),
/// before normalization.
fn raw_score(url: &str) -> i32 {
    let shape = scan(url);
    let mut score = 0;

    if whitelist_tld().contains(shape.tld.as_str()) {
        score += WHITELIST_TLD_SCORE;
    }

    if whitelist_domain().contains(shape.domain_name.as_str()) {
        score += WHITELIST_DOMAIN_SCORE;
    } else {
        if shape.subdomain_count > SUBDOMAIN_ACCEPTABLE {
            score -= SUBDOMAIN_PENALTY * (shape.subdomain_count - SUBDOMAIN_ACCEPTABLE);
        }
        if shape.number_in_domain_name {
            score -= DOMAIN_NAME_NUMBER_PENALTY;
        }

        let domain_len = shape.domain_name.chars().count() as i32;
        let domain_penalty = (DOMAIN_PENALTY_PER_EXTRA_LENGTH * (domain_len - DOMAIN_LENGTH_ACCEPTABLE)).max(0);
        score += DOMAIN_NAME_SCORE - domain_penalty.min(DOMAIN_NAME_SCORE);
    }

    let url_penalty = (URL_PENALTY_PER_EXTRA_LENGTH * (shape.url_length - URL_LENGTH_ACCEPTABLE)).max(0);
    score += URL_LENGTH_SCORE - url_penalty.min(URL_LENGTH_SCORE);

    let param_penalty = (NUMBER_PARAM_PENALTY_PER_EXTRA_PARAM * (shape.parameter_count - NUMBER_PARAM_ACCEPTABLE)).max(0);
    score += NUMBER_PARAM_SCORE - param_penalty.min(NUMBER_PARAM_SCORE);

    let depth_penalty = (DEPTH_PAGE_PENALTY * (shape.page_depth - DEPTH_PAGE_ACCEPTABLE)).max(0);
    score += DEPTH_PAGE_SCORE - depth_penalty.min(DEPTH_PAGE_SCORE);

    if shape.is_https {
        score += HTTPS_SCORE;
    }
    if shape.number_in_url {
        score -= URL_NUMBER_PENALTY;
    }
    if good_extension().contains(shape.extension.as_str()) {
        score += EXTENSION_BOOST;
    }

    score
}

/// Scores `url` purely from its structure, normalized to `[0.0, 1.0]` (a
/// score of `0.0` means every applicable penalty fired and no bonus did;
/// `1.0` means every bonus applied with zero penalty — the theoretical
/// ceiling `MAX_RAW_SCORE`).
pub fn score(url: &str) -> f32 {
    let raw = raw_score(url);
    (raw as f32 / MAX_RAW_SCORE as f32).clamp(0.0, 1.0)
}
