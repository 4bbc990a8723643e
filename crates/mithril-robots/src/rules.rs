use crate::trie::{RobotsTrie, RuleType};

/// Maximum number of bytes of a robots.txt body that will be parsed; the
/// remainder is silently discarded.
pub const MAX_ROBOTS_TXT_SIZE: usize = 500 * 1024;

struct RobotLine<'a> {
    directive: &'a str,
    value: &'a str,
}

fn parse_robot_line(line: &str) -> Option<RobotLine<'_>> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i == bytes.len() || bytes[i] == b'#' {
        return None;
    }

    let directive_start = i;
    while i < bytes.len() && !(bytes[i].is_ascii_whitespace() || bytes[i] == b':') {
        i += 1;
    }
    let directive = &line[directive_start..i];

    while i < bytes.len() && bytes[i] != b':' {
        i += 1;
    }
    i += 1; // consume ':'
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }

    let value_start = i;
    while i < bytes.len() && !matches!(bytes[i], b'#' | b'\n' | b'\r') {
        i += 1;
    }
    let mut value_end = i;
    while value_end > value_start && bytes[value_end - 1].is_ascii_whitespace() {
        value_end -= 1;
    }

    Some(RobotLine { directive, value: &line[value_start..value_end] })
}

/// Strips a trailing `/*` wildcard (the only wildcard form this parser
/// understands) down to the prefix it stands for. Any other occurrence of
/// `*` makes the rule unsupported; the caller drops such rules silently.
fn fix_wildcard_path(p: &str) -> Option<&str> {
    match p.strip_suffix("/*") {
        Some(stripped) => {
            let prefix = &p[..stripped.len() + 1];
            if prefix.contains('*') {
                None
            } else {
                Some(prefix)
            }
        }
        None => if p.contains('*') { None } else { Some(p) },
    }
}

/// A parsed set of robots.txt rules for a single user agent.
#[derive(Debug)]
pub struct RobotRules {
    trie: RobotsTrie,
    disallow_all: bool,
    crawl_delay: Option<u32>,
}

impl RobotRules {
    /// Disallows every path. Used as the default / fail-safe ruleset (404
    /// decode failures, 401/403 responses).
    pub fn disallow_all() -> Self {
        RobotRules { trie: RobotsTrie::new(), disallow_all: true, crawl_delay: None }
    }

    /// Allows every path. Used when a host has no `robots.txt` (404).
    pub fn allow_all() -> Self {
        RobotRules { trie: RobotsTrie::new(), disallow_all: false, crawl_delay: None }
    }

    /// Parses a robots.txt file body, keeping only the directives that
    /// apply to `user_agent` (an exact case-insensitive match, or the `*`
    /// wildcard group).
    pub fn from_robots_txt(file: &str, user_agent: &str) -> Self {
        let file = if file.len() > MAX_ROBOTS_TXT_SIZE { &file[..MAX_ROBOTS_TXT_SIZE] } else { file };

        let mut trie = RobotsTrie::new();
        let mut matches_user_agent = false;
        let mut in_user_agent_defns = false;
        let mut crawl_delay = None;

        for raw_line in file.split(['\r', '\n']) {
            let Some(line) = parse_robot_line(raw_line) else { continue };

            if line.directive.eq_ignore_ascii_case("user-agent") {
                if !in_user_agent_defns {
                    in_user_agent_defns = true;
                    matches_user_agent = false;
                }
                matches_user_agent |= line.value == "*" || line.value.eq_ignore_ascii_case(user_agent);
                continue;
            }
            in_user_agent_defns = false;

            if !matches_user_agent {
                continue;
            }

            if line.directive.eq_ignore_ascii_case("disallow") {
                if !line.value.is_empty() {
                    if let Some(p) = fix_wildcard_path(line.value) {
                        trie.insert(p, RuleType::Disallow);
                    }
                }
            } else if line.directive.eq_ignore_ascii_case("allow") {
                if !line.value.is_empty() {
                    if let Some(p) = fix_wildcard_path(line.value) {
                        trie.insert(p, RuleType::Allow);
                    }
                }
            } else if line.directive.eq_ignore_ascii_case("crawl-delay") {
                crawl_delay = line.value.parse::<u32>().ok().or(crawl_delay);
            }
        }

        RobotRules { trie, disallow_all: false, crawl_delay }
    }

    /// Returns whether `path` may be crawled under this ruleset.
    pub fn allowed(&self, path: &str) -> bool {
        if self.disallow_all {
            return false;
        }
        if self.trie.is_empty() {
            return true;
        }
        !matches!(self.trie.longest_match(path), Some(RuleType::Disallow))
    }

    /// The `Crawl-Delay` directive's value, in seconds, if present.
    pub fn crawl_delay(&self) -> Option<u32> {
        self.crawl_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "mithril-crawler";

    #[test]
    fn disallow_all_blocks_everything() {
        let rules = RobotRules::disallow_all();
        assert!(!rules.allowed("/"));
        assert!(!rules.allowed("/anything"));
    }

    #[test]
    fn no_rules_allows_everything() {
        let rules = RobotRules::from_robots_txt("", UA);
        assert!(rules.allowed("/anything"));
    }

    #[test]
    fn basic_disallow() {
        let txt = "User-agent: *\nDisallow: /private\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(!rules.allowed("/private/data"));
        assert!(rules.allowed("/public"));
    }

    #[test]
    fn allow_overrides_longer_disallow() {
        let txt = "User-agent: *\nDisallow: /a\nAllow: /a/b\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(rules.allowed("/a/b/c"));
        assert!(!rules.allowed("/a/x"));
    }

    #[test]
    fn unrelated_user_agent_group_is_ignored() {
        let txt = "User-agent: Googlebot\nDisallow: /\nUser-agent: mithril-crawler\nDisallow: /secret\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(rules.allowed("/"));
        assert!(!rules.allowed("/secret"));
    }

    #[test]
    fn wildcard_group_applies_when_no_specific_match() {
        let txt = "User-agent: *\nDisallow: /x\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(!rules.allowed("/x"));
    }

    #[test]
    fn trailing_wildcard_is_stripped_to_prefix() {
        let txt = "User-agent: *\nDisallow: /private/*\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(!rules.allowed("/private/anything"));
        assert!(rules.allowed("/private"));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let txt = "# comment\n\nUser-agent: *\nDisallow: /x # trailing comment\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(!rules.allowed("/x"));
    }

    #[test]
    fn intra_segment_wildcard_is_silently_dropped() {
        let txt = "User-agent: *\nDisallow: /test*/\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert!(rules.allowed("/test123/x"));
    }

    #[test]
    fn crawl_delay_is_captured() {
        let txt = "User-agent: *\nCrawl-delay: 10\n";
        let rules = RobotRules::from_robots_txt(txt, UA);
        assert_eq!(rules.crawl_delay(), Some(10));
    }

    #[test]
    fn spec_example_private_public_split() {
        let txt = "User-agent: *\nDisallow: /private/\nAllow: /private/public/\n";
        let rules = RobotRules::from_robots_txt(txt, "testbot");
        assert!(!rules.allowed("/private/x"));
        assert!(rules.allowed("/private/public/y"));
        assert!(rules.allowed("/public/z"));
    }

    #[test]
    fn spec_example_per_agent_groups() {
        let txt = "User-agent: goodbot\nDisallow: /downloads/private/\nAllow: /downloads/public/\n";
        let rules = RobotRules::from_robots_txt(txt, "goodbot");
        assert!(rules.allowed("/downloads/public/f"));
        assert!(!rules.allowed("/downloads/private/s"));

        let txt2 = "User-agent: *\nDisallow: /downloads/\nUser-agent: goodbot\nDisallow: /downloads/private/\nAllow: /downloads/public/\n";
        let rules2 = RobotRules::from_robots_txt(txt2, "randombot");
        assert!(!rules2.allowed("/downloads/anything"));
    }
}
