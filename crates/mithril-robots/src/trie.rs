use std::collections::HashMap;

/// Whether a matched prefix allows or forbids the path it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleType {
    Allow,
    Disallow,
}

/// A byte-trie over `Disallow`/`Allow` path prefixes.
///
/// Lookup walks the trie alongside the queried path, remembering the type
/// of the last terminal node passed. Because terminals are visited in
/// increasing depth order, the last one seen is always the longest
/// matching prefix. When two directives share the exact same prefix,
/// [`RuleType::Allow`] always wins, applied at insertion time.
#[derive(Debug, Default)]
pub(crate) struct RobotsTrie {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<u8, Node>,
    terminal: Option<RuleType>,
}

impl RobotsTrie {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, prefix: &str, rule_type: RuleType) {
        let mut node = &mut self.root;
        for &b in prefix.as_bytes() {
            node = node.children.entry(b).or_default();
        }
        node.terminal = Some(match (node.terminal, rule_type) {
            (Some(RuleType::Allow), _) => RuleType::Allow,
            (_, RuleType::Allow) => RuleType::Allow,
            _ => RuleType::Disallow,
        });
    }

    /// Returns the rule type of the longest prefix in the trie that matches
    /// the start of `path`, or `None` if no prefix matches.
    pub(crate) fn longest_match(&self, path: &str) -> Option<RuleType> {
        let mut node = &self.root;
        let mut best = node.terminal;
        for &b in path.as_bytes() {
            match node.children.get(&b) {
                Some(next) => {
                    node = next;
                    if node.terminal.is_some() {
                        best = node.terminal;
                    }
                }
                None => break,
            }
        }
        best
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.terminal.is_none()
    }
}
