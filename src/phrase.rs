//! Literal, high-confidence phrase substitutions.
//!
//! Rules run in listed order on the same evolving string. Longer phrases come
//! first so a specific rule wins over the shorter one it contains.

use regex::Regex;

use crate::text::is_whitespace_only;

pub struct PhraseRule {
    pub id: &'static str,
    pub pattern: fn() -> &'static Regex,
    pub replacement: &'static str,
}

impl std::fmt::Debug for PhraseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhraseRule")
            .field("id", &self.id)
            .field("pattern", &(self.pattern)().as_str())
            .field("replacement", &self.replacement)
            .finish()
    }
}

pub const PHRASE_RULES: &[PhraseRule] = &[
    PhraseRule {
        id: "whats_is_it_you_two",
        pattern: || regex!(r"(?i)\bWhat'?s\s+is\s+it\s+you\s+two\b"),
        replacement: "What's with you two",
    },
    PhraseRule {
        id: "whats_is_it",
        pattern: || regex!(r"(?i)\bWhat'?s\s+is\s+it\b"),
        replacement: "What is it",
    },
    PhraseRule {
        id: "whats_is",
        pattern: || regex!(r"(?i)\bWhat'?s\s+is\b"),
        replacement: "What is",
    },
    PhraseRule {
        id: "want_you_accompany",
        pattern: || regex!(r"(?i)\bwant\s+you\s+accompany\b"),
        replacement: "want you to accompany",
    },
];

/// Apply every phrase rule. Returns the rewritten text and the ids of the
/// rules that changed it, in firing order.
pub fn apply_phrase_rules(text: &str) -> (String, Vec<&'static str>) {
    if is_whitespace_only(text) {
        return (text.to_string(), Vec::new());
    }

    let mut fixed = text.to_string();
    let mut fired = Vec::new();
    for rule in PHRASE_RULES {
        let replaced = (rule.pattern)().replace_all(&fixed, regex::NoExpand(rule.replacement));
        if replaced != fixed {
            fixed = replaced.into_owned();
            fired.push(rule.id);
        }
    }
    (fixed, fired)
}
