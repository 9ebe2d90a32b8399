//! Ordered, idempotent whitespace/punctuation rewrites for one text token.
//!
//! Every rule is a pure `&str -> String` function. They run in the order of
//! [`RULES`], each on the previous rule's output:
//!
//! 1. `space-before-punctuation`: drop whitespace before `,;:!?` and before a
//!    lone `.`. A space before an ellipsis (`I ...think`) is kept.
//! 2. `collapse-spaces`: runs of two or more plain spaces become one. A run
//!    that directly follows a newline or tab is line indentation and is kept.
//! 3. `space-after-punctuation`: one space after `,;:!?` when a letter follows
//!    directly. The `;` closing a character reference (`&amp;`) is exempt.
//! 4. `space-after-period`: one space after a `.` followed by a letter,
//!    unless the `.` belongs to an ellipsis (`...hello` stays fused) or
//!    follows a single capital letter (`U.S.`, `J.R.R.`).
//!
//! The pronoun stylization `I ...think` is shielded for the whole run and
//! restored afterwards, so no rule can alter it.

use regex::Captures;

use crate::text::is_whitespace_only;

/// One named rewrite step.
#[derive(Clone, Copy)]
pub struct TextRule {
    pub id: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for TextRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRule").field("id", &self.id).finish()
    }
}

/// Rewrite steps in precedence order.
pub const RULES: &[TextRule] = &[
    TextRule { id: "space-before-punctuation", apply: remove_space_before_punct },
    TextRule { id: "collapse-spaces", apply: collapse_spaces },
    TextRule { id: "space-after-punctuation", apply: space_after_punct },
    TextRule { id: "space-after-period", apply: space_after_period },
];

/// Stands in for the space of `I ...think` while the rules run.
const PRONOUN_SHIELD: char = '\u{E000}';

/// Run every rule over `text`. Empty and whitespace-only input comes back
/// unchanged.
pub fn fix_text(text: &str) -> String {
    if is_whitespace_only(text) {
        return text.to_string();
    }

    let shielded = shield_pronoun_ellipsis(text);
    let mut fixed = shielded.text;
    for rule in RULES {
        fixed = (rule.apply)(&fixed);
    }
    if shielded.active {
        fixed = fixed.replace(PRONOUN_SHIELD, " ");
    }
    fixed
}

/* ================================= Rules ================================= */

pub fn remove_space_before_punct(text: &str) -> String {
    regex!(r"\s+([,;:!?]|\.+)")
        .replace_all(text, |caps: &Captures| {
            let punct = &caps[1];
            if punct.len() > 1 {
                // ellipsis: keep the space in front of it
                caps[0].to_string()
            } else {
                punct.to_string()
            }
        })
        .into_owned()
}

pub fn collapse_spaces(text: &str) -> String {
    regex!(r"(^|[^\n\t ]) {2,}").replace_all(text, "$1 ").into_owned()
}

pub fn space_after_punct(text: &str) -> String {
    regex!(r"(&#?[A-Za-z0-9]+;)|([,;:!?])([A-Za-z])")
        .replace_all(text, |caps: &Captures| {
            if let Some(entity) = caps.get(1) {
                return entity.as_str().to_string();
            }
            format!("{} {}", &caps[2], &caps[3])
        })
        .into_owned()
}

pub fn space_after_period(text: &str) -> String {
    let b = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut copied = 0usize;

    for i in 0..b.len() {
        if b[i] != b'.' || i + 1 >= b.len() || !b[i + 1].is_ascii_alphabetic() {
            continue;
        }
        if i > 0 && b[i - 1] == b'.' {
            continue;
        }
        if follows_initial(b, i) {
            continue;
        }
        out.push_str(&text[copied..=i]);
        out.push(' ');
        copied = i + 1;
    }
    out.push_str(&text[copied..]);
    out
}

/* ============================ Utility predicates ========================= */

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True when the byte before `dot` is a capital letter standing alone.
fn follows_initial(b: &[u8], dot: usize) -> bool {
    dot >= 1 && b[dot - 1].is_ascii_uppercase() && (dot == 1 || !is_word_byte(b[dot - 2]))
}

struct Shielded {
    text: String,
    active: bool,
}

fn shield_pronoun_ellipsis(text: &str) -> Shielded {
    if text.contains(PRONOUN_SHIELD) {
        return Shielded { text: text.to_string(), active: false };
    }
    let re = regex!(r"\b([Ii]) ((?:\.\.\.|…)[A-Za-z])");
    if !re.is_match(text) {
        return Shielded { text: text.to_string(), active: false };
    }
    let text = re
        .replace_all(text, |caps: &Captures| format!("{}{}{}", &caps[1], PRONOUN_SHIELD, &caps[2]))
        .into_owned();
    Shielded { text, active: true }
}
