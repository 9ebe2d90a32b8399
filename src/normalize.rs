//! Paragraph markup normalization.
//!
//! XML serializers leave two artifacts that make chapter diffs noisy: empty
//! paragraphs written as `<p/>` and consecutive paragraphs glued together as
//! `</p><p>`. Outside verbatim containers the first becomes `<p></p>` and the
//! second is split with [`PARAGRAPH_BREAK`]. Text content is never touched.

use crate::scope::TagStack;
use crate::tokenize::{is_void, tokenize, Tag, TagKind, Token};

/// Inserted between two paragraphs with nothing in between.
pub const PARAGRAPH_BREAK: &str = "\n\n  ";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub text: String,
    /// Self-closing paragraphs expanded.
    pub expanded: usize,
    /// Glued paragraph boundaries split.
    pub split: usize,
}

impl NormalizeOutcome {
    pub fn is_changed(&self) -> bool {
        self.expanded + self.split > 0
    }
}

pub fn normalize_paragraphs(source: &str) -> NormalizeOutcome {
    let tokens = tokenize(source);
    let mut stack = TagStack::new();
    let mut out = String::with_capacity(source.len() + 16);
    let (mut expanded, mut split) = (0, 0);

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Text { content, .. } => {
                if content.is_empty() && !stack.in_skip_region() && glued_paragraphs(&tokens, index) {
                    out.push_str(PARAGRAPH_BREAK);
                    split += 1;
                } else {
                    out.push_str(content);
                }
            }
            Token::Markup { raw, tag: Some(tag), .. } => {
                let verbatim = stack.in_skip_region();
                match tag.kind {
                    TagKind::Open if !is_void(&tag.name) => stack.push(&tag.name),
                    TagKind::Close => {
                        stack.pop(&tag.name);
                    }
                    TagKind::Open | TagKind::SelfClosing => {}
                }
                if !verbatim && tag.kind == TagKind::SelfClosing && tag.name == "p" {
                    expand_self_closing(raw, &mut out);
                    expanded += 1;
                } else {
                    out.push_str(raw);
                }
            }
            Token::Markup { raw, tag: None, .. } => out.push_str(raw),
        }
    }

    if expanded + split == 0 {
        out = source.to_string();
    }
    NormalizeOutcome { text: out, expanded, split }
}

fn is_paragraph_tag(tag: Option<&Tag>, kinds: &[TagKind]) -> bool {
    tag.is_some_and(|t| t.name == "p" && kinds.contains(&t.kind))
}

/// The empty text at `index` sits between the end of one paragraph (`</p>`
/// or `<p/>`) and the start of the next.
fn glued_paragraphs(tokens: &[Token], index: usize) -> bool {
    const STARTS: &[TagKind] = &[TagKind::Open, TagKind::SelfClosing];
    index > 0
        && is_paragraph_tag(tokens[index - 1].tag(), &[TagKind::Close, TagKind::SelfClosing])
        && is_paragraph_tag(tokens.get(index + 1).and_then(Token::tag), STARTS)
}

/// `<p class="x" />` -> `<p class="x"></p>`, keeping the name as written.
fn expand_self_closing(raw: &str, out: &mut String) {
    let body = raw.trim_end_matches('>').trim_end().trim_end_matches('/').trim_end();
    out.push_str(body);
    out.push_str("></");
    out.push_str(&raw[1..2]);
    out.push('>');
}
