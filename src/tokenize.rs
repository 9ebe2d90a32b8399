// Segment tokenizer
//
// Splits raw document text into alternating text and markup tokens without
// building a tree. The token stream always starts and ends with a text token
// and alternates strictly, so adjacent tags are separated by an empty text
// token. Concatenating every token reproduces the input byte for byte.
//
// - Markup is lexical: `<` up to the next `>`, with at least one byte between
//   them. No attribute parsing, no quote awareness.
// - `<` without a later `>` (and a bare `<>`) stays in text.
// - Tag names follow `[A-Za-z][A-Za-z0-9:_-]*`; anything else is inert markup.
// - `<!...>` and `<?...>` are inert: they never reach the tag stack.

use memchr::memchr;

use crate::text::count_newlines;

/* =============================== Token model ============================= */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

/// Lower-cased tag name plus its open/close/self-close kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Exact markup text. `tag` is `None` for declarations, comments,
    /// processing instructions and malformed tag-looking runs.
    Markup { raw: String, tag: Option<Tag>, line: usize },
    /// Literal character content, possibly empty or whitespace only.
    Text { content: String, line: usize },
}

impl Token {
    /// 1-based line on which the token starts in the original document.
    pub fn line(&self) -> usize {
        match self {
            Token::Markup { line, .. } | Token::Text { line, .. } => *line,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Token::Markup { raw, .. } => raw,
            Token::Text { content, .. } => content,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Text { content, .. } => Some(content),
            Token::Markup { .. } => None,
        }
    }

    /// Replace a text token's content in place. Markup is left untouched and
    /// `false` is returned.
    pub fn set_text(&mut self, new_content: String) -> bool {
        match self {
            Token::Text { content, .. } => {
                *content = new_content;
                true
            }
            Token::Markup { .. } => false,
        }
    }

    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Token::Markup { tag, .. } => tag.as_ref(),
            Token::Text { .. } => None,
        }
    }
}

/* ============================ Utility predicates ========================= */

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

#[inline]
fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

pub(crate) fn matches_ignore_ascii_case(name: &str, set: &[&str]) -> bool {
    set.iter().any(|s| name.eq_ignore_ascii_case(s))
}

/// HTML void elements. XHTML should self-close them, but hand-edited chapters
/// often carry a bare `<br>` or `<hr>`.
pub fn is_void(name: &str) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ],
    )
}

/* =============================== Tag parsing ============================= */

/// Classify raw `<...>` markup. Returns `None` for inert markup.
pub fn parse_tag(raw: &str) -> Option<Tag> {
    let tag = raw.as_bytes();
    let n = tag.len();
    if n < 3 || tag[0] != b'<' || tag[n - 1] != b'>' {
        return None;
    }
    if tag[1] == b'!' || tag[1] == b'?' {
        return None;
    }

    let mut i = 1;
    let mut is_end = false;
    if tag[i] == b'/' {
        is_end = true;
        i += 1;
    }
    while i < n && is_ws(tag[i]) {
        i += 1;
    }
    if i >= n || !tag[i].is_ascii_alphabetic() {
        return None;
    }
    let start = i;
    while i < n && is_name_char(tag[i]) {
        i += 1;
    }
    let name = raw[start..i].to_ascii_lowercase();

    // self-closing? check before '>'
    let mut j = n - 1;
    while j > 0 && is_ws(tag[j - 1]) {
        j -= 1;
    }
    let self_closing = j >= 2 && tag[j - 1] == b'/';

    let kind = if is_end {
        TagKind::Close
    } else if self_closing {
        TagKind::SelfClosing
    } else {
        TagKind::Open
    };
    Some(Tag { name, kind })
}

/* =============================== Tokenizer =============================== */

/// Tokenize `src` into alternating text/markup tokens.
pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let n = bytes.len();
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let mut text_start = 0usize;
    let mut i = 0usize;

    while i < n {
        let Some(lt) = memchr(b'<', &bytes[i..]).map(|off| i + off) else {
            break;
        };
        let gt = match memchr(b'>', &bytes[lt + 1..]) {
            None => break,
            // "<>" is not markup; retry from the next byte
            Some(0) => {
                i = lt + 1;
                continue;
            }
            Some(off) => lt + 1 + off,
        };

        let text = &src[text_start..lt];
        tokens.push(Token::Text { content: text.to_string(), line });
        line += count_newlines(text);

        let raw = &src[lt..=gt];
        tokens.push(Token::Markup { raw: raw.to_string(), tag: parse_tag(raw), line });
        line += count_newlines(raw);

        text_start = gt + 1;
        i = gt + 1;
    }

    tokens.push(Token::Text { content: src[text_start..].to_string(), line });
    tokens
}

/// Concatenate tokens back into document text.
pub fn reassemble(tokens: &[Token]) -> String {
    let len = tokens.iter().map(|t| t.as_str().len()).sum();
    let mut out = String::with_capacity(len);
    for token in tokens {
        out.push_str(token.as_str());
    }
    out
}
