//! Small string helpers shared by the fix pipeline, the scanner and reports.

/// Maximum snippet length, in characters, including the truncation marker.
pub const SNIPPET_LIMIT: usize = 80;

#[inline]
pub fn is_whitespace_only(text: &str) -> bool {
    text.trim().is_empty()
}

/// True when the text carries something other than whitespace.
#[inline]
pub fn is_meaningful(text: &str) -> bool {
    !is_whitespace_only(text)
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn collapse_ws(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Whitespace-collapsed excerpt capped at [`SNIPPET_LIMIT`] characters.
pub fn snippet(text: &str) -> String {
    let cleaned = collapse_ws(text);
    if cleaned.chars().count() <= SNIPPET_LIMIT {
        return cleaned;
    }
    let mut cut: String = cleaned.chars().take(SNIPPET_LIMIT - 3).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}

/// Insert `prefix` right after the leading whitespace of `text`.
pub fn prepend_after_indent(text: &str, prefix: &str) -> String {
    let body = text.trim_start();
    let lead = &text[..text.len() - body.len()];
    let mut out = String::with_capacity(text.len() + prefix.len());
    out.push_str(lead);
    out.push_str(prefix);
    out.push_str(body);
    out
}

/// Insert `suffix` right before the trailing whitespace of `text`.
pub fn append_before_trailing_ws(text: &str, suffix: &str) -> String {
    let body = text.trim_end();
    let tail = &text[body.len()..];
    let mut out = String::with_capacity(text.len() + suffix.len());
    out.push_str(body);
    out.push_str(suffix);
    out.push_str(tail);
    out
}

/// Count `\n` bytes, used for line bookkeeping.
#[inline]
pub fn count_newlines(text: &str) -> usize {
    memchr::memchr_iter(b'\n', text.as_bytes()).count()
}

/// Line of the first non-whitespace character of a run starting at `start`.
pub fn content_line(start: usize, text: &str) -> usize {
    let lead = text.len() - text.trim_start().len();
    start + count_newlines(&text[..lead])
}
