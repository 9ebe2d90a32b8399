//! Tag-context stack, skip regions and paragraph scopes.
//!
//! The tracker is driven token by token. Markup moves the tag stack and opens
//! or closes paragraph scopes; meaningful text outside skip regions feeds the
//! innermost open scope. A scope handed back from [`ScopeTracker::on_tag`] is
//! ready for the quote-balance corrector.

use tracing::debug;

use crate::text::is_meaningful;
use crate::tokenize::{is_void, matches_ignore_ascii_case, Tag, TagKind};

/* =============================== Core sets =============================== */

/// Containers whose text is never rewritten or analyzed.
pub const VERBATIM_TAGS: &[&str] = &["script", "style", "pre", "code", "textarea", "xmp"];

/// Elements whose text is aggregated for whole-paragraph checks.
pub const PARAGRAPH_TAGS: &[&str] = &["p", "li", "blockquote", "h1", "h2", "h3"];

pub fn is_verbatim(name: &str) -> bool {
    matches_ignore_ascii_case(name, VERBATIM_TAGS)
}

pub fn is_paragraph_like(name: &str) -> bool {
    matches_ignore_ascii_case(name, PARAGRAPH_TAGS)
}

/* ================================ Tag stack ============================== */

/// Currently open tag names, lower-cased, outermost first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagStack {
    names: Vec<String>,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_ascii_lowercase());
    }

    /// Close `name`, truncating the stack down to and including its nearest
    /// open ancestor. An unmatched close leaves the stack alone. Returns
    /// whether anything was removed.
    pub fn pop(&mut self, name: &str) -> bool {
        match self.names.iter().rposition(|open| open.eq_ignore_ascii_case(name)) {
            Some(at) => {
                self.names.truncate(at);
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn in_skip_region(&self) -> bool {
        self.names.iter().any(|name| is_verbatim(name))
    }
}

/* ============================= Paragraph scope =========================== */

/// Activation record for one open paragraph-like element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphScope {
    pub tag: String,
    /// Stack index of the opening tag.
    depth: usize,
    /// Token index of the first meaningful text inside the scope.
    pub first_index: Option<usize>,
    /// Token index of the last meaningful text inside the scope.
    pub last_index: Option<usize>,
    pub straight_quotes: usize,
    pub open_curly: usize,
    pub close_curly: usize,
    pub start_sample: String,
    pub end_sample: String,
}

impl ParagraphScope {
    pub fn new(tag: &str, depth: usize) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            depth,
            first_index: None,
            last_index: None,
            straight_quotes: 0,
            open_curly: 0,
            close_curly: 0,
            start_sample: String::new(),
            end_sample: String::new(),
        }
    }

    /// Fold one meaningful text token into the running counts and samples.
    pub fn record(&mut self, index: usize, text: &str) {
        for ch in text.chars() {
            match ch {
                '"' => self.straight_quotes += 1,
                '“' => self.open_curly += 1,
                '”' => self.close_curly += 1,
                _ => {}
            }
        }
        if self.first_index.is_none() {
            self.first_index = Some(index);
            self.start_sample = text.to_string();
        }
        self.last_index = Some(index);
        self.end_sample = text.to_string();
    }
}

/* ============================== Scope tracker ============================ */

#[derive(Debug, Default)]
pub struct ScopeTracker {
    stack: TagStack,
    scopes: Vec<ParagraphScope>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one tag. Returns the paragraph scope it closed, if any.
    pub fn on_tag(&mut self, tag: &Tag) -> Option<ParagraphScope> {
        match tag.kind {
            TagKind::Open if !is_void(&tag.name) => {
                let depth = self.stack.depth();
                self.stack.push(&tag.name);
                if is_paragraph_like(&tag.name) {
                    self.scopes.push(ParagraphScope::new(&tag.name, depth));
                }
                None
            }
            TagKind::Open | TagKind::SelfClosing => None,
            TagKind::Close => {
                // Close the scope before popping so the closing tag is outside it.
                let closed = if is_paragraph_like(&tag.name)
                    && self.scopes.last().is_some_and(|s| s.tag == tag.name)
                {
                    self.scopes.pop()
                } else {
                    None
                };

                self.stack.pop(&tag.name);

                let depth = self.stack.depth();
                while self.scopes.last().is_some_and(|s| s.depth >= depth) {
                    if let Some(orphan) = self.scopes.pop() {
                        debug!(tag = %orphan.tag, closed_by = %tag.name, "abandoned paragraph scope");
                    }
                }
                closed
            }
        }
    }

    pub fn in_skip_region(&self) -> bool {
        self.stack.in_skip_region()
    }

    /// Feed text at token `index` to the innermost scope. Whitespace-only
    /// text is ignored.
    pub fn record_text(&mut self, index: usize, text: &str) {
        if !is_meaningful(text) {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.record(index, text);
        }
    }

    pub fn active_scope(&self) -> Option<&ParagraphScope> {
        self.scopes.last()
    }

    pub fn stack(&self) -> &TagStack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(name: &str) -> Tag {
        Tag { name: name.into(), kind: TagKind::Open }
    }

    fn close(name: &str) -> Tag {
        Tag { name: name.into(), kind: TagKind::Close }
    }

    #[test]
    fn pop_matching_top() {
        let mut stack = TagStack::new();
        stack.push("body");
        stack.push("p");
        assert!(stack.pop("p"));
        assert_eq!(stack.names(), ["body"]);
    }

    #[test]
    fn pop_truncates_to_nearest_matching_ancestor() {
        let mut stack = TagStack::new();
        for name in ["body", "div", "p", "em", "span"] {
            stack.push(name);
        }
        assert!(stack.pop("p"));
        assert_eq!(stack.names(), ["body", "div"]);
    }

    #[test]
    fn pop_picks_innermost_duplicate() {
        let mut stack = TagStack::new();
        for name in ["div", "p", "div", "em"] {
            stack.push(name);
        }
        stack.pop("div");
        assert_eq!(stack.names(), ["div", "p"]);
    }

    #[test]
    fn unmatched_close_is_ignored() {
        let mut stack = TagStack::new();
        stack.push("body");
        assert!(!stack.pop("section"));
        assert_eq!(stack.names(), ["body"]);
        let mut empty = TagStack::new();
        assert!(!empty.pop("p"));
    }

    #[test]
    fn skip_region_covers_nested_tags() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&open("pre"));
        tracker.on_tag(&open("span"));
        assert!(tracker.in_skip_region());
        tracker.on_tag(&close("pre"));
        assert!(!tracker.in_skip_region());
    }

    #[test]
    fn paragraph_scope_collects_quotes_and_samples() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&open("p"));
        tracker.record_text(2, "\"Hello");
        tracker.record_text(4, "   ");
        tracker.record_text(6, "there“”");
        let scope = tracker.on_tag(&close("p")).unwrap();
        assert_eq!(scope.first_index, Some(2));
        assert_eq!(scope.last_index, Some(6));
        assert_eq!(scope.straight_quotes, 1);
        assert_eq!((scope.open_curly, scope.close_curly), (1, 1));
        assert_eq!(scope.start_sample, "\"Hello");
        assert_eq!(scope.end_sample, "there“”");
    }

    #[test]
    fn innermost_scope_receives_text() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&open("blockquote"));
        tracker.on_tag(&open("p"));
        tracker.record_text(3, "inner");
        let inner = tracker.on_tag(&close("p")).unwrap();
        assert_eq!(inner.tag, "p");
        tracker.record_text(5, "outer");
        let outer = tracker.on_tag(&close("blockquote")).unwrap();
        assert_eq!(outer.first_index, Some(5));
    }

    #[test]
    fn self_closing_and_void_tags_open_nothing() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&Tag { name: "p".into(), kind: TagKind::SelfClosing });
        tracker.on_tag(&open("br"));
        assert_eq!(tracker.stack().depth(), 0);
        assert!(tracker.active_scope().is_none());
    }

    #[test]
    fn mismatched_close_abandons_orphaned_scopes() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&open("li"));
        tracker.on_tag(&open("p"));
        tracker.record_text(3, "\"dangling");
        assert!(tracker.on_tag(&close("li")).is_none());
        assert!(tracker.active_scope().is_none());
        assert_eq!(tracker.stack().depth(), 0);
    }

    #[test]
    fn close_with_inline_child_still_closes_scope() {
        let mut tracker = ScopeTracker::new();
        tracker.on_tag(&open("p"));
        tracker.on_tag(&open("em"));
        tracker.record_text(3, "text");
        let scope = tracker.on_tag(&close("p")).unwrap();
        assert_eq!(scope.last_index, Some(3));
        assert_eq!(tracker.stack().depth(), 0);
    }
}
