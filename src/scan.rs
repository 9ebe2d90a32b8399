//! Read-only structural and punctuation checks over a parsed document.
//!
//! Two passes: whole-paragraph checks on every paragraph-like element, then
//! per-run checks on every text run outside verbatim containers. Issues are
//! deduplicated and sorted before they are returned.

use std::fmt;

use crate::scope::{is_paragraph_like, is_verbatim};
use crate::structure::check_structure;
use crate::text::{collapse_ws, is_meaningful, snippet};
use crate::tree::{Document, Element, MarkupParser, Node};

/// Minimum trimmed paragraph length for the terminal punctuation check.
pub const TERMINAL_CHECK_MIN_CHARS: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    Balance,
    Capitalization,
    DupWord,
    Parse,
    Punctuation,
    Quotes,
    Spacing,
    Structure,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Balance => "Balance",
            IssueKind::Capitalization => "Capitalization",
            IssueKind::DupWord => "DupWord",
            IssueKind::Parse => "Parse",
            IssueKind::Punctuation => "Punctuation",
            IssueKind::Quotes => "Quotes",
            IssueKind::Spacing => "Spacing",
            IssueKind::Structure => "Structure",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Issue {
    pub location: String,
    pub line: usize,
    pub kind: IssueKind,
    pub message: String,
    pub snippet: String,
}

impl Issue {
    /// Identity used for deduplication and ordering.
    pub fn key(&self) -> (&str, usize, IssueKind, &str) {
        (&self.location, self.line, self.kind, &self.message)
    }
}

pub const MSG_MULTI_SPACE: &str = "Multiple consecutive spaces";
pub const MSG_SPACE_BEFORE: &str = "Space before punctuation (e.g., 'word ,')";
pub const MSG_LOWER_AFTER: &str = "Lowercase letter after sentence-ending punctuation";
pub const MSG_MISSING_SPACE: &str =
    "Possible missing space after punctuation (e.g., 'word,Next' or 'Mr.Smith')";
pub const MSG_STRAIGHT_QUOTES: &str = "Unbalanced straight quotes (\") in paragraph";
pub const MSG_CURLY_QUOTES: &str = "Unbalanced curly quotes (“ ”) in paragraph";
pub const MSG_MIXED_QUOTES: &str = "Mixed straight and curly quotes in paragraph";
pub const MSG_PARENS: &str = "Unbalanced parentheses in paragraph";
pub const MSG_BRACKETS: &str = "Unbalanced brackets in paragraph";
pub const MSG_NO_TERMINAL: &str = "Paragraph may be missing ending punctuation";

/// Issue collector for one document.
struct Scan<'a> {
    location: &'a str,
    issues: Vec<Issue>,
}

impl Scan<'_> {
    fn push(&mut self, line: usize, kind: IssueKind, message: impl Into<String>, text: &str) {
        self.issues.push(Issue {
            location: self.location.to_string(),
            line: line.max(1),
            kind,
            message: message.into(),
            snippet: snippet(text),
        });
    }
}

/// Optional scanner passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Also run the chapter skeleton checks of [`crate::structure`].
    pub structure: bool,
}

/// Scan `source`. A document that cannot be parsed yields exactly one
/// `Parse` issue on line 1.
pub fn scan_document(location: &str, source: &str, parser: &impl MarkupParser) -> Vec<Issue> {
    scan_document_with(location, source, parser, &ScanOptions::default())
}

pub fn scan_document_with(
    location: &str,
    source: &str,
    parser: &impl MarkupParser,
    options: &ScanOptions,
) -> Vec<Issue> {
    let doc = match parser.parse(source) {
        Ok(doc) => doc,
        Err(failure) => {
            return vec![Issue {
                location: location.to_string(),
                line: 1,
                kind: IssueKind::Parse,
                message: format!("Failed to parse XHTML: {failure}"),
                snippet: String::new(),
            }];
        }
    };
    let mut issues = scan_tree(location, &doc);
    if options.structure {
        issues.extend(check_structure(location, source, &doc));
        finish(&mut issues);
    }
    issues
}

pub fn scan_tree(location: &str, doc: &Document) -> Vec<Issue> {
    let mut scan = Scan { location, issues: Vec::new() };

    let mut paragraphs = Vec::new();
    collect_paragraphs(&doc.children, false, &mut paragraphs);
    for el in paragraphs {
        check_paragraph(&mut scan, el);
    }

    walk_runs(&mut scan, &doc.children, false);

    let mut issues = scan.issues;
    finish(&mut issues);
    issues
}

// stable sort, so dedup keeps the first snippet seen for a key
fn finish(issues: &mut Vec<Issue>) {
    issues.sort_by(|a, b| a.key().cmp(&b.key()));
    issues.dedup_by(|a, b| a.key() == b.key());
}

fn collect_paragraphs<'a>(nodes: &'a [Node], in_verbatim: bool, out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            let verbatim = in_verbatim || is_verbatim(&el.name);
            if !verbatim && is_paragraph_like(&el.name) {
                out.push(el);
            }
            collect_paragraphs(&el.children, verbatim, out);
        }
    }
}

fn walk_runs(scan: &mut Scan<'_>, nodes: &[Node], in_verbatim: bool) {
    for node in nodes {
        match node {
            Node::Text { text, line } if !in_verbatim && is_meaningful(text) => {
                check_run(scan, *line, text);
            }
            Node::Text { .. } => {}
            Node::Element(el) => walk_runs(scan, &el.children, in_verbatim || is_verbatim(&el.name)),
        }
    }
}

/* ============================ Paragraph checks =========================== */

fn check_paragraph(scan: &mut Scan<'_>, el: &Element) {
    let text = el.text_excluding(is_verbatim);
    if !is_meaningful(&text) {
        return;
    }
    let line = el.line;
    let count = |c: char| text.chars().filter(|&x| x == c).count();

    let straight = count('"');
    let (open, close) = (count('“'), count('”'));
    if straight % 2 == 1 {
        scan.push(line, IssueKind::Quotes, MSG_STRAIGHT_QUOTES, &text);
    }
    if open != close {
        scan.push(line, IssueKind::Quotes, MSG_CURLY_QUOTES, &text);
    }
    if straight > 0 && open + close > 0 {
        scan.push(line, IssueKind::Quotes, MSG_MIXED_QUOTES, &text);
    }
    if count('(') != count(')') {
        scan.push(line, IssueKind::Balance, MSG_PARENS, &text);
    }
    if count('[') != count(']') {
        scan.push(line, IssueKind::Balance, MSG_BRACKETS, &text);
    }
    if missing_terminal(&text) {
        scan.push(line, IssueKind::Punctuation, MSG_NO_TERMINAL, &text);
    }
}

fn missing_terminal(text: &str) -> bool {
    let trimmed = collapse_ws(text);
    if trimmed.chars().count() < TERMINAL_CHECK_MIN_CHARS {
        return false;
    }
    trimmed.chars().next_back().is_some_and(char::is_alphanumeric)
}

/* =============================== Run checks ============================== */

fn check_run(scan: &mut Scan<'_>, line: usize, text: &str) {
    // a run right after a newline or tab is indentation
    if regex!(r"(?:^|[^\n\t ]) {2,}").is_match(text) {
        scan.push(line, IssueKind::Spacing, MSG_MULTI_SPACE, text);
    }
    if has_space_before_punct(text) {
        scan.push(line, IssueKind::Punctuation, MSG_SPACE_BEFORE, text);
    }
    if let Some(word) = duplicated_word(text) {
        scan.push(line, IssueKind::DupWord, format!("Possible duplicated word \"{word}\""), text);
    }
    if regex!(r"[.!?]\s+[a-z]").is_match(text) {
        scan.push(line, IssueKind::Capitalization, MSG_LOWER_AFTER, text);
    }
    if has_missing_space(text) {
        scan.push(line, IssueKind::Punctuation, MSG_MISSING_SPACE, text);
    }
}

fn has_space_before_punct(text: &str) -> bool {
    regex!(r"\s+([,;:!?]|\.+)")
        .captures_iter(text)
        .any(|caps| caps[1].len() == 1)
}

/// `,Next` always counts; `.Next` only when the dot is not part of an
/// ellipsis.
fn has_missing_space(text: &str) -> bool {
    regex!(r"[,;:!?][A-Za-z]|(?:^|[^.])\.[A-Za-z]").is_match(text)
}

/// First word repeated (case-insensitively) with only whitespace between.
fn duplicated_word(text: &str) -> Option<String> {
    let words = regex!(r"[A-Za-z]+");
    let mut prev: Option<regex::Match<'_>> = None;
    for m in words.find_iter(text) {
        if let Some(p) = prev {
            let gap = &text[p.end()..m.start()];
            if !gap.is_empty()
                && gap.chars().all(char::is_whitespace)
                && p.as_str().eq_ignore_ascii_case(m.as_str())
                && is_word_edge(text, p.start(), m.end())
            {
                return Some(m.as_str().to_ascii_lowercase());
            }
        }
        prev = Some(m);
    }
    None
}

/// The ASCII-letter run must stand alone (no digits or underscores glued on).
fn is_word_edge(text: &str, start: usize, end: usize) -> bool {
    let glued = |c: char| c.is_alphanumeric() || c == '_';
    !text[..start].chars().next_back().is_some_and(glued) && !text[end..].chars().next().is_some_and(glued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{LenientParser, ParseFailure};
    use proptest::prelude::*;
    use rstest::rstest;

    fn scan(src: &str) -> Vec<Issue> {
        scan_document("ch01.xhtml", src, &LenientParser)
    }

    fn kinds(issues: &[Issue]) -> Vec<(IssueKind, &str)> {
        issues.iter().map(|i| (i.kind, i.message.as_str())).collect()
    }

    #[test]
    fn duplicated_word_is_reported_once() {
        let issues = scan("<p>the the cat sat.</p>");
        let dups: Vec<_> = issues.iter().filter(|i| i.kind == IssueKind::DupWord).collect();
        assert_eq!(dups.len(), 1);
        assert!(dups[0].message.contains("\"the\""));
    }

    #[rstest]
    #[case("The The end.", Some("the"))]
    #[case("a\n  a", Some("a"))]
    #[case("cat catalog", None)]
    #[case("x2 x2", None)]
    #[case("no repeats here", None)]
    fn duplicated_word_cases(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(duplicated_word(text).as_deref(), expected);
    }

    #[test]
    fn missing_terminal_punctuation() {
        let body = "This paragraph has quite a few words in it ok";
        assert_eq!(body.len(), 45);
        let issues = scan(&format!("<p>{body}</p>"));
        assert_eq!(kinds(&issues), [(IssueKind::Punctuation, MSG_NO_TERMINAL)]);
        assert!(scan(&format!("<p>{body}.</p>")).is_empty());
        assert!(scan(&format!("<p>{body}…</p>")).is_empty());
        assert!(scan("<p>Short and unfinished</p>").is_empty());
    }

    #[test]
    fn quote_and_balance_checks() {
        let issues = scan("<p>“a “b “c (d [e</p>");
        let found = kinds(&issues);
        assert!(found.contains(&(IssueKind::Quotes, MSG_CURLY_QUOTES)));
        assert!(found.contains(&(IssueKind::Balance, MSG_PARENS)));
        assert!(found.contains(&(IssueKind::Balance, MSG_BRACKETS)));

        let mixed = scan("<p>“Hi,” he said, \"bye\".</p>");
        assert_eq!(kinds(&mixed), [(IssueKind::Quotes, MSG_MIXED_QUOTES)]);

        let straight = scan("<p>\"Hello there.</p>");
        assert_eq!(kinds(&straight), [(IssueKind::Quotes, MSG_STRAIGHT_QUOTES)]);
    }

    #[rstest]
    #[case("a  b.", IssueKind::Spacing, MSG_MULTI_SPACE)]
    #[case("word , next.", IssueKind::Punctuation, MSG_SPACE_BEFORE)]
    #[case("Done. then more.", IssueKind::Capitalization, MSG_LOWER_AFTER)]
    #[case("Yes,sir.", IssueKind::Punctuation, MSG_MISSING_SPACE)]
    #[case("Mr.Smith came.", IssueKind::Punctuation, MSG_MISSING_SPACE)]
    fn run_checks(#[case] text: &str, #[case] kind: IssueKind, #[case] message: &str) {
        let issues = scan(&format!("<div>{text}</div>"));
        assert_eq!(kinds(&issues), [(kind, message)]);
    }

    #[test]
    fn spaces_after_inline_markup_are_flagged() {
        let issues = scan("<p>a <em>b</em>  c.</p>");
        assert_eq!(kinds(&issues), [(IssueKind::Spacing, MSG_MULTI_SPACE)]);
        assert!(scan("<div>\n      Indented text.\n    </div>").is_empty());
    }

    #[test]
    fn ellipses_are_not_flagged() {
        assert!(scan("<div>Wait ...what...really</div>").is_empty());
        assert!(scan("<div>I ...think so.</div>").is_empty());
    }

    #[test]
    fn verbatim_text_is_skipped() {
        assert!(scan("<div><code>a  b ,c</code><pre>x  y</pre></div>").is_empty());
        let issues = scan("<p>A long paragraph ending with code <code>foo  bar</code> today.</p>");
        assert!(issues.is_empty());
    }

    #[test]
    fn issues_carry_lines_and_sort() {
        let src = "<html>\n<body>\n<div>a  b.</div>\n<div>c ; d.</div>\n</body></html>";
        let issues = scan(src);
        assert_eq!(issues.iter().map(|i| i.line).collect::<Vec<_>>(), [3, 4]);
    }

    #[test]
    fn nested_text_is_deduplicated() {
        let src = "<blockquote><p>\"Open quote only here.</p></blockquote>";
        let issues = scan(src);
        // blockquote and p report the same key
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn parse_failure_is_one_issue() {
        struct Refuse;
        impl MarkupParser for Refuse {
            fn parse(&self, _: &str) -> Result<Document, ParseFailure> {
                Err(ParseFailure { reason: "broken".into() })
            }
        }
        let issues = scan_document("bad.xhtml", "<p>x</p>", &Refuse);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Parse);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].message, "Failed to parse XHTML: broken");
        assert!(issues[0].snippet.is_empty());
    }

    #[test]
    fn structure_checks_are_opt_in() {
        let src = "<html><body><p>Fine.</p></body></html>";
        assert!(scan(src).is_empty());
        let issues = scan_document_with("ch01.xhtml", src, &LenientParser, &ScanOptions { structure: true });
        assert!(!issues.is_empty());
        assert!(issues.iter().all(|i| i.kind == IssueKind::Structure));
        assert!(issues.windows(2).all(|w| w[0].key() <= w[1].key()));
    }

    #[test]
    fn long_snippets_are_capped() {
        let long = format!("<div>{}  end.</div>", "word ".repeat(40));
        let issues = scan(&long);
        assert!(issues[0].snippet.ends_with("..."));
        assert!(issues[0].snippet.chars().count() <= 80);
    }

    proptest! {
        #[test]
        fn code_contents_never_produce_issues(body in "[a-z ,.;:!?\"“”()\\[\\]]{0,60}") {
            let src = format!("<div><code>{body}</code></div>");
            prop_assert!(scan(&src).is_empty());
        }
    }
}
