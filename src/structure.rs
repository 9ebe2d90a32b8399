//! Chapter skeleton checks.
//!
//! A chapter is expected to open with the UTF-8 XML prolog, carry one
//! `<title>` and one `<h1>` with the same text, and end its body with an
//! `<hr/>`. These checks are opt-in; fragments and front matter fail most of
//! them.

use crate::scan::{Issue, IssueKind};
use crate::text::{collapse_ws, snippet};
use crate::tree::{Document, Element};

pub const MSG_PROLOG: &str = "Missing or non-standard XML prolog";
pub const MSG_ROOT: &str = "Root element is not <html>";
pub const MSG_NO_HEAD: &str = "Missing <head>";
pub const MSG_NO_BODY: &str = "Missing <body>";
pub const MSG_FINAL_HR: &str = "Body does not end with <hr/>";
pub const MSG_TITLE_MISMATCH: &str = "<title> does not match <h1>";

/// Check the document skeleton. `source` is the raw text the tree was built
/// from; only its first line is read.
pub fn check_structure(location: &str, source: &str, doc: &Document) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut push = |line: usize, message: String, text: &str| {
        issues.push(Issue {
            location: location.to_string(),
            line: line.max(1),
            kind: IssueKind::Structure,
            message,
            snippet: snippet(text),
        });
    };

    let first_line = source.lines().next().unwrap_or("");
    if !has_xml_prolog(first_line) {
        push(1, MSG_PROLOG.into(), first_line);
    }

    let Some(root) = doc.root().filter(|el| el.name == "html") else {
        push(1, MSG_ROOT.into(), "");
        return issues;
    };

    let head = root.child("head");
    match head {
        None => push(root.line, MSG_NO_HEAD.into(), ""),
        Some(head) => {
            let titles = head.child_elements().filter(|el| el.name == "title").count();
            if titles != 1 {
                push(head.line, format!("Expected one <title> in <head>, found {titles}"), "");
            }
        }
    }

    let Some(body) = root.child("body") else {
        push(root.line, MSG_NO_BODY.into(), "");
        return issues;
    };

    let h1s: Vec<&Element> = body.child_elements().filter(|el| el.name == "h1").collect();
    if h1s.len() != 1 {
        push(body.line, format!("Expected one <h1> in <body>, found {}", h1s.len()), "");
    }

    if !body.child_elements().last().is_some_and(|el| el.name == "hr") {
        push(body.line, MSG_FINAL_HR.into(), "");
    }

    if let (Some(title), Some(h1)) = (head.and_then(|h| h.child("title")), h1s.first()) {
        let (title_text, h1_text) = (collapse_ws(&title.full_text()), collapse_ws(&h1.full_text()));
        if !title_text.is_empty() && !h1_text.is_empty() && title_text != h1_text {
            push(h1.line, MSG_TITLE_MISMATCH.into(), &format!("{title_text} / {h1_text}"));
        }
    }

    issues
}

/// `<?xml version="1.0" encoding="utf-8"?>`, either quote style.
fn has_xml_prolog(line: &str) -> bool {
    regex!(r#"^\x{FEFF}?<\?xml\s+version=["']1\.0["']\s+encoding=["'](?i:utf-8)["']\s*\?>\s*$"#).is_match(line)
}
