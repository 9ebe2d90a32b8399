//! Markdown report rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fix::FixRecord;
use crate::scan::Issue;

fn link(location: &str, line: usize) -> String {
    let rel = location.replace('\\', "/");
    format!("[{rel}]({rel}#L{line})")
}

/// Snippets go inside `_..._`; keep them on one line.
fn inline(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

pub fn render_issue_report(issues: &[Issue]) -> String {
    let mut by_location: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
    for issue in issues {
        by_location.entry(&issue.location).or_default().push(issue);
    }

    let mut out = String::new();
    out.push_str("# Proofreading report\n\n");
    let _ = writeln!(out, "Total issues flagged: **{}**\n", issues.len());
    out.push_str(
        "> Notes: This is a heuristic scan, so expect false positives \
         (especially for stylized dialogue, ellipses, and names).\n",
    );

    for (location, group) in by_location {
        let _ = writeln!(out, "\n## {}\n", location.replace('\\', "/"));
        for issue in group {
            let _ = write!(out, "- {} **{}**: {}", link(location, issue.line), issue.kind, issue.message);
            if issue.snippet.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, " | _{}_", inline(&issue.snippet));
            }
        }
    }
    out
}

pub fn render_phrase_report(changes: &[FixRecord]) -> String {
    let mut out = String::from("# Phrase fixes\n\n");
    if changes.is_empty() {
        out.push_str("No phrase fixes were applied.\n");
        return out;
    }
    let _ = writeln!(out, "Total changes applied: **{}**\n", changes.len());
    out.push_str("> Notes: These are rule-based, high-confidence phrasing fixes.\n\n");
    for ch in changes {
        let _ = writeln!(
            out,
            "- {} `{}`: _{}_ → _{}_",
            link(&ch.location, ch.line),
            ch.rule,
            inline(&ch.before),
            inline(&ch.after)
        );
    }
    out
}

pub fn render_suggestion_report(changes: &[FixRecord]) -> String {
    let mut out = String::from("# Grammar checker fixes\n\n");
    if changes.is_empty() {
        out.push_str("No grammar checker fixes were applied.\n");
        return out;
    }
    let _ = writeln!(out, "Total changes applied: **{}**\n", changes.len());
    out.push_str("> Notes: Only a conservative subset of checker suggestions was applied automatically.\n\n");
    for ch in changes {
        let category = ch.category.map(|c| c.as_str()).unwrap_or("unknown");
        let _ = writeln!(
            out,
            "- {} **{}** `{}`: {} | _{}_ → _{}_",
            link(&ch.location, ch.line),
            category,
            ch.rule,
            ch.message,
            inline(&ch.before),
            inline(&ch.after)
        );
    }
    out
}

pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}
