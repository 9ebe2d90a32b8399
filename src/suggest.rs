//! Acceptance filter for candidate edits from an external grammar checker.
//!
//! The checker is a collaborator behind [`GrammarChecker`]; the core only sees
//! its normalized [`CandidateEdit`]s. Most candidates are expected to be
//! rejected: the filter protects proper nouns, invented vocabulary, compound
//! stylization and the author's ellipsis habits.
//!
//! Accepted edits are applied from the highest offset down so that lower
//! offsets stay valid. The audit list is returned in document order.

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::ops::Range;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::debug;

use crate::error::{Error, Result};
use crate::text::is_whitespace_only;

/// Minimum character similarity for a spelling correction to be trusted.
pub const SPELLING_SIMILARITY: f32 = 0.88;

/* ============================ Candidate model ============================ */

/// Issue category reported by the checker. Anything unrecognized lands in
/// `Unknown`, which the filter always rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Misspelling,
    Typographical,
    Whitespace,
    Grammar,
    Punctuation,
    Style,
    #[default]
    #[serde(other)]
    Unknown,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Misspelling => "misspelling",
            IssueCategory::Typographical => "typographical",
            IssueCategory::Whitespace => "whitespace",
            IssueCategory::Grammar => "grammar",
            IssueCategory::Punctuation => "punctuation",
            IssueCategory::Style => "style",
            IssueCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "misspelling" => IssueCategory::Misspelling,
            "typographical" => IssueCategory::Typographical,
            "whitespace" => IssueCategory::Whitespace,
            "grammar" => IssueCategory::Grammar,
            "punctuation" => IssueCategory::Punctuation,
            "style" => IssueCategory::Style,
            _ => IssueCategory::Unknown,
        })
    }
}

/// A proposed replacement of `length` characters at `offset` (both counted in
/// Unicode scalar values) within one text token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEdit {
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub replacements: Vec<String>,
    #[serde(default)]
    pub category: IssueCategory,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub rule_id: String,
}

/// An edit that made it into the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSuggestion {
    pub offset: usize,
    pub rule_id: String,
    pub category: IssueCategory,
    pub message: String,
    pub replacement: String,
}

/// Why a candidate was dropped. Only used for debug tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoReplacement,
    StyleRewrite,
    OutOfRange,
    Overlap,
    ProperNoun,
    Compound,
    Dissimilar,
    EllipsisText,
    AmbiguousReplacement,
    NotAggressive,
    UnknownCategory,
    EllipsisStylization,
}

/* =============================== Filtering =============================== */

/// Decide whether `edit` may replace `before` with `replacement`.
///
/// `token` is the text token as handed to the checker. Gates run in a fixed
/// order and the first failing gate rejects.
pub fn evaluate(edit: &CandidateEdit, token: &str, before: &str, aggressive: bool) -> Result<(), Rejection> {
    let Some(replacement) = edit.replacements.first().filter(|r| !r.is_empty()) else {
        return Err(Rejection::NoReplacement);
    };

    if !aggressive && edit.message.to_lowercase().contains("style") {
        return Err(Rejection::StyleRewrite);
    }

    // `Typographical` shares the spelling gates.
    match edit.category {
        IssueCategory::Misspelling | IssueCategory::Typographical => {
            spelling_gates(before, replacement)?;
        }
        IssueCategory::Whitespace => {
            if looks_like_ellipsis_style(token) {
                return Err(Rejection::EllipsisText);
            }
        }
        IssueCategory::Grammar => {
            if !aggressive && edit.replacements.len() != 1 {
                return Err(Rejection::AmbiguousReplacement);
            }
        }
        IssueCategory::Punctuation => {}
        IssueCategory::Style => {
            if !aggressive {
                return Err(Rejection::NotAggressive);
            }
            if edit.replacements.len() != 1 {
                return Err(Rejection::AmbiguousReplacement);
            }
        }
        IssueCategory::Unknown => return Err(Rejection::UnknownCategory),
    }

    Ok(())
}

fn spelling_gates(before: &str, replacement: &str) -> Result<(), Rejection> {
    if before.chars().any(char::is_uppercase) {
        return Err(Rejection::ProperNoun);
    }
    if replacement.contains('-') || replacement.trim().chars().any(char::is_whitespace) {
        return Err(Rejection::Compound);
    }

    let a = letters_and_apostrophes(before);
    let b = letters_and_apostrophes(replacement);
    if a.is_empty() || b.is_empty() {
        return Err(Rejection::Dissimilar);
    }
    if is_apostrophe_variant(&a, &b) {
        return Ok(());
    }
    if similarity(&a, &b) < SPELLING_SIMILARITY {
        return Err(Rejection::Dissimilar);
    }
    Ok(())
}

#[inline]
fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '’'
}

fn letters_and_apostrophes(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphabetic() || is_apostrophe(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// `dont` vs `don't`: same letters, apostrophe present on one side only.
fn is_apostrophe_variant(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.chars().filter(|c| !is_apostrophe(*c)).collect::<String>();
    strip(a) == strip(b) && a.chars().any(is_apostrophe) != b.chars().any(is_apostrophe)
}

/// Normalized character similarity in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

fn looks_like_ellipsis_style(text: &str) -> bool {
    text.contains("...") || text.contains('…')
}

/// Counts that must survive any accepted edit unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EllipsisSignature {
    three_dots: usize,
    unicode: usize,
    fused: usize,
    pronoun: usize,
}

impl EllipsisSignature {
    fn of(text: &str) -> Self {
        Self {
            three_dots: text.matches("...").count(),
            unicode: text.matches('…').count(),
            fused: regex!(r"(?:\.\.\.|…)[A-Za-z]").find_iter(text).count(),
            pronoun: regex!(r"\b[Ii]\s+(?:\.\.\.|…)[A-Za-z]").find_iter(text).count(),
        }
    }
}

/// Map a char-based range onto byte offsets of `text`.
fn byte_range(text: &str, offset: usize, length: usize) -> Option<Range<usize>> {
    let end_char = offset.checked_add(length)?;
    let mut start = None;
    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count == offset {
            start = Some(idx);
        }
        if count == end_char {
            return start.map(|s| s..idx);
        }
    }
    let chars = text.chars().count();
    if offset == chars {
        start = Some(text.len());
    }
    if end_char == chars {
        return start.map(|s| s..text.len());
    }
    None
}

/// Filter `candidates` for `token` and apply the accepted ones.
pub fn apply_suggestions(
    token: &str,
    candidates: &[CandidateEdit],
    aggressive: bool,
) -> (String, Vec<AppliedSuggestion>) {
    if is_whitespace_only(token) || candidates.is_empty() {
        return (token.to_string(), Vec::new());
    }

    let mut order: Vec<&CandidateEdit> = candidates.iter().collect();
    order.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut fixed = token.to_string();
    let mut applied = Vec::new();
    // Lowest char offset touched so far; edits must end at or before it.
    let mut floor = usize::MAX;

    for edit in order {
        match try_apply(&fixed, token, edit, floor, aggressive) {
            Ok(next) => {
                let replacement = edit.replacements[0].clone();
                debug!(rule = %edit.rule_id, category = %edit.category, %replacement, "applied suggestion");
                fixed = next;
                floor = edit.offset;
                applied.push(AppliedSuggestion {
                    offset: edit.offset,
                    rule_id: edit.rule_id.clone(),
                    category: edit.category,
                    message: edit.message.clone(),
                    replacement,
                });
            }
            Err(reason) => {
                debug!(rule = %edit.rule_id, category = %edit.category, ?reason, "rejected suggestion");
            }
        }
    }

    applied.reverse();
    (fixed, applied)
}

fn try_apply(
    current: &str,
    token: &str,
    edit: &CandidateEdit,
    floor: usize,
    aggressive: bool,
) -> Result<String, Rejection> {
    if !matches!(edit.replacements.first(), Some(r) if !r.is_empty()) {
        return Err(Rejection::NoReplacement);
    }
    let range = byte_range(current, edit.offset, edit.length).ok_or(Rejection::OutOfRange)?;
    if edit.offset.saturating_add(edit.length) > floor {
        return Err(Rejection::Overlap);
    }

    let before = &current[range.clone()];
    evaluate(edit, token, before, aggressive)?;

    let mut next = String::with_capacity(current.len() + edit.replacements[0].len());
    next.push_str(&current[..range.start]);
    next.push_str(&edit.replacements[0]);
    next.push_str(&current[range.end..]);

    if EllipsisSignature::of(current) != EllipsisSignature::of(&next) {
        return Err(Rejection::EllipsisStylization);
    }
    Ok(next)
}

/* ======================= Grammar checker collaborator ==================== */

/// Source of candidate edits for one text token. Errors are fatal for the run.
pub trait GrammarChecker {
    fn check(&mut self, text: &str) -> Result<Vec<CandidateEdit>>;
}

impl<F> GrammarChecker for F
where
    F: FnMut(&str) -> Result<Vec<CandidateEdit>>,
{
    fn check(&mut self, text: &str) -> Result<Vec<CandidateEdit>> {
        self(text)
    }
}

/// Long-lived child process speaking JSON lines.
///
/// Each request is `{"text": "..."}` followed by a newline; each response is
/// one line holding a JSON array of [`CandidateEdit`]s.
pub struct CommandChecker {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    text: &'a str,
}

impl CommandChecker {
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::CheckerSpawn { program: program.to_string(), source })?;
        let stdin = child.stdin.take().ok_or(Error::CheckerClosed)?;
        let stdout = child.stdout.take().ok_or(Error::CheckerClosed)?;
        debug!(%program, pid = child.id(), "started grammar checker");
        Ok(Self { program: program.to_string(), child, stdin: Some(stdin), stdout: BufReader::new(stdout) })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl GrammarChecker for CommandChecker {
    fn check(&mut self, text: &str) -> Result<Vec<CandidateEdit>> {
        let stdin = self.stdin.as_mut().ok_or(Error::CheckerClosed)?;
        let mut request = serde_json::to_string(&CheckRequest { text }).map_err(Error::CheckerProtocol)?;
        request.push('\n');
        stdin.write_all(request.as_bytes()).map_err(Error::CheckerIo)?;
        stdin.flush().map_err(Error::CheckerIo)?;

        let mut response = String::new();
        let read = self.stdout.read_line(&mut response).map_err(Error::CheckerIo)?;
        if read == 0 {
            return Err(Error::CheckerClosed);
        }
        serde_json::from_str(response.trim_end()).map_err(Error::CheckerProtocol)
    }
}

impl Drop for CommandChecker {
    fn drop(&mut self) {
        // closing stdin asks the checker to exit
        drop(self.stdin.take());
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn edit(offset: usize, length: usize, replacement: &str, category: IssueCategory) -> CandidateEdit {
        CandidateEdit {
            offset,
            length,
            replacements: vec![replacement.to_string()],
            category,
            message: String::new(),
            rule_id: format!("RULE_{offset}"),
        }
    }

    #[test]
    fn category_parsing_falls_back_to_unknown() {
        assert_eq!("Grammar".parse::<IssueCategory>().unwrap(), IssueCategory::Grammar);
        assert_eq!("duplication".parse::<IssueCategory>().unwrap(), IssueCategory::Unknown);
        let parsed: CandidateEdit = serde_json::from_str(
            r#"{"offset":0,"length":1,"replacements":["x"],"category":"uncategorized"}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, IssueCategory::Unknown);
    }

    #[test]
    fn applies_simple_misspelling() {
        let candidate = edit(4, 10, "beautiful", IssueCategory::Misspelling);
        let (out, applied) = apply_suggestions("the beautifull step", &[candidate], false);
        assert_eq!(out, "the beautiful step");
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].replacement, "beautiful");
    }

    #[rstest]
    #[case("receive")]
    #[case("Recieve")]
    #[case("anything")]
    fn capitalized_misspelling_is_rejected(#[case] replacement: &str) {
        let (out, applied) = apply_suggestions("Recieve it", &[edit(0, 7, replacement, IssueCategory::Misspelling)], true);
        assert_eq!(out, "Recieve it");
        assert!(applied.is_empty());
    }

    #[test]
    fn compound_and_invented_words_are_protected() {
        let hyphen = edit(4, 9, "face-plant", IssueCategory::Misspelling);
        let spaced = edit(4, 9, "face plant", IssueCategory::Misspelling);
        let invented = edit(4, 7, "shadow", IssueCategory::Misspelling);
        let token = "the faceplant";
        assert!(apply_suggestions(token, &[hyphen], false).1.is_empty());
        assert!(apply_suggestions(token, &[spaced], false).1.is_empty());
        assert!(apply_suggestions("the kaldrun rises", &[invented], false).1.is_empty());
    }

    #[test]
    fn apostrophe_variant_is_accepted() {
        let (out, applied) = apply_suggestions("i dont know", &[edit(2, 4, "don't", IssueCategory::Typographical)], false);
        assert_eq!(out, "i don't know");
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn typographical_takes_the_spelling_branch() {
        // a punctuation candidate with the same shape is accepted outright
        let punct = edit(0, 5, "Hello", IssueCategory::Punctuation);
        assert_eq!(apply_suggestions("hallo there", &[punct], false).0, "Hello there");
        let typo = edit(0, 5, "Hello", IssueCategory::Typographical);
        assert_eq!(apply_suggestions("Hallo there", &[typo], false).0, "Hallo there");
    }

    #[test]
    fn style_messages_need_aggressive_mode() {
        let mut candidate = edit(0, 3, "The", IssueCategory::Grammar);
        candidate.message = "Consider a different Style here".into();
        assert!(apply_suggestions("teh cat", &[candidate.clone()], false).1.is_empty());
        assert_eq!(apply_suggestions("teh cat", &[candidate], true).0, "The cat");
    }

    #[test]
    fn grammar_needs_single_replacement_unless_aggressive() {
        let mut candidate = edit(3, 2, "are", IssueCategory::Grammar);
        candidate.replacements.push("were".into());
        assert!(apply_suggestions("we is here", &[candidate.clone()], false).1.is_empty());
        assert_eq!(apply_suggestions("we is here", &[candidate], true).0, "we are here");
    }

    #[test]
    fn style_category_rules() {
        let candidate = edit(0, 4, "Very", IssueCategory::Style);
        assert!(apply_suggestions("Real good", &[candidate.clone()], false).1.is_empty());
        assert_eq!(apply_suggestions("Real good", &[candidate.clone()], true).0, "Very good");
        let mut two = candidate;
        two.replacements.push("Truly".into());
        assert!(apply_suggestions("Real good", &[two], true).1.is_empty());
    }

    #[test]
    fn whitespace_is_rejected_near_ellipses() {
        let candidate = edit(3, 0, " ", IssueCategory::Whitespace);
        assert!(apply_suggestions("...hello", &[candidate.clone()], true).1.is_empty());
        let plain = edit(3, 2, " ", IssueCategory::Whitespace);
        assert_eq!(apply_suggestions("one  two", &[plain], false).0, "one two");
    }

    #[test]
    fn unknown_category_and_empty_replacements_are_rejected() {
        let unknown = edit(0, 1, "x", IssueCategory::Unknown);
        assert!(apply_suggestions("a b", &[unknown], true).1.is_empty());
        let mut empty = edit(0, 1, "", IssueCategory::Punctuation);
        assert!(apply_suggestions("a b", &[empty.clone()], true).1.is_empty());
        empty.replacements.clear();
        assert!(apply_suggestions("a b", &[empty], true).1.is_empty());
    }

    #[test]
    fn ellipsis_stylization_veto() {
        // pronoun-ellipsis collapse
        let collapse = edit(0, 2, "I", IssueCategory::Punctuation);
        assert!(apply_suggestions("I ...think", &[collapse], true).1.is_empty());

        let split = edit(7, 0, " ", IssueCategory::Punctuation);
        assert!(apply_suggestions("Well...then", &[split], true).1.is_empty());

        let to_unicode = edit(4, 3, "…", IssueCategory::Punctuation);
        assert!(apply_suggestions("Well... then", &[to_unicode], true).1.is_empty());
    }

    #[test]
    fn edits_apply_back_to_front_and_audit_forward() {
        let token = "a teh b teh c";
        let first = edit(2, 3, "the", IssueCategory::Grammar);
        let second = edit(8, 3, "the", IssueCategory::Grammar);
        let (out, applied) = apply_suggestions(token, &[first, second], false);
        assert_eq!(out, "a the b the c");
        assert_eq!(applied.iter().map(|a| a.offset).collect::<Vec<_>>(), [2, 8]);
    }

    #[test]
    fn offsets_count_characters() {
        let token = "“Hallo,” she sad.";
        let candidate = edit(13, 3, "said", IssueCategory::Grammar);
        assert_eq!(apply_suggestions(token, &[candidate], false).0, "“Hallo,” she said.");
    }

    #[test]
    fn out_of_range_and_overlapping_edits_are_dropped() {
        let far = edit(50, 2, "x", IssueCategory::Punctuation);
        assert!(apply_suggestions("short", &[far], true).1.is_empty());

        let wide = edit(0, 4, "abcd", IssueCategory::Punctuation);
        let inner = edit(2, 2, "zz", IssueCategory::Punctuation);
        let (out, applied) = apply_suggestions("wxyz", &[wide, inner], true);
        assert_eq!(out, "wxzz");
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn similarity_ratio() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f32::EPSILON);
        assert!(similarity("recieve", "receive") >= SPELLING_SIMILARITY - 0.2);
        assert!(similarity("kaldrun", "shadow") < SPELLING_SIMILARITY);
    }

    #[test]
    fn closures_act_as_checkers() {
        let mut calls = 0;
        let mut checker = |text: &str| -> Result<Vec<CandidateEdit>> {
            calls += 1;
            Ok(vec![edit(0, text.len(), "x", IssueCategory::Punctuation)])
        };
        let found = checker.check("ab").unwrap();
        assert_eq!(found.len(), 1);
        drop(checker);
        assert_eq!(calls, 1);
    }

    #[test]
    fn missing_checker_program_is_a_spawn_error() {
        let err = CommandChecker::spawn("definitely-not-a-real-checker-binary", &[]).err().unwrap();
        assert!(matches!(err, Error::CheckerSpawn { .. }));
    }

    proptest! {
        #[test]
        fn capitalized_originals_never_pass_the_spelling_gates(
            word in "[A-Z][a-z]{1,10}",
            replacement in "\\PC{1,12}",
            aggressive in any::<bool>(),
        ) {
            let candidate = edit(0, word.chars().count(), &replacement, IssueCategory::Misspelling);
            prop_assert!(evaluate(&candidate, &word, &word, aggressive).is_err());
        }
    }
}
