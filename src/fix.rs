//! Per-document fix pipeline.
//!
//! Tokens are visited once, in order. Markup drives the scope tracker; text
//! outside skip regions goes through phrase rules, checker suggestions and
//! the mechanical rules, in that order, and is then recorded into the open
//! paragraph scope. When a paragraph closes its quote balance is repaired.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::mechanical::fix_text;
use crate::phrase::apply_phrase_rules;
use crate::quotes::correct_quotes;
use crate::scope::ScopeTracker;
use crate::suggest::{apply_suggestions, GrammarChecker, IssueCategory};
use crate::text::{is_meaningful, snippet};
use crate::tokenize::{reassemble, tokenize, Token};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixOptions {
    /// Run the phrase rule engine.
    pub phrase_rules: bool,
    /// Relax the acceptance gates for grammar and style suggestions.
    pub aggressive: bool,
}

/// One audited rewrite of a text token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixRecord {
    pub location: String,
    pub line: usize,
    /// Phrase rule id, or the checker's rule id.
    pub rule: String,
    /// Checker category; `None` for phrase rules.
    pub category: Option<IssueCategory>,
    pub message: String,
    pub before: String,
    pub after: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixOutcome {
    pub text: String,
    /// Distinct text tokens changed by any stage.
    pub changed_tokens: usize,
    pub phrase_changes: Vec<FixRecord>,
    pub suggestion_changes: Vec<FixRecord>,
}

impl FixOutcome {
    pub fn is_changed(&self) -> bool {
        self.changed_tokens > 0
    }
}

/// Fix one document. `location` only labels audit records.
///
/// Fails only when the grammar checker does; document content never causes
/// an error.
pub fn fix_document(
    location: &str,
    source: &str,
    options: &FixOptions,
    checker: Option<&mut dyn GrammarChecker>,
) -> Result<FixOutcome> {
    let mut pass = FixPass {
        location,
        options,
        checker,
        tokens: tokenize(source),
        tracker: ScopeTracker::new(),
        changed: BTreeSet::new(),
        phrase_changes: Vec::new(),
        suggestion_changes: Vec::new(),
    };

    for index in 0..pass.tokens.len() {
        pass.visit(index)?;
    }

    let text = if pass.changed.is_empty() { source.to_string() } else { reassemble(&pass.tokens) };
    debug!(location, changed = pass.changed.len(), "fixed document");
    Ok(FixOutcome {
        text,
        changed_tokens: pass.changed.len(),
        phrase_changes: pass.phrase_changes,
        suggestion_changes: pass.suggestion_changes,
    })
}

/// Mutable state of one document pass.
struct FixPass<'a, 'c> {
    location: &'a str,
    options: &'a FixOptions,
    checker: Option<&'c mut dyn GrammarChecker>,
    tokens: Vec<Token>,
    tracker: ScopeTracker,
    changed: BTreeSet<usize>,
    phrase_changes: Vec<FixRecord>,
    suggestion_changes: Vec<FixRecord>,
}

impl FixPass<'_, '_> {
    fn visit(&mut self, index: usize) -> Result<()> {
        match &self.tokens[index] {
            Token::Markup { tag: Some(tag), .. } => {
                let tag = tag.clone();
                if let Some(scope) = self.tracker.on_tag(&tag) {
                    if let Some(fix) = correct_quotes(&scope, &mut self.tokens) {
                        debug!(location = self.location, tag = %scope.tag, quote = %fix.quote, "balanced paragraph quotes");
                        self.changed.insert(fix.index);
                    }
                }
                Ok(())
            }
            Token::Markup { tag: None, .. } => Ok(()),
            Token::Text { .. } if self.tracker.in_skip_region() => Ok(()),
            Token::Text { content, line } => {
                let (original, line) = (content.clone(), *line);
                let fixed = self.fix_text_token(&original, line)?;
                self.tracker.record_text(index, &fixed);
                if fixed != original {
                    debug!(location = self.location, line, "changed text token");
                    self.tokens[index].set_text(fixed);
                    self.changed.insert(index);
                }
                Ok(())
            }
        }
    }

    fn fix_text_token(&mut self, original: &str, line: usize) -> Result<String> {
        let mut current = original.to_string();

        if self.options.phrase_rules {
            let (next, fired) = apply_phrase_rules(&current);
            if next != current {
                let (before, after) = (snippet(&current), snippet(&next));
                for rule in fired {
                    self.phrase_changes.push(FixRecord {
                        location: self.location.to_string(),
                        line,
                        rule: rule.to_string(),
                        category: None,
                        message: String::new(),
                        before: before.clone(),
                        after: after.clone(),
                    });
                }
                current = next;
            }
        }

        if let Some(checker) = self.checker.as_deref_mut() {
            if is_meaningful(&current) {
                let candidates = checker.check(&current)?;
                let (next, applied) = apply_suggestions(&current, &candidates, self.options.aggressive);
                if next != current {
                    let (before, after) = (snippet(&current), snippet(&next));
                    for edit in applied {
                        self.suggestion_changes.push(FixRecord {
                            location: self.location.to_string(),
                            line,
                            rule: edit.rule_id,
                            category: Some(edit.category),
                            message: edit.message,
                            before: before.clone(),
                            after: after.clone(),
                        });
                    }
                    current = next;
                }
            }
        }

        Ok(fix_text(&current))
    }
}
