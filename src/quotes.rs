//! Single-character quote repair for a closed paragraph scope.
//!
//! Only an unambiguous imbalance is repaired: one style of quotes in the
//! paragraph and a difference of exactly one. The quote goes at the very
//! start or very end of the paragraph's meaningful text, inside any
//! indentation or trailing whitespace of the target token.

use crate::scope::ParagraphScope;
use crate::text::{append_before_trailing_ws, prepend_after_indent};
use crate::tokenize::Token;

const STRAIGHT: char = '"';
const OPEN_CURLY: char = '“';
const CLOSE_CURLY: char = '”';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Start,
    End,
}

/// A quote inserted into one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteCorrection {
    pub index: usize,
    pub quote: char,
    pub placement: Placement,
}

/// Decide where, if anywhere, a single quote belongs.
pub fn plan_correction(scope: &ParagraphScope) -> Option<QuoteCorrection> {
    let (first, last) = (scope.first_index?, scope.last_index?);

    let uses_straight = scope.straight_quotes > 0;
    let uses_curly = scope.open_curly + scope.close_curly > 0;
    if uses_straight && uses_curly {
        return None;
    }

    let lead = scope.start_sample.trim_start();
    let trail = scope.end_sample.trim_end();
    let at_end = |quote| QuoteCorrection { index: last, quote, placement: Placement::End };
    let at_start = |quote| QuoteCorrection { index: first, quote, placement: Placement::Start };

    if uses_straight {
        if scope.straight_quotes % 2 == 0 {
            return None;
        }
        let starts = lead.starts_with(STRAIGHT);
        let ends = trail.ends_with(STRAIGHT);
        return Some(if ends && !starts { at_start(STRAIGHT) } else { at_end(STRAIGHT) });
    }

    let diff = scope.open_curly as isize - scope.close_curly as isize;
    match diff {
        1 if !trail.ends_with(CLOSE_CURLY) => Some(at_end(CLOSE_CURLY)),
        -1 if !lead.starts_with(OPEN_CURLY) => Some(at_start(OPEN_CURLY)),
        _ => None,
    }
}

/// Repair `scope`'s quotes in `tokens`. Returns the correction made, if any.
pub fn correct_quotes(scope: &ParagraphScope, tokens: &mut [Token]) -> Option<QuoteCorrection> {
    let correction = plan_correction(scope)?;
    let token = tokens.get_mut(correction.index)?;
    let current = token.text()?;

    let mut buf = [0u8; 4];
    let quote = correction.quote.encode_utf8(&mut buf);
    let updated = match correction.placement {
        Placement::Start => prepend_after_indent(current, quote),
        Placement::End => append_before_trailing_ws(current, quote),
    };
    token.set_text(updated).then_some(correction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeTracker;
    use crate::tokenize::{reassemble, tokenize};

    /// Run the tracker over `src` and correct the first paragraph that closes.
    fn correct(src: &str) -> (String, Option<QuoteCorrection>) {
        let mut tokens = tokenize(src);
        let mut tracker = ScopeTracker::new();
        let mut result = None;
        for i in 0..tokens.len() {
            if let Some(text) = tokens[i].text() {
                let text = text.to_string();
                tracker.record_text(i, &text);
            } else if let Some(tag) = tokens[i].tag().cloned() {
                if let Some(scope) = tracker.on_tag(&tag) {
                    result = correct_quotes(&scope, &mut tokens);
                    break;
                }
            }
        }
        (reassemble(&tokens), result)
    }

    #[test]
    fn appends_closing_straight_quote() {
        let (out, fix) = correct("<p>\"Come here, <em>now</em>.</p>");
        assert_eq!(out, "<p>\"Come here, <em>now</em>.\"</p>");
        assert_eq!(fix.unwrap().placement, Placement::End);
    }

    #[test]
    fn prepends_opening_straight_quote_after_indent() {
        let (out, fix) = correct("<p>\n    Come here.\"\n</p>");
        assert_eq!(out, "<p>\n    \"Come here.\"\n</p>");
        assert_eq!(fix.unwrap().placement, Placement::Start);
    }

    #[test]
    fn ambiguous_straight_quote_defaults_to_end() {
        let (out, _) = correct("<p>He said \"no and left</p>");
        assert_eq!(out, "<p>He said \"no and left\"</p>");
    }

    #[test]
    fn even_straight_quotes_are_left_alone() {
        let src = "<p>\"Yes,\" she said.</p>";
        assert_eq!(correct(src), (src.to_string(), None));
    }

    #[test]
    fn appends_closing_curly_quote_before_trailing_ws() {
        let (out, fix) = correct("<p>“One,” he said, “two  \n</p>");
        assert_eq!(out, "<p>“One,” he said, “two”  \n</p>");
        assert_eq!(fix.unwrap().quote, CLOSE_CURLY);
    }

    #[test]
    fn prepends_opening_curly_quote() {
        let (out, _) = correct("<p>Wait,” she said.</p>");
        assert_eq!(out, "<p>“Wait,” she said.</p>");
    }

    #[test]
    fn large_curly_imbalance_is_left_alone() {
        let src = "<p>“a “b “c</p>";
        assert_eq!(correct(src), (src.to_string(), None));
    }

    #[test]
    fn mixed_styles_are_never_corrected() {
        let src = "<p>“Well,\" he said</p>";
        assert_eq!(correct(src), (src.to_string(), None));
    }

    #[test]
    fn curly_already_closed_at_end_is_left_alone() {
        let src = "<p>“a “b”</p>";
        assert_eq!(correct(src), (src.to_string(), None));
    }

    #[test]
    fn empty_paragraph_is_left_alone() {
        let src = "<p>   </p>";
        assert_eq!(correct(src), (src.to_string(), None));
    }
}
