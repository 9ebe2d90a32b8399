// src/lib.rs
//
// proofhtml: conservative proofreading for XHTML book chapters.
//
// Fix pipeline (text tokens only, never inside tags or verbatim containers):
//   tokenize -> scope tracking -> phrase rules -> checker suggestions
//   -> mechanical rules -> paragraph quote balance -> reassemble
//
// Scanner (read-only): lenient element tree -> paragraph and text-run checks
//   (+ optional chapter skeleton checks) -> deduplicated, sorted issue list.
//
// Paragraph normalization rewrites `<p/>` and glued `</p><p>` markup only.

#[macro_use]
mod macros;

pub mod error;
pub mod fix;
pub mod mechanical;
pub mod normalize;
pub mod phrase;
pub mod quotes;
pub mod report;
pub mod scan;
pub mod scope;
pub mod structure;
pub mod suggest;
pub mod text;
pub mod tokenize;
pub mod tree;

pub use error::{Error, Result};
pub use fix::{fix_document, FixOptions, FixOutcome, FixRecord};
pub use normalize::{normalize_paragraphs, NormalizeOutcome};
pub use scan::{scan_document, scan_document_with, Issue, IssueKind, ScanOptions};
pub use suggest::{CandidateEdit, CommandChecker, GrammarChecker, IssueCategory};
pub use tree::{LenientParser, MarkupParser};
