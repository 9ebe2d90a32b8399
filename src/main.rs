// src/main.rs
//
// proofhtml: scan XHTML chapters for proofreading issues, optionally fixing
// the safe ones in place first.
//
// - PATHS may be files or directories; directories are walked recursively for
//   `*.xhtml` files. Files are processed in sorted order.
// - With --fix, text nodes get the mechanical punctuation rules and paragraph
//   quote repair. --phrase-fix adds the phrase rules; --checker adds filtered
//   suggestions from an external grammar checker speaking JSON lines.
// - --normalize expands `<p/>` and splits glued `</p><p>` markup; it may be
//   used with or without --fix.
// - --structure adds the chapter skeleton checks to the report.
// - With --check, changes are computed and listed but no document is written.
// - The issue report always reflects the (possibly fixed) text.
//
// Logging goes to stderr and is controlled by RUST_LOG (default: warn).

use clap::{ArgAction, ArgGroup, Parser};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use proofhtml::report::{render_issue_report, render_phrase_report, render_suggestion_report, write_report};
use proofhtml::{
    fix_document, normalize_paragraphs, scan_document_with, CommandChecker, Error, FixOptions, FixRecord,
    GrammarChecker, Issue, LenientParser, Result, ScanOptions,
};

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("rewrite").args(["fix", "normalize"]).multiple(true)))]
struct Cli {
    /// XHTML files or directories to scan
    #[arg(required = true, value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Apply conservative mechanical fixes in place before scanning
    #[arg(long, action = ArgAction::SetTrue)]
    fix: bool,

    /// Also apply the high-confidence phrase rules
    #[arg(long = "phrase-fix", action = ArgAction::SetTrue, requires = "fix")]
    phrase_fix: bool,

    /// Grammar checker program to consult for each text node
    #[arg(long, value_name = "PROGRAM", requires = "fix")]
    checker: Option<String>,

    /// Argument passed to the checker program (repeatable)
    #[arg(long = "checker-arg", value_name = "ARG", allow_hyphen_values = true, requires = "checker")]
    checker_args: Vec<String>,

    /// Accept more grammar and style suggestions from the checker
    #[arg(long, action = ArgAction::SetTrue, requires = "checker")]
    aggressive: bool,

    /// Expand `<p/>` and split glued `</p><p>` paragraphs in place
    #[arg(long, action = ArgAction::SetTrue)]
    normalize: bool,

    /// Also check the chapter skeleton (prolog, title, h1, final hr)
    #[arg(long, action = ArgAction::SetTrue)]
    structure: bool,

    /// Compute changes and list the files that would change, without writing them
    #[arg(long, action = ArgAction::SetTrue, requires = "rewrite")]
    check: bool,

    /// Issue report
    #[arg(long, value_name = "FILE", default_value = "proofread_report.md")]
    out: PathBuf,

    /// Phrase-fix report, written with --phrase-fix
    #[arg(long = "phrase-report", value_name = "FILE", default_value = "phrase_report.md")]
    phrase_report: PathBuf,

    /// Checker-fix report, written with --checker
    #[arg(long = "suggestion-report", value_name = "FILE", default_value = "suggestion_report.md")]
    suggestion_report: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run aborted");
            eprintln!("proofhtml: {err}");
            ExitCode::FAILURE
        }
    }
}

/* ================================ Batch run ============================== */

#[derive(Default)]
struct Totals {
    files: usize,
    changed_tokens: usize,
    normalized_files: usize,
    would_change: Vec<String>,
    issues: Vec<Issue>,
    phrase_changes: Vec<FixRecord>,
    suggestion_changes: Vec<FixRecord>,
}

fn run(cli: &Cli) -> Result<()> {
    let files = discover(&cli.paths);
    let options = FixOptions { phrase_rules: cli.phrase_fix, aggressive: cli.aggressive };
    let scan_options = ScanOptions { structure: cli.structure };
    let mut checker = match &cli.checker {
        Some(program) => Some(CommandChecker::spawn(program, &cli.checker_args)?),
        None => None,
    };

    let mut totals = Totals { files: files.len(), ..Totals::default() };
    for path in &files {
        let location = path.display().to_string();
        let mut text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut changed = false;

        if cli.normalize {
            let outcome = normalize_paragraphs(&text);
            if outcome.is_changed() {
                info!(file = %location, expanded = outcome.expanded, split = outcome.split, "normalized");
                totals.normalized_files += 1;
                changed = true;
                text = outcome.text;
            }
        }

        if cli.fix {
            let checker = checker.as_mut().map(|c| c as &mut dyn GrammarChecker);
            let outcome = fix_document(&location, &text, &options, checker)?;
            info!(file = %location, changed = outcome.changed_tokens, "fixed");
            changed |= outcome.is_changed();
            totals.changed_tokens += outcome.changed_tokens;
            totals.phrase_changes.extend(outcome.phrase_changes);
            totals.suggestion_changes.extend(outcome.suggestion_changes);
            text = outcome.text;
        }

        if changed {
            if cli.check {
                totals.would_change.push(location.clone());
            } else {
                fs::write(path, &text).map_err(|e| Error::io(path, e))?;
            }
        }

        let found = scan_document_with(&location, &text, &LenientParser, &scan_options);
        info!(file = %location, issues = found.len(), "scanned");
        totals.issues.extend(found);
    }
    drop(checker);

    totals.issues.sort_by(|a, b| a.key().cmp(&b.key()));
    write_report(&cli.out, &render_issue_report(&totals.issues))?;
    if cli.phrase_fix {
        write_report(&cli.phrase_report, &render_phrase_report(&totals.phrase_changes))?;
    }
    if cli.checker.is_some() {
        write_report(&cli.suggestion_report, &render_suggestion_report(&totals.suggestion_changes))?;
    }

    print_summary(cli, &totals);
    Ok(())
}

fn print_summary(cli: &Cli, totals: &Totals) {
    if cli.check {
        if cli.fix {
            println!("Would fix {} text segments across {} files", totals.changed_tokens, totals.files);
        }
        if cli.normalize {
            println!("Would normalize paragraph markup in {} files", totals.normalized_files);
        }
        println!("Would change {} of {} files", totals.would_change.len(), totals.files);
        for location in &totals.would_change {
            println!("would change: {location}");
        }
    } else {
        if cli.fix {
            println!("Applied fixes to {} text segments across {} files", totals.changed_tokens, totals.files);
        }
        if cli.normalize {
            println!("Normalized paragraph markup in {} files", totals.normalized_files);
        }
    }
    println!(
        "Wrote report: {} ({} issues across {} files)",
        cli.out.display(),
        totals.issues.len(),
        totals.files
    );
    if cli.phrase_fix {
        println!(
            "Wrote phrase report: {} ({} changes)",
            cli.phrase_report.display(),
            totals.phrase_changes.len()
        );
    }
    if cli.checker.is_some() {
        println!(
            "Wrote suggestion report: {} ({} changes)",
            cli.suggestion_report.display(),
            totals.suggestion_changes.len()
        );
    }
}

/* ================================ Discovery ============================== */

fn is_xhtml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("xhtml"))
}

/// Expand directories into their `*.xhtml` files. Named files are kept as
/// given, whatever their extension. The result is sorted and deduplicated.
fn discover(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut files);
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    files
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), %err, "skipping unreadable directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(t) if t.is_dir() => walk(&path, out),
            Ok(_) if is_xhtml(&path) => out.push(path),
            Ok(_) => {}
            Err(err) => warn!(path = %path.display(), %err, "skipping unreadable entry"),
        }
    }
}
