//! User-facing output.
//!
//! The backup core never prints directly. Everything a user sees goes through
//! a [`Reporter`], so the CLI can print to stdout while tests record lines.
//! The materializer worker and the walker call the same reporter from
//! different threads.

use std::fmt::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::error_chain;
use crate::materializer::{MaterializeFailure, MaterializeSummary};
use crate::task::Action;

/// Receives progress of a backup run.
pub trait Reporter: Send + Sync {
    /// No earlier snapshot exists under `backup_root`.
    fn first_time(&self, backup_root: &Path);

    /// About to back up `source` into `snapshot`, linking against
    /// `reference` when there is one.
    fn plan(&self, source: &Path, snapshot: &Path, reference: Option<&Path>);

    /// A directory was left out because recursion is disabled.
    fn skipped_dir(&self, path: &Path);

    /// A file was copied or linked (or would have been, under dry-run).
    fn action(&self, action: Action, from: &Path, to: &Path);

    /// A source root is done.
    fn finished(&self, elapsed: Duration, summary: &MaterializeSummary);
}

/// Prints the classic report lines to stdout; failures go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter {
    /// Print a line per copied or linked file.
    pub verbose: bool,
}

impl StdoutReporter {
    pub fn new(verbose: bool) -> Self {
        StdoutReporter { verbose }
    }
}

impl Reporter for StdoutReporter {
    fn first_time(&self, backup_root: &Path) {
        println!("{}", first_time_line(backup_root));
    }

    fn plan(&self, source: &Path, snapshot: &Path, reference: Option<&Path>) {
        println!("{}", plan_lines(source, snapshot, reference));
    }

    fn skipped_dir(&self, path: &Path) {
        println!("skipping dir: {}", path.display());
    }

    fn action(&self, action: Action, from: &Path, to: &Path) {
        if self.verbose {
            println!("{}", action_line(action, from, to));
        }
    }

    fn finished(&self, elapsed: Duration, summary: &MaterializeSummary) {
        println!("{}", elapsed_line(elapsed));
        if summary.failures.is_empty() {
            return;
        }
        eprintln!(
            "{} file(s) could not be backed up:",
            summary.failures.len()
        );
        for failure in &summary.failures {
            eprintln!("{}", failure_line(failure));
        }
    }
}

/// Keeps every report line in memory, including per-file actions.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<String>>,
}

impl MemoryReporter {
    /// Lines reported so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the `C:`/`H:` action lines.
    pub fn action_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with("C:FROM: ") || l.starts_with("H:FROM: "))
            .collect()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl Reporter for MemoryReporter {
    fn first_time(&self, backup_root: &Path) {
        self.push(first_time_line(backup_root));
    }

    fn plan(&self, source: &Path, snapshot: &Path, reference: Option<&Path>) {
        self.push(plan_lines(source, snapshot, reference));
    }

    fn skipped_dir(&self, path: &Path) {
        self.push(format!("skipping dir: {}", path.display()));
    }

    fn action(&self, action: Action, from: &Path, to: &Path) {
        self.push(action_line(action, from, to));
    }

    fn finished(&self, elapsed: Duration, _summary: &MaterializeSummary) {
        self.push(elapsed_line(elapsed));
    }
}

pub fn first_time_line(backup_root: &Path) -> String {
    format!("It's first time to backup: {}", backup_root.display())
}

pub fn plan_lines(source: &Path, snapshot: &Path, reference: Option<&Path>) -> String {
    let mut s = format!(
        "Backup\n    FROM: {}\n    TO  : {}",
        source.display(),
        snapshot.display()
    );
    if let Some(reference) = reference {
        let _ = write!(s, "\n   (REF : {})", reference.display());
    }
    s
}

pub fn failure_line(failure: &MaterializeFailure) -> String {
    format!(
        "  {}: {}",
        failure.source.display(),
        error_chain(&failure.reason)
    )
}

pub fn action_line(action: Action, from: &Path, to: &Path) -> String {
    format!("{action}:FROM: {} -> TO: {}", from.display(), to.display())
}

pub fn elapsed_line(elapsed: Duration) -> String {
    format!("{:.6}sec", elapsed.as_secs_f64())
}
