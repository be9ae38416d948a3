//! The materializer worker.
//!
//! Receives [`BackupTask`]s one at a time and turns each into a copy or a
//! hardlink inside the new snapshot. A task that fails is written off and
//! recorded in the [`MaterializeSummary`]; it never stops the worker.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, warn};

use crate::config::BackupConfig;
use crate::error::{MaterializeError, error_chain};
use crate::report::Reporter;
use crate::task::{Action, BackupTask};

/// Messages on the walker to materializer channel.
#[derive(Debug)]
pub enum Handoff {
    Task(BackupTask),
    /// No more tasks for this source root.
    Finish,
}

/// A task the worker had to give up on.
#[derive(Debug)]
pub struct MaterializeFailure {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub reason: MaterializeError,
}

/// What the worker did for one source root.
#[derive(Debug, Default)]
pub struct MaterializeSummary {
    /// Files copied.
    pub copied: usize,
    /// Files hardlinked.
    pub linked: usize,
    /// Bytes written by copies.
    pub bytes_copied: u64,
    pub failures: Vec<MaterializeFailure>,
}

impl MaterializeSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, task: BackupTask, outcome: Result<u64, MaterializeError>) {
        match outcome {
            Ok(bytes) => match task.action() {
                Action::Copy => {
                    self.copied += 1;
                    self.bytes_copied += bytes;
                }
                Action::HardLink => self.linked += 1,
            },
            Err(reason) => {
                warn!(
                    source = %task.source.display(),
                    error = %error_chain(&reason),
                    "file skipped"
                );
                self.failures.push(MaterializeFailure {
                    source: task.source,
                    dest: task.dest,
                    reason,
                });
            }
        }
    }
}

pub struct Materializer {
    dry_run: bool,
    reporter: Arc<dyn Reporter>,
}

impl Materializer {
    pub fn new(config: &BackupConfig, reporter: Arc<dyn Reporter>) -> Self {
        Materializer {
            dry_run: config.dry_run,
            reporter,
        }
    }

    /// Drains `rx` until [`Handoff::Finish`] arrives or the sender goes away.
    ///
    /// Must run on a thread that may block, e.g. `spawn_blocking`.
    pub fn run(self, mut rx: Receiver<Handoff>) -> MaterializeSummary {
        let mut summary = MaterializeSummary::default();
        while let Some(Handoff::Task(task)) = rx.blocking_recv() {
            let outcome = self.materialize(&task);
            summary.record(task, outcome);
        }
        debug!(
            copied = summary.copied,
            linked = summary.linked,
            failed = summary.failures.len(),
            "materializer finished"
        );
        summary
    }

    /// Copies or links one file and returns the number of bytes copied.
    ///
    /// # Errors
    /// Returns the first I/O failure for this task. Nothing is retried.
    pub fn materialize(&self, task: &BackupTask) -> Result<u64, MaterializeError> {
        if !self.dry_run {
            if let Some(parent) = task.dest.parent() {
                fs::create_dir_all(parent).map_err(|source| MaterializeError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let action = task.action();
        let bytes = match (action, &task.reference) {
            (Action::HardLink, Some(reference)) => {
                self.hard_link(reference, &task.dest)?;
                0
            }
            _ => self.copy_file(&task.source, &task.dest)?,
        };
        self.reporter.action(action, task.origin(), &task.dest);
        Ok(bytes)
    }

    /// Plain byte copy. Timestamps and permissions are not carried over.
    fn copy_file(&self, source: &Path, dest: &Path) -> Result<u64, MaterializeError> {
        if self.dry_run {
            return Ok(0);
        }
        let file = File::open(source).map_err(|source_err| MaterializeError::Open {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let mut reader = BufReader::new(file);
        let file = File::create(dest).map_err(|source| MaterializeError::Create {
            path: dest.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        let copy_err = |source| MaterializeError::Copy {
            path: dest.to_path_buf(),
            source,
        };
        let bytes = io::copy(&mut reader, &mut writer).map_err(copy_err)?;
        writer.flush().map_err(copy_err)?;
        Ok(bytes)
    }

    /// Replaces whatever is at `dest` with a hardlink to `reference`.
    fn hard_link(&self, reference: &Path, dest: &Path) -> Result<(), MaterializeError> {
        if self.dry_run {
            return Ok(());
        }
        fs::metadata(reference).map_err(|source| MaterializeError::Reference {
            path: reference.to_path_buf(),
            source,
        })?;
        match fs::remove_file(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(MaterializeError::Remove {
                    path: dest.to_path_buf(),
                    source,
                });
            }
        }
        fs::hard_link(reference, dest).map_err(|source| MaterializeError::Link {
            path: dest.to_path_buf(),
            source,
        })
    }
}
