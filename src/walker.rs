//! Source tree traversal.
//!
//! Walks a source root depth first, entries of a directory in file name
//! order, and produces one [`BackupTask`] per file. Directories are never
//! tasks themselves; the materializer creates them on demand.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::BackupConfig;
use crate::error::{Error, Result};
use crate::path_util::relocate;
use crate::report::Reporter;
use crate::task::BackupTask;

pub struct Walker<'a> {
    recursive: bool,
    reporter: &'a dyn Reporter,
}

impl<'a> Walker<'a> {
    pub fn new(config: &BackupConfig, reporter: &'a dyn Reporter) -> Self {
        Walker {
            recursive: config.recursive,
            reporter,
        }
    }

    /// Walks `source` and hands every task to `emit`, in discovery order.
    ///
    /// Destinations are placed under `snapshot`. With a `reference` snapshot
    /// each file is compared against its mirrored path there; without one
    /// every file is new.
    ///
    /// Returns the number of tasks emitted.
    ///
    /// # Errors
    /// Any directory that cannot be read or entry that cannot be stat'ed
    /// aborts the walk. Errors returned by `emit` abort it as well.
    pub fn walk<F>(
        &self,
        source: &Path,
        snapshot: &Path,
        reference: Option<&Path>,
        mut emit: F,
    ) -> Result<usize>
    where
        F: FnMut(BackupTask) -> Result<()>,
    {
        let mut count = 0;
        let mut entries = WalkDir::new(source).sort_by_file_name().into_iter();
        while let Some(entry) = entries.next() {
            let entry = entry?;
            let path = entry.path();
            let metadata = fs::metadata(path).map_err(|e| Error::walk(path, e))?;

            if metadata.is_dir() {
                if entry.depth() > 0 && !self.recursive {
                    self.reporter.skipped_dir(path);
                    // only real directories are descended into in the first place
                    if entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                }
                continue;
            }
            if !metadata.is_file() {
                debug!(path = %path.display(), "not a regular file, skipped");
                continue;
            }

            let dest = mirror(path, source, snapshot)?;
            let task = match reference {
                None => BackupTask::new_file(path.to_path_buf(), dest),
                Some(reference_root) => {
                    let modified = metadata.modified().map_err(|e| Error::walk(path, e))?;
                    let mirrored = mirror(path, source, reference_root)?;
                    let reference = reference_file(&mirrored).map(|time| (mirrored, time));
                    BackupTask::classify(path.to_path_buf(), modified, reference, dest)
                }
            };
            debug!(source = %task.source.display(), action = ?task.action(), "task");
            emit(task)?;
            count += 1;
        }
        Ok(count)
    }
}

fn mirror(path: &Path, from: &Path, to: &Path) -> Result<PathBuf> {
    relocate(path, from, to).ok_or_else(|| {
        Error::walk(
            path,
            io::Error::other(format!("not inside '{}'", from.display())),
        )
    })
}

/// Modification time of the reference file, if a regular file is there.
fn reference_file(path: &Path) -> Option<std::time::SystemTime> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok()
}
