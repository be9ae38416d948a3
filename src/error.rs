//! Error types for snaplink.
//!
//! `Error` covers everything that stops a run: configuration problems and
//! failures while walking a source root. Per-file copy and link failures are
//! not `Error`s; the materializer records them as [`MaterializeError`] in its
//! summary and keeps going.

use std::fmt::Write;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Unified result type for fallible operations in snaplink.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file '{}'", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config file '{}'", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no storage root configured and the platform has no local data directory")]
    NoStorageRoot,

    #[error("source '{}' has no directory name to back up under", path.display())]
    InvalidSource { path: PathBuf },

    #[error(
        "backups of '{}' would land inside it, at '{}'",
        path.display(),
        backup_root.display()
    )]
    BackupInsideSource { path: PathBuf, backup_root: PathBuf },

    #[error("failed to walk '{}'", path.display())]
    Walk { path: PathBuf, source: io::Error },

    #[error("failed to scan snapshots in '{}'", path.display())]
    SnapshotScan { path: PathBuf, source: io::Error },

    #[error("snapshot '{}' already exists", path.display())]
    SnapshotExists { path: PathBuf },

    #[error("failed to create snapshot directory '{}'", path.display())]
    CreateSnapshot { path: PathBuf, source: io::Error },

    #[error("failed to start the backup runtime")]
    Runtime(#[source] io::Error),

    #[error("materializer worker stopped unexpectedly")]
    WorkerLost,
}

impl Error {
    pub(crate) fn walk(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Walk {
            path: path.into(),
            source,
        }
    }
}

/// Renders `err` followed by its chain of causes, joined by `": "`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut line = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        let _ = write!(line, ": {err}");
        cause = err.source();
    }
    line
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Error::Walk { path, source }
    }
}

/// Why a single task could not be materialized.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("cannot create directory '{}'", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("cannot open '{}'", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot create '{}'", path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("cannot copy into '{}'", path.display())]
    Copy { path: PathBuf, source: io::Error },

    #[error("reference '{}' is gone", path.display())]
    Reference { path: PathBuf, source: io::Error },

    #[error("cannot replace '{}'", path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("cannot link '{}'", path.display())]
    Link { path: PathBuf, source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_leaves_cause_to_the_chain() {
        let err = Error::walk("/nope", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "failed to walk '/nope'");
        assert_eq!(error_chain(&err), "failed to walk '/nope': gone");

        let err = MaterializeError::Open {
            path: PathBuf::from("/src/a.txt"),
            source: io::Error::other("denied"),
        };
        assert_eq!(error_chain(&err), "cannot open '/src/a.txt': denied");
    }

    #[test]
    fn test_anyhow_prints_os_error_once() {
        let err = anyhow::Error::new(Error::walk("/nope", io::Error::other("gone")))
            .context("Backup aborted");
        assert_eq!(format!("{err:#}"), "Backup aborted: failed to walk '/nope': gone");
    }
}
