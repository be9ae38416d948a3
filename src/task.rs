//! Backup tasks and the copy-or-link decision.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// One file to place into the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTask {
    /// File being backed up.
    pub source: PathBuf,
    /// Same file in the reference snapshot, if there is one.
    pub reference: Option<PathBuf>,
    /// Where the file lands in the new snapshot.
    pub dest: PathBuf,
    /// Source is newer than `reference`.
    pub changed: bool,
}

/// What the materializer does with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Write a fresh copy of the source bytes.
    Copy,
    /// Hardlink the destination to the reference file.
    HardLink,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Copy => write!(f, "C"),
            Action::HardLink => write!(f, "H"),
        }
    }
}

impl BackupTask {
    /// A task with nothing to link against. Always copies.
    pub fn new_file(source: PathBuf, dest: PathBuf) -> Self {
        BackupTask {
            source,
            reference: None,
            dest,
            changed: false,
        }
    }

    /// Builds a task for `source`, classifying it against the file found at
    /// the mirrored reference path.
    ///
    /// `reference` is the reference path and its modification time, or
    /// `None` when nothing exists there.
    pub fn classify(
        source: PathBuf,
        source_modified: SystemTime,
        reference: Option<(PathBuf, SystemTime)>,
        dest: PathBuf,
    ) -> Self {
        match reference {
            Some((reference, reference_modified)) => BackupTask {
                source,
                reference: Some(reference),
                dest,
                changed: is_newer(source_modified, reference_modified),
            },
            None => BackupTask::new_file(source, dest),
        }
    }

    pub fn action(&self) -> Action {
        match self.reference {
            Some(_) if !self.changed => Action::HardLink,
            _ => Action::Copy,
        }
    }

    /// Path shown as the origin of the action: the reference for links, the
    /// source for copies.
    pub fn origin(&self) -> &Path {
        match (self.action(), &self.reference) {
            (Action::HardLink, Some(reference)) => reference,
            _ => &self.source,
        }
    }
}

/// True iff `source` was modified strictly after `reference`, both taken as
/// local time.
pub fn is_newer(source: SystemTime, reference: SystemTime) -> bool {
    DateTime::<Local>::from(source) > DateTime::<Local>::from(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_is_newer_is_strict() {
        assert!(is_newer(at(1_700_000_001), at(1_700_000_000)));
        assert!(!is_newer(at(1_700_000_000), at(1_700_000_000)));
        assert!(!is_newer(at(1_600_000_000), at(1_700_000_000)));
    }

    #[test]
    fn test_classify_without_reference_copies() {
        let task = BackupTask::classify(
            PathBuf::from("/src/a.txt"),
            at(10),
            None,
            PathBuf::from("/dst/a.txt"),
        );
        assert_eq!(task.reference, None);
        assert!(!task.changed);
        assert_eq!(task.action(), Action::Copy);
        assert_eq!(task.origin(), Path::new("/src/a.txt"));
    }

    #[test]
    fn test_classify_unchanged_links() {
        let task = BackupTask::classify(
            PathBuf::from("/src/a.txt"),
            at(10),
            Some((PathBuf::from("/ref/a.txt"), at(10))),
            PathBuf::from("/dst/a.txt"),
        );
        assert!(!task.changed);
        assert_eq!(task.action(), Action::HardLink);
        assert_eq!(task.origin(), Path::new("/ref/a.txt"));
    }

    #[test]
    fn test_classify_older_source_still_links() {
        let task = BackupTask::classify(
            PathBuf::from("/src/a.txt"),
            at(5),
            Some((PathBuf::from("/ref/a.txt"), at(10))),
            PathBuf::from("/dst/a.txt"),
        );
        assert_eq!(task.action(), Action::HardLink);
    }

    #[test]
    fn test_classify_newer_source_copies() {
        let task = BackupTask::classify(
            PathBuf::from("/src/a.txt"),
            at(11),
            Some((PathBuf::from("/ref/a.txt"), at(10))),
            PathBuf::from("/dst/a.txt"),
        );
        assert!(task.changed);
        assert_eq!(task.reference.as_deref(), Some(Path::new("/ref/a.txt")));
        assert_eq!(task.action(), Action::Copy);
        assert_eq!(task.origin(), Path::new("/src/a.txt"));
    }
}
