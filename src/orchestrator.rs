//! Runs backups, one source root after another.
//!
//! For each root the orchestrator picks the reference snapshot, creates the
//! new snapshot directory and then runs two participants side by side: the
//! walker on the calling thread and the materializer on the runtime's
//! blocking pool. They are joined by a channel with a single slot, so the
//! walker can never get more than one task ahead of the disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::BackupConfig;
use crate::error::{Error, Result};
use crate::materializer::{Handoff, MaterializeSummary, Materializer};
use crate::path_util;
use crate::report::Reporter;
use crate::snapshot::{SnapshotStamp, latest_snapshot};
use crate::walker::Walker;

/// Outcome of backing up one source root.
#[derive(Debug)]
pub struct RootSummary {
    pub source: PathBuf,
    /// The snapshot written (or planned, under dry-run).
    pub snapshot: PathBuf,
    /// The snapshot compared against, `None` on a first-time backup.
    pub reference: Option<PathBuf>,
    pub elapsed: Duration,
    pub materialized: MaterializeSummary,
}

/// Outcome of a whole invocation.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub roots: Vec<RootSummary>,
}

impl RunSummary {
    /// Number of files that could not be backed up, over all roots.
    pub fn failed(&self) -> usize {
        self.roots
            .iter()
            .map(|r| r.materialized.failures.len())
            .sum()
    }
}

pub struct Orchestrator {
    config: BackupConfig,
    reporter: Arc<dyn Reporter>,
    runtime: Runtime,
}

impl Orchestrator {
    /// # Errors
    /// Returns [`Error::Runtime`] if the worker runtime cannot be started.
    pub fn new(config: BackupConfig, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("snaplink-worker")
            .build()
            .map_err(Error::Runtime)?;
        Ok(Orchestrator {
            config,
            reporter,
            runtime,
        })
    }

    /// Backs up every source in order, all into snapshots named after the
    /// current minute.
    ///
    /// # Errors
    /// The first fatal error ends the run; later sources are not attempted.
    pub fn run(&self, sources: &[PathBuf]) -> Result<RunSummary> {
        self.run_at(sources, SnapshotStamp::now())
    }

    /// Like [`Orchestrator::run`], with an explicit snapshot stamp.
    ///
    /// # Errors
    /// The first fatal error ends the run; later sources are not attempted.
    pub fn run_at(&self, sources: &[PathBuf], stamp: SnapshotStamp) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for source in sources {
            summary.roots.push(self.backup_root(source, stamp)?);
        }
        Ok(summary)
    }

    /// Backs up a single source root into snapshot `stamp`.
    ///
    /// # Errors
    /// Fails if the source cannot be walked, if its backups would be stored
    /// inside it, if the snapshot already exists, or if its directory cannot
    /// be created.
    pub fn backup_root(&self, source: &Path, stamp: SnapshotStamp) -> Result<RootSummary> {
        let backup_root = self
            .config
            .backup_root(source)
            .ok_or_else(|| Error::InvalidSource {
                path: source.to_path_buf(),
            })?;
        path_util::check_path(source)?;
        ensure_outside(source, &backup_root)?;
        info!(source = %source.display(), "backing up");

        let reference =
            latest_snapshot(&backup_root)?.map(|last| backup_root.join(last.to_string()));
        let snapshot = backup_root.join(stamp.to_string());

        match &reference {
            None => {
                self.reporter.first_time(&backup_root);
                self.reporter.plan(source, &snapshot, None);
            }
            Some(reference) => self.reporter.plan(source, &snapshot, Some(reference)),
        }

        // the newest snapshot may be the one we are about to write
        if snapshot.exists() {
            return Err(Error::SnapshotExists { path: snapshot });
        }
        if !self.config.dry_run {
            fs::create_dir_all(&snapshot).map_err(|e| Error::CreateSnapshot {
                path: snapshot.clone(),
                source: e,
            })?;
        }

        let start = Instant::now();
        let materialized = self.walk_and_materialize(source, &snapshot, reference.as_deref())?;
        let elapsed = start.elapsed();

        self.reporter.finished(elapsed, &materialized);
        info!(
            source = %source.display(),
            copied = materialized.copied,
            linked = materialized.linked,
            failed = materialized.failures.len(),
            "done"
        );
        Ok(RootSummary {
            source: source.to_path_buf(),
            snapshot,
            reference,
            elapsed,
            materialized,
        })
    }

    fn walk_and_materialize(
        &self,
        source: &Path,
        snapshot: &Path,
        reference: Option<&Path>,
    ) -> Result<MaterializeSummary> {
        let (tx, rx) = mpsc::channel(1);
        let materializer = Materializer::new(&self.config, self.reporter.clone());
        let worker = self.runtime.spawn_blocking(move || materializer.run(rx));

        let walker = Walker::new(&self.config, self.reporter.as_ref());
        let walked = walker.walk(source, snapshot, reference, |task| {
            tx.blocking_send(Handoff::Task(task))
                .map_err(|_| Error::WorkerLost)
        });
        debug!(source = %source.display(), ok = walked.is_ok(), "walk finished, draining");

        // the worker may already be gone, joining below reports that
        let _ = tx.blocking_send(Handoff::Finish);
        drop(tx);
        let materialized = self
            .runtime
            .block_on(worker)
            .map_err(|_| Error::WorkerLost)?;

        walked?;
        Ok(materialized)
    }
}

/// Snapshots written inside the source would be walked into the next ones.
fn ensure_outside(source: &Path, backup_root: &Path) -> Result<()> {
    let resolved = path_util::resolve(source).map_err(|e| Error::walk(source, e))?;
    let target = path_util::resolve(backup_root).map_err(|e| Error::walk(backup_root, e))?;
    if target.starts_with(&resolved) {
        return Err(Error::BackupInsideSource {
            path: source.to_path_buf(),
            backup_root: backup_root.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use tempfile::tempdir;

    const FIRST: SnapshotStamp = SnapshotStamp {
        day: 20240101,
        minute: 900,
    };

    fn orchestrator(storage: &Path) -> (Orchestrator, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::default());
        let o = Orchestrator::new(BackupConfig::new(storage), reporter.clone()).unwrap();
        (o, reporter)
    }

    #[test]
    fn test_first_backup_reports_and_creates_snapshot() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();
        let storage = dir.path().join("storage");

        let (o, reporter) = orchestrator(&storage);
        let root = o.backup_root(&source, FIRST).unwrap();

        assert_eq!(root.snapshot, storage.join("docs/20240101_0900"));
        assert_eq!(root.reference, None);
        assert_eq!(root.materialized.copied, 1);
        let lines = reporter.lines();
        assert_eq!(
            lines[0],
            format!("It's first time to backup: {}", storage.join("docs").display())
        );
        assert!(lines[1].starts_with("Backup\n    FROM: "));
        assert!(lines.last().unwrap().ends_with("sec"));
    }

    #[test]
    fn test_same_minute_snapshot_is_refused() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        let (o, _) = orchestrator(&dir.path().join("storage"));
        o.backup_root(&source, FIRST).unwrap();
        let err = o.backup_root(&source, FIRST).unwrap_err();
        assert!(matches!(err, Error::SnapshotExists { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("storage/docs/20240101_0900/a.txt")).unwrap(),
            "a"
        );
    }

    #[test]
    fn test_missing_source_stops_the_run() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        fs::create_dir_all(&good).unwrap();
        let storage = dir.path().join("storage");

        let (o, _) = orchestrator(&storage);
        let sources = vec![dir.path().join("missing"), good];
        let err = o.run_at(&sources, FIRST).unwrap_err();
        assert!(matches!(err, Error::Walk { .. }));
        assert!(!storage.join("good").exists());
        assert!(!storage.join("missing").exists());
    }

    #[test]
    fn test_storage_at_source_parent_is_refused() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        let source = home.join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        // <home>/<docs> is the source itself
        let (o, reporter) = orchestrator(&home);
        let err = o.backup_root(&source, FIRST).unwrap_err();
        assert!(matches!(err, Error::BackupInsideSource { .. }));
        assert!(reporter.lines().is_empty());
        assert_eq!(fs::read_dir(&source).unwrap().count(), 1);
    }

    #[test]
    fn test_storage_inside_source_is_refused() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("docs");
        fs::create_dir_all(&source).unwrap();

        let (o, _) = orchestrator(&source.join("backups"));
        let err = o.backup_root(&source, FIRST).unwrap_err();
        assert!(matches!(err, Error::BackupInsideSource { .. }));
        assert!(!source.join("backups").exists());
    }

    #[test]
    fn test_sibling_storage_with_shared_prefix_is_fine() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        // "docs-backup" starts with "docs" as a string, not as a path
        let (o, _) = orchestrator(&dir.path().join("docs-backup"));
        let root = o.backup_root(&source, FIRST).unwrap();
        assert_eq!(root.materialized.copied, 1);
    }

    #[test]
    fn test_source_without_name_is_rejected() {
        let dir = tempdir().unwrap();
        let (o, _) = orchestrator(dir.path());
        let err = o.backup_root(Path::new("/"), FIRST).unwrap_err();
        assert!(matches!(err, Error::InvalidSource { .. }));
    }

    #[test]
    fn test_roots_are_backed_up_in_order() {
        let dir = tempdir().unwrap();
        let one = dir.path().join("one");
        let two = dir.path().join("two");
        for root in [&one, &two] {
            fs::create_dir_all(root).unwrap();
            fs::write(root.join("f.txt"), "f").unwrap();
        }
        let storage = dir.path().join("storage");

        let (o, _) = orchestrator(&storage);
        let summary = o.run_at(&[one.clone(), two.clone()], FIRST).unwrap();
        assert_eq!(summary.roots.len(), 2);
        assert_eq!(summary.roots[0].source, one);
        assert_eq!(summary.roots[1].source, two);
        assert_eq!(summary.failed(), 0);
        assert!(storage.join("one/20240101_0900/f.txt").is_file());
        assert!(storage.join("two/20240101_0900/f.txt").is_file());
    }
}
