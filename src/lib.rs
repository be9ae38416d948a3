//! snaplink: incremental snapshot backups built on hardlinks.
//!
//! Every run writes a complete snapshot directory per source root. Files that
//! did not change since the previous snapshot are hardlinked to it, everything
//! else is copied, so unchanged data is stored once no matter how many
//! snapshots refer to it.
//!
//! The pieces, leaves first:
//! - [`snapshot`]: snapshot names and finding the latest one
//! - [`task`]: backup tasks and the copy-or-link decision
//! - [`walker`]: turns a source tree into tasks
//! - [`materializer`]: the worker that copies and links
//! - [`orchestrator`]: wires the walker to the worker, root by root
//!
//! The remaining modules make up the `snaplink` command line tool.

pub mod application;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod materializer;
pub mod orchestrator;
pub mod path_util;
pub mod report;
pub mod snapshot;
pub mod sysexits;
pub mod task;
pub mod walker;

pub use config::BackupConfig;
pub use error::{Error, MaterializeError, Result};
pub use orchestrator::{Orchestrator, RootSummary, RunSummary};
pub use report::{MemoryReporter, Reporter, StdoutReporter};
pub use snapshot::{SnapshotStamp, latest_snapshot};
pub use task::{Action, BackupTask};
