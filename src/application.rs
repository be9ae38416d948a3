//! Persistent settings for this application.
//!
//! An optional TOML file supplies defaults for the source list, the storage
//! root and recursion. Command line flags and environment variables take
//! precedence over the file; the result is one immutable [`BackupConfig`] plus
//! the list of sources to back up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commands::RunArgs;
use crate::config::BackupConfig;
use crate::constants::{CONFIG_NAME, PKG_NAME, SOURCE_DELIMITER};
use crate::error::{Error, Result};
use crate::path_util::expand_home;

/// Contents of the config file. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory snapshots are stored under. `~` is expanded.
    pub storage: Option<String>,
    /// Source roots to back up. `~` is expanded.
    pub sources: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: Option<bool>,
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns [`Error::ConfigRead`] if the file exists but cannot be read,
    /// and [`Error::ConfigParse`] if it is not valid TOML for [`Settings`].
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&toml_str).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Source roots to back up: the command line (or `BACKUPDIR`) if it
    /// names any, the config file otherwise. Empty entries are dropped.
    pub fn sources(&self, cli: &[String]) -> Vec<PathBuf> {
        let given: Vec<PathBuf> = split_sources(cli).map(PathBuf::from).collect();
        if !given.is_empty() {
            return given;
        }
        split_sources(&self.sources).map(expand_home).collect()
    }

    /// Merges the command line over the file into a [`BackupConfig`].
    ///
    /// # Errors
    /// Returns [`Error::NoStorageRoot`] if no storage root is configured
    /// and the platform has no local data directory.
    pub fn backup_config(&self, args: &RunArgs) -> Result<BackupConfig> {
        let storage_root = match (&args.storage, &self.storage) {
            (Some(storage), _) => storage.clone(),
            (None, Some(storage)) => expand_home(storage),
            (None, None) => default_storage().ok_or(Error::NoStorageRoot)?,
        };
        Ok(BackupConfig {
            storage_root,
            recursive: !args.no_recursive && self.recursive.unwrap_or(true),
            verbose: args.verbose,
            dry_run: args.dry_run,
        })
    }
}

/// Flattens entries that may themselves hold `;`-separated lists.
fn split_sources(entries: &[String]) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .flat_map(|entry| entry.split(SOURCE_DELIMITER))
        .filter(|s| !s.is_empty())
}

/// Storage root used when none is configured: `snaplink` under the platform's
/// local data directory, away from anything a user would back up.
pub fn default_storage() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(PKG_NAME))
}

/// Returns the absolute path to the default configuration file, if the
/// platform has a configuration directory.
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_NAME))
}

/// Returns the configuration directory for the application, platform-specific.
#[cfg(not(target_os = "macos"))]
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(PKG_NAME))
}

/// Returns the configuration directory for the application, platform-specific.
#[cfg(target_os = "macos")]
fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|dir| dir.join(".config").join(PKG_NAME))
}
