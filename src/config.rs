use std::path::{Path, PathBuf};

/// Settings for one backup invocation, fixed before the first source root
/// is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Directory holding one backup root per source.
    pub storage_root: PathBuf,
    /// Descend into subdirectories of a source root.
    pub recursive: bool,
    pub verbose: bool,
    /// Decide and report everything, write nothing.
    pub dry_run: bool,
}

impl BackupConfig {
    /// Recursive, quiet, real run into `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        BackupConfig {
            storage_root: storage_root.into(),
            recursive: true,
            verbose: false,
            dry_run: false,
        }
    }

    /// Where snapshots of `source` live: `<storage_root>/<source name>`.
    ///
    /// Returns `None` for sources without a final name component, such as
    /// `/` or `..`.
    pub fn backup_root(&self, source: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| self.storage_root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_root_uses_base_name() {
        let config = BackupConfig::new("/mnt/backup");
        assert_eq!(
            config.backup_root(Path::new("/home/me/Documents")),
            Some(PathBuf::from("/mnt/backup/Documents"))
        );
        assert_eq!(
            config.backup_root(Path::new("/home/me/Documents/")),
            Some(PathBuf::from("/mnt/backup/Documents"))
        );
    }

    #[test]
    fn test_backup_root_without_name() {
        let config = BackupConfig::new("/mnt/backup");
        assert_eq!(config.backup_root(Path::new("/")), None);
        assert_eq!(config.backup_root(Path::new("..")), None);
    }

    #[test]
    fn test_defaults() {
        let config = BackupConfig::new("/b");
        assert!(config.recursive);
        assert!(!config.verbose);
        assert!(!config.dry_run);
    }
}
