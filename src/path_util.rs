use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

/// Checks if the given path exists and is accessible.
///
/// # Errors
/// Returns [`Error::Walk`] carrying the offending path if the path does not
/// exist or is not accessible.
pub fn check_path(path: &Path) -> Result<()> {
    fs::metadata(path).map_err(|e| Error::walk(path, e))?;
    Ok(())
}

/// Absolute form of `path` with symlinks resolved as far as it exists.
///
/// Components past the deepest existing ancestor are appended unchanged, so
/// a snapshot directory can be resolved before it is created.
///
/// # Errors
/// Returns an error if the current directory is unknown or an existing
/// ancestor cannot be canonicalized.
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(base) => return Ok(missing.iter().rev().fold(base, |p, name| p.join(name))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name);
                        existing = parent;
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Moves `path` from under `from` to the same relative place under `to`.
///
/// Returns `None` if `path` does not live under `from`.
pub fn relocate(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(from).ok()?;
    if rel.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(rel))
    }
}

/// Expands a leading `~` or `$HOME` to the user's home directory.
pub fn expand_home(input: &str) -> PathBuf {
    for prefix in ["~", "$HOME"] {
        if let Some(rest) = input.strip_prefix(prefix) {
            if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
                continue;
            }
            if let Some(home) = dirs::home_dir() {
                let rest = rest.trim_start_matches(['/', '\\']);
                return if rest.is_empty() { home } else { home.join(rest) };
            }
        }
    }
    PathBuf::from(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_keeps_relative_structure() {
        let moved = relocate(
            Path::new("/data/docs/sub/a.txt"),
            Path::new("/data/docs"),
            Path::new("/backup/docs/20240101_1200"),
        );
        assert_eq!(
            moved,
            Some(PathBuf::from("/backup/docs/20240101_1200/sub/a.txt"))
        );
    }

    #[test]
    fn test_relocate_only_touches_the_prefix() {
        // the root name shows up again deeper in the tree
        let moved = relocate(
            Path::new("/data/docs/docs/data/docs.txt"),
            Path::new("/data/docs"),
            Path::new("/snap"),
        );
        assert_eq!(moved, Some(PathBuf::from("/snap/docs/data/docs.txt")));
    }

    #[test]
    fn test_relocate_outside_root() {
        assert_eq!(
            relocate(Path::new("/other/a.txt"), Path::new("/data"), Path::new("/snap")),
            None
        );
        // component-wise, not string-wise
        assert_eq!(
            relocate(Path::new("/data2/a.txt"), Path::new("/data"), Path::new("/snap")),
            None
        );
    }

    #[test]
    fn test_relocate_root_itself() {
        assert_eq!(
            relocate(Path::new("/data"), Path::new("/data"), Path::new("/snap")),
            Some(PathBuf::from("/snap"))
        );
    }

    #[test]
    fn test_resolve_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        assert_eq!(resolve(dir.path()).unwrap(), base);
        assert_eq!(
            resolve(&dir.path().join("store/docs/20240101_1000")).unwrap(),
            base.join("store/docs/20240101_1000")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        fs::create_dir(base.join("real")).unwrap();
        std::os::unix::fs::symlink(base.join("real"), base.join("link")).unwrap();
        assert_eq!(
            resolve(&base.join("link/docs")).unwrap(),
            base.join("real/docs")
        );
    }

    #[test]
    fn test_check_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = check_path(&missing).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/docs"), home.join("docs"));
            assert_eq!(expand_home("$HOME/docs"), home.join("docs"));
        }
    }
}
