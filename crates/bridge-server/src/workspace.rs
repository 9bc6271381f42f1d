use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory for one invocation, removed when dropped.
///
/// Removal failures are logged and swallowed.
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn acquire(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("invocation-")
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Created workspace");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed workspace"),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to clean workspace directory")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("ws");

        let workspace = Workspace::acquire(&nested).unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.starts_with(&nested));
        fs::write(path.join("notes.md"), "scratch").unwrap();

        drop(workspace);
        assert!(!path.exists());
        assert!(nested.exists());
    }

    #[test]
    fn test_concurrent_workspaces_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(root.path()).unwrap();
        let b = Workspace::acquire(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_already_removed_directory_is_tolerated() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(root.path()).unwrap();
        fs::remove_dir_all(workspace.path()).unwrap();
        drop(workspace);
    }

    #[test]
    fn test_root_that_is_a_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("occupied");
        fs::write(&file, "x").unwrap();
        assert!(Workspace::acquire(&file).is_err());
    }
}
