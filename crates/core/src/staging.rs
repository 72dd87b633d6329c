//! Staging files for writes
//!
//! Every write gets its own temporary directory holding a single temporary
//! file. The staging file is moved, never shared: first to the writer, then
//! to the commit task, which removes it.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, TempPath};

use crate::error::Result;

const DIR_PREFIX: &str = "bw-staging-";
const FILE_PREFIX: &str = "blob";

/// A temporary file inside its own temporary directory
///
/// Dropping it removes both (file first, the field order guarantees it);
/// [`cleanup`](Self::cleanup) does the same and logs failures.
#[derive(Debug)]
pub struct StagingFile {
    file: TempPath,
    dir: TempDir,
}

impl StagingFile {
    /// Create a staging file under `root`, or the system temp dir when `None`
    ///
    /// Returns the open handle for writing alongside the staging file.
    pub fn create(root: Option<&Path>) -> Result<(Self, File)> {
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix(DIR_PREFIX).tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix(DIR_PREFIX).tempdir()?,
        };
        let (handle, file) = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .tempfile_in(dir.path())?
            .into_parts();

        Ok((Self { file, dir }, handle))
    }

    /// Path of the staged data
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Directory holding the staged data
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the file, then the directory
    ///
    /// Failures are logged and otherwise ignored.
    pub fn cleanup(self) {
        let Self { file, dir } = self;
        let file_path: PathBuf = file.to_path_buf();
        if let Err(e) = file.close() {
            tracing::warn!(path = %file_path.display(), error = %e, "Failed to remove staging file");
        }
        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            tracing::warn!(path = %dir_path.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_create_under_root() {
        let root = tempfile::TempDir::new().unwrap();
        let nested = root.path().join("staging");
        let (staging, mut handle) = StagingFile::create(Some(&nested)).unwrap();

        assert!(staging.dir().starts_with(&nested));
        assert_eq!(staging.path().parent(), Some(staging.dir()));

        handle.write_all(b"data").unwrap();
        drop(handle);
        assert_eq!(std::fs::read(staging.path()).unwrap(), b"data");
    }

    #[test]
    fn test_cleanup_removes_file_and_dir() {
        let root = tempfile::TempDir::new().unwrap();
        let (staging, handle) = StagingFile::create(Some(root.path())).unwrap();
        drop(handle);

        let file = staging.path().to_path_buf();
        let dir = staging.dir().to_path_buf();
        staging.cleanup();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_removes_file_and_dir() {
        let root = tempfile::TempDir::new().unwrap();
        let (staging, handle) = StagingFile::create(Some(root.path())).unwrap();
        let dir = staging.dir().to_path_buf();
        drop(handle);
        drop(staging);
        assert!(!dir.exists());
    }

    #[test]
    fn test_cleanup_tolerates_already_removed_file() {
        let root = tempfile::TempDir::new().unwrap();
        let (staging, handle) = StagingFile::create(Some(root.path())).unwrap();
        drop(handle);
        std::fs::remove_file(staging.path()).unwrap();

        let dir = staging.dir().to_path_buf();
        staging.cleanup();
        assert!(!dir.exists());
    }

    #[test]
    fn test_each_staging_file_is_fresh() {
        let root = tempfile::TempDir::new().unwrap();
        let (a, _ha) = StagingFile::create(Some(root.path())).unwrap();
        let (b, _hb) = StagingFile::create(Some(root.path())).unwrap();
        assert_ne!(a.dir(), b.dir());
    }
}
