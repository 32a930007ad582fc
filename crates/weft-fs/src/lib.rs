//! Atomic filesystem primitives for the artifact cache.
//!
//! Every durable cache file is written to a temporary path in the destination
//! directory and renamed into place, so a concurrent or interrupted run never
//! observes a half-written file at its final path.

pub use error::{Error, Result};

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

mod error;

/// Write `content` to `path` atomically (temp file + rename).
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut staged = StagedFile::create(path)?;
    staged.write_all(content).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    staged.commit()?;
    Ok(())
}

/// Create every missing directory component of `dir`.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::Write {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// An incrementally-written file that only appears at its destination once
/// [`commit`](StagedFile::commit) succeeds. Dropping it without committing
/// removes the temporary file.
pub struct StagedFile {
    temp: NamedTempFile,
    dest: PathBuf,
}

impl StagedFile {
    /// Open a staging file in the destination's directory, creating the
    /// directory if needed.
    pub fn create(dest: impl Into<PathBuf>) -> Result<Self> {
        let dest = dest.into();
        let parent = dest.parent().ok_or_else(|| Error::Write {
            path: dest.clone(),
            source: std::io::Error::other("destination has no parent directory"),
        })?;
        ensure_dir(parent)?;
        let temp = NamedTempFile::new_in(parent).map_err(|e| Error::Write {
            path: dest.clone(),
            source: e,
        })?;
        Ok(Self { temp, dest })
    }

    /// Path of the in-progress temporary file.
    pub fn staging_path(&self) -> &Path {
        self.temp.path()
    }

    /// Destination the file will land at on commit.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Flush and rename into the destination path.
    pub fn commit(self) -> Result<PathBuf> {
        let Self { temp, dest } = self;
        temp.as_file().sync_all().map_err(|e| Error::Write {
            path: dest.clone(),
            source: e,
        })?;
        temp.persist(&dest).map_err(|e| Error::Rename {
            path: dest.clone(),
            source: e.error,
        })?;
        Ok(dest)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.temp.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.temp.as_file_mut().flush()
    }
}

// Archive writers need to seek back and patch up their central directory.
impl Seek for StagedFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.temp.as_file_mut().seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_lands_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        atomic_write(&path, b"hello world").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn atomic_write_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/cache.bin");
        atomic_write(&path, b"nested").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");
    }

    #[test]
    fn staged_file_invisible_until_commit() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.jar");

        let mut staged = StagedFile::create(&dest).unwrap();
        staged.write_all(b"partial").unwrap();
        assert!(!dest.exists());

        staged.commit().unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"partial");
    }

    #[test]
    fn dropped_staging_file_is_cleaned_up() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.jar");

        let staging_path = {
            let mut staged = StagedFile::create(&dest).unwrap();
            staged.write_all(b"abandoned").unwrap();
            staged.staging_path().to_path_buf()
        };

        assert!(!dest.exists());
        assert!(!staging_path.exists());
    }
}
