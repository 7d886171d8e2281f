use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("working directory missing or not writable: {0}")]
    WorkingDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Handle to the pipeline's working directory.
///
/// Files are written by writing a temp file in the same directory and
/// renaming, so a reader never observes a partial `input.xml` or
/// `output.csv`.
#[derive(Debug, Clone)]
pub struct WorkingDir {
    dir: PathBuf,
}

impl WorkingDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Ensure the directory exists and is writable; create if missing.
    pub fn ensure(&self) -> Result<(), PersistError> {
        if self.dir.exists() {
            let meta =
                fs::metadata(&self.dir).map_err(|e| PersistError::WorkingDir(e.to_string()))?;
            if !meta.is_dir() {
                return Err(PersistError::WorkingDir("path is not a directory".into()));
            }
        } else {
            fs::create_dir_all(&self.dir).map_err(|e| PersistError::WorkingDir(e.to_string()))?;
        }
        // Writability probe: try creating a temp file.
        NamedTempFile::new_in(&self.dir).map_err(|e| PersistError::WorkingDir(e.to_string()))?;
        Ok(())
    }

    /// Atomically write `content` to `{dir}/{filename}`, replacing any
    /// previous run's file.
    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.ensure()?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
