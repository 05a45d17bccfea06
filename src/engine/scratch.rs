//! Call-scoped scratch files
//!
//! Each engine call gets its own uniquely named directory. Every intermediate
//! artifact is a [`ScratchFile`] inside it, deleted on drop unless it is
//! promoted to its final destination. Dropping the [`ScratchSpace`] removes
//! the directory and anything left in it, so no exit path leaks files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};

use crate::error::CompressionError;

const SCRATCH_PREFIX: &str = "pixelsqueeze-";

/// Uniquely named directory owned by one engine call
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create the directory under `root`, or the system temp dir
    pub fn new(root: Option<&Path>) -> Result<Self, CompressionError> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// New empty file named `<label>*.<extension>` inside the space
    pub fn file(&self, label: &str, extension: &str) -> Result<ScratchFile, CompressionError> {
        let suffix = format!(".{}", extension);
        let file = Builder::new()
            .prefix(label)
            .suffix(&suffix)
            .tempfile_in(self.dir.path())?;
        Ok(ScratchFile { file })
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> Result<(), CompressionError> {
        self.dir.close().map_err(CompressionError::from)
    }
}

/// Intermediate file, deleted exactly once on drop unless promoted
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open handle for collaborators that write into the file directly
    pub fn handle(&self) -> Result<fs::File, CompressionError> {
        Ok(self.file.as_file().try_clone()?)
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), CompressionError> {
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    /// Current size on disk
    pub fn len(&self) -> Result<u64, CompressionError> {
        Ok(fs::metadata(self.file.path())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CompressionError> {
        Ok(self.len()? == 0)
    }

    pub fn read(&self) -> Result<Vec<u8>, CompressionError> {
        Ok(fs::read(self.file.path())?)
    }

    /// Move the file to `dest`, returning the final path
    ///
    /// Uses an atomic rename; across filesystems it falls back to a copy and
    /// the scratch copy is still deleted.
    pub fn promote(self, dest: &Path) -> Result<PathBuf, CompressionError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match self.file.persist(dest) {
            Ok(_) => Ok(dest.to_path_buf()),
            Err(err) => {
                tracing::debug!(
                    dest = %dest.display(),
                    error = %err.error,
                    "Rename failed, copying scratch file instead"
                );
                let leftover = err.file;
                fs::copy(leftover.path(), dest)?;
                Ok(dest.to_path_buf())
            }
        }
    }
}
