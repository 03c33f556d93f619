use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const DEFAULT_PREFIX: &str = "zipline-";
const DEFAULT_SUFFIX: &str = ".zip";

/// Where scratch sinks are created and how they are named.
#[derive(Clone, Debug)]
pub struct ScratchDir {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ScratchDir {
    pub fn new() -> Self {
        Self {
            dir: std::env::temp_dir(),
            prefix: DEFAULT_PREFIX.to_owned(),
            suffix: DEFAULT_SUFFIX.to_owned(),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a fresh, exclusively owned scratch file.
    ///
    /// The name is random and the file is created with `O_EXCL`, so two
    /// concurrent invocations never share a sink.
    pub fn acquire(&self) -> Result<ScratchSink> {
        let file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&self.suffix)
            .tempfile_in(&self.dir)
            .map_err(|e| Error::Create {
                dir: self.dir.clone(),
                source: e,
            })?;

        let path = file.path().to_path_buf();
        debug!(path = %path.display(), "acquired scratch sink");

        Ok(ScratchSink {
            path,
            file: Some(file),
        })
    }
}

/// A scratch file that is removed exactly once, whichever way its owner exits.
///
/// Removal happens on [`ScratchSink::release`] or on drop, whichever comes
/// first. Later calls are no-ops.
#[derive(Debug)]
pub struct ScratchSink {
    path: PathBuf,
    file: Option<NamedTempFile>,
}

impl ScratchSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    pub fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .map(NamedTempFile::as_file)
            .ok_or_else(|| Error::Released(self.path.clone()))
    }

    /// An independent handle on the open scratch file.
    ///
    /// The handle shares the file cursor with the sink; it stays usable after
    /// release on platforms that allow unlinking open files, but its contents
    /// are gone once it is dropped.
    pub fn handle(&self) -> Result<File> {
        self.file()?.try_clone().map_err(|e| Error::Open {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Drop everything written so far, keeping the file itself.
    pub fn truncate(&self) -> Result<()> {
        self.file()?.set_len(0).map_err(|e| Error::Truncate {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        match file.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "released scratch sink");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Remove {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

impl Drop for ScratchSink {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(%err, "scratch sink cleanup failed");
        }
    }
}
