use std::io;

use crate::sanitize::PathRejection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entry path '{path}': {reason}")]
    InvalidPath { path: String, reason: PathRejection },

    #[error("entry '{0}' already exists")]
    DuplicateEntry(String),

    #[error("archive sink was disconnected after a failed write or discard")]
    Disconnected,

    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
