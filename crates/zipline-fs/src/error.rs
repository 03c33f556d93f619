use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create scratch file in '{dir}': {source}")]
    Create { dir: PathBuf, source: std::io::Error },

    #[error("failed to remove scratch file '{path}': {source}")]
    Remove { path: PathBuf, source: std::io::Error },

    #[error("failed to open handle on scratch file '{path}': {source}")]
    Open { path: PathBuf, source: std::io::Error },

    #[error("failed to truncate scratch file '{path}': {source}")]
    Truncate { path: PathBuf, source: std::io::Error },

    #[error("scratch file '{0}' has already been released")]
    Released(PathBuf),

    #[error("failed to read scratch data: {source}")]
    Read { source: std::io::Error },

    #[error("failed to write output: {source}")]
    Write { source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
