use crate::error::{Error, Result};
use crate::options::PathPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathRejection {
    #[error("path is empty")]
    Empty,
    #[error("path contains a NUL byte")]
    NulByte,
    #[error("path is not valid UTF-8")]
    NotUtf8,
    #[error("path is absolute")]
    Absolute,
    #[error("path traverses to a parent directory")]
    ParentTraversal,
    #[error("path names a directory")]
    DirectoryName,
}

/// Check a raw entry path and return it as a zip entry name.
pub fn validate_entry_path(raw: &[u8], policy: PathPolicy) -> Result<&str> {
    let reject = |reason| Error::InvalidPath {
        path: String::from_utf8_lossy(raw).into_owned(),
        reason,
    };

    if raw.is_empty() {
        return Err(reject(PathRejection::Empty));
    }
    if raw.contains(&0) {
        return Err(reject(PathRejection::NulByte));
    }
    let name = std::str::from_utf8(raw).map_err(|_| reject(PathRejection::NotUtf8))?;

    if policy == PathPolicy::Strict {
        if is_absolute(name) {
            return Err(reject(PathRejection::Absolute));
        }
        if name.split(['/', '\\']).any(|part| part == "..") {
            return Err(reject(PathRejection::ParentTraversal));
        }
        if name.ends_with('/') {
            return Err(reject(PathRejection::DirectoryName));
        }
    }

    Ok(name)
}

fn is_absolute(name: &str) -> bool {
    let bytes = name.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    name.starts_with(['/', '\\']) || has_drive
}
