use std::fmt;
use std::io;

use crate::session::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },

    #[error("input ended inside a frame after {read} bytes")]
    TruncatedFrame { read: usize },

    #[error("invalid entry size '{token}'")]
    InvalidSize { token: String },

    #[error("entry size {size} exceeds the limit of {limit} bytes")]
    EntryTooLarge { size: u64, limit: u64 },

    #[error("entry '{path}' declared {expected} bytes but input ended after {actual}")]
    TruncatedPayload {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("entry '{path}' rejected: {source}")]
    WriterRejectedEntry {
        path: String,
        source: zipline_archive::Error,
    },

    #[error("{source}")]
    ScratchCreateFailed { source: zipline_fs::Error },

    #[error("{source}")]
    WriterFinalizeFailed { source: zipline_archive::Error },

    #[error("{source}")]
    OutputWriteFailed { source: zipline_fs::Error },

    #[error("failed to read input: {source}")]
    InputReadFailed { source: io::Error },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// Stable names for error categories, used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    FrameTooLong,
    TruncatedFrame,
    InvalidSize,
    EntryTooLarge,
    TruncatedPayload,
    WriterRejectedEntry,
    ScratchCreateFailed,
    WriterFinalizeFailed,
    OutputWriteFailed,
    InputReadFailed,
    InvalidState,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrameTooLong => "FrameTooLong",
            Self::TruncatedFrame => "TruncatedFrame",
            Self::InvalidSize => "InvalidSize",
            Self::EntryTooLarge => "EntryTooLarge",
            Self::TruncatedPayload => "TruncatedPayload",
            Self::WriterRejectedEntry => "WriterRejectedEntry",
            Self::ScratchCreateFailed => "ScratchCreateFailed",
            Self::WriterFinalizeFailed => "WriterFinalizeFailed",
            Self::OutputWriteFailed => "OutputWriteFailed",
            Self::InputReadFailed => "InputReadFailed",
            Self::InvalidState => "InvalidState",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// sysexits.h
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_CANTCREAT: u8 = 73;
const EX_IOERR: u8 = 74;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FrameTooLong { .. } => ErrorKind::FrameTooLong,
            Self::TruncatedFrame { .. } => ErrorKind::TruncatedFrame,
            Self::InvalidSize { .. } => ErrorKind::InvalidSize,
            Self::EntryTooLarge { .. } => ErrorKind::EntryTooLarge,
            Self::TruncatedPayload { .. } => ErrorKind::TruncatedPayload,
            Self::WriterRejectedEntry { .. } => ErrorKind::WriterRejectedEntry,
            Self::ScratchCreateFailed { .. } => ErrorKind::ScratchCreateFailed,
            Self::WriterFinalizeFailed { .. } => ErrorKind::WriterFinalizeFailed,
            Self::OutputWriteFailed { .. } => ErrorKind::OutputWriteFailed,
            Self::InputReadFailed { .. } => ErrorKind::InputReadFailed,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Process exit status for this error. Never zero.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::FrameTooLong
            | ErrorKind::TruncatedFrame
            | ErrorKind::InvalidSize
            | ErrorKind::EntryTooLarge
            | ErrorKind::TruncatedPayload
            | ErrorKind::WriterRejectedEntry => EX_DATAERR,
            ErrorKind::ScratchCreateFailed => EX_CANTCREAT,
            ErrorKind::WriterFinalizeFailed | ErrorKind::InvalidState => EX_SOFTWARE,
            ErrorKind::OutputWriteFailed | ErrorKind::InputReadFailed => EX_IOERR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_variants() {
        let err = Error::TruncatedPayload {
            path: "a".into(),
            expected: 100,
            actual: 40,
        };
        assert_eq!(err.kind(), ErrorKind::TruncatedPayload);
        assert_eq!(err.kind().to_string(), "TruncatedPayload");
    }

    #[test]
    fn exit_codes_are_nonzero() {
        let errors = [
            Error::FrameTooLong { limit: 1 },
            Error::TruncatedFrame { read: 1 },
            Error::InvalidSize { token: "x".into() },
            Error::EntryTooLarge { size: 2, limit: 1 },
            Error::ScratchCreateFailed {
                source: zipline_fs::Error::Released("x".into()),
            },
            Error::OutputWriteFailed {
                source: zipline_fs::Error::Write {
                    source: io::ErrorKind::WriteZero.into(),
                },
            },
            Error::InputReadFailed {
                source: io::ErrorKind::BrokenPipe.into(),
            },
            Error::InvalidState {
                operation: "ingest",
                state: SessionState::Done,
            },
        ];
        for err in errors {
            assert_ne!(err.exit_code(), 0, "{}", err.kind());
        }
    }

    #[test]
    fn data_errors_use_dataerr() {
        assert_eq!(Error::InvalidSize { token: "-1".into() }.exit_code(), 65);
    }

    #[test]
    fn message_includes_details() {
        let err = Error::TruncatedPayload {
            path: "notes.txt".into(),
            expected: 100,
            actual: 40,
        };
        assert_eq!(
            err.to_string(),
            "entry 'notes.txt' declared 100 bytes but input ended after 40"
        );
    }
}
