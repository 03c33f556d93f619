//! Archive construction for streamed entries.
//!
//! # Architecture
//!
//! - `writer.rs` - The [`ArchiveWriter`] capability used by ingestion
//! - `zip_writer.rs` - Zip implementation with overwrite-by-path and compaction
//! - `gate.rs` - Sink wrapper that keeps a discarded archive from being committed
//! - `sanitize.rs` - Entry path validation
//! - `options.rs` - Compression and path policy
//! - `report.rs` - Summary of a finished archive

pub use error::{Error, Result};
pub use options::{Compression, PathPolicy, WriterOptions};
pub use report::ArchiveReport;
pub use sanitize::{PathRejection, validate_entry_path};
pub use writer::{AddMode, Added, ArchiveWriter};
pub use zip_writer::{Finished, ZipArchiveWriter};

mod error;
mod gate;
mod options;
mod report;
mod sanitize;
mod writer;
mod zip_writer;
