//! Scratch storage for archives that are assembled before being emitted.
//!
//! # Architecture
//!
//! - `scratch.rs` - Exclusively created scratch files, removed on every exit path
//! - `transfer.rs` - Chunked copy of a finished scratch file to an output stream

pub use error::{Error, Result};
pub use scratch::{ScratchDir, ScratchSink};
pub use transfer::{DEFAULT_CHUNK_SIZE, TransferOptions, transfer};

mod error;
mod scratch;
mod transfer;
