//! Build a zip archive from a framed stream of entries.
//!
//! Input is a sequence of `path\nsize\n<payload>` frames ending with `DONE\n`
//! or a clean end of input. The archive is assembled in a scratch file and
//! only copied to the output once it is complete, so a failed run emits
//! nothing.
//!
//! # Architecture
//!
//! - `protocol.rs` - Bounded frame reader for the entry stream
//! - `ingest.rs` - Reads one entry at a time into an archive writer
//! - `session.rs` - Sequences scratch, ingest, finalize and transfer
//! - `config.rs` - Limits and options for a session
//! - `error.rs` - Error categories and exit codes

pub use config::SessionConfig;
pub use error::{Error, ErrorKind, Result};
pub use protocol::{FrameLimits, FrameReader, Termination};
pub use session::{Session, SessionReport, SessionState};

pub mod config;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod session;

use std::io::{BufRead, Write};

use tracing::info;

/// Run one session from `input` to `output`.
///
/// Nothing is written to `output` unless the archive was finalized.
pub fn run<R, W>(input: R, output: &mut W, config: &SessionConfig) -> Result<SessionReport>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let mut session = Session::open(config.clone())?;
    session.ingest(input)?;
    session.finalize()?;
    let report = session.transfer(output)?;

    info!(
        entries = report.entries,
        replaced = report.replaced,
        payload_bytes = report.payload_bytes,
        archive_bytes = report.archive_bytes,
        "archive written"
    );
    Ok(report)
}
