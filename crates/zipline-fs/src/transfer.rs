use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct TransferOptions {
    chunk_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Copy `source` from its beginning to `out` in fixed-size chunks.
///
/// Any failure on the output side is fatal: a truncated archive is not an
/// archive, so nothing is retried beyond `Interrupted`.
pub fn transfer<S, W>(source: &mut S, out: &mut W, options: TransferOptions) -> Result<u64>
where
    S: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| Error::Read { source: e })?;

    let mut buf = vec![0u8; options.chunk_size];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Read { source: e }),
        };

        out.write_all(&buf[..n])
            .map_err(|e| Error::Write { source: e })?;
        total += n as u64;
    }

    out.flush().map_err(|e| Error::Write { source: e })?;
    debug!(bytes = total, chunk_size = options.chunk_size, "transferred scratch sink");

    Ok(total)
}
