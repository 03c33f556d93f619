//! Framing for the entry stream.
//!
//! ```text
//! <path-bytes>\n
//! <decimal-size>\n
//! <exactly size raw bytes>
//! ...
//! DONE\n
//! ```
//!
//! Path and size tokens are newline-delimited and bounded in length. The
//! payload after a size token is read as a raw block and may contain any
//! byte, newlines included.

use std::borrow::Cow;
use std::io::{BufRead, ErrorKind, Read};

use crate::error::{Error, Result};

pub const TERMINATOR: &[u8] = b"DONE";
pub const DEFAULT_MAX_PATH_LEN: usize = 8192;
pub const DEFAULT_MAX_SIZE_LEN: usize = 64;

/// How the entry stream ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// A `DONE` frame.
    Explicit,
    /// Input stopped cleanly between entries.
    EndOfInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Path(Vec<u8>),
    Size(u64),
    Terminator(Termination),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub path: Vec<u8>,
    pub size: u64,
}

impl EntryDescriptor {
    pub fn display_path(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Next {
    Entry(EntryDescriptor),
    End(Termination),
}

#[derive(Clone, Copy, Debug)]
pub struct FrameLimits {
    pub max_path_len: usize,
    pub max_size_len: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
            max_size_len: DEFAULT_MAX_SIZE_LEN,
        }
    }
}

impl FrameLimits {
    pub fn max_path_len(mut self, bytes: usize) -> Self {
        self.max_path_len = bytes;
        self
    }

    pub fn max_size_len(mut self, bytes: usize) -> Self {
        self.max_size_len = bytes;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expect {
    Path,
    Size,
    Payload(u64),
    Finished(Termination),
}

/// Pulls frames off a buffered input, one at a time.
///
/// The sequence is lazy and cannot be restarted. Once a terminator has been
/// returned the input is never touched again.
pub struct FrameReader<R> {
    inner: R,
    limits: FrameLimits,
    expect: Expect,
    path: Vec<u8>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R, limits: FrameLimits) -> Self {
        Self {
            inner,
            limits,
            expect: Expect::Path,
            path: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.expect, Expect::Finished(_))
    }

    /// Size of the payload that must be read next, if any.
    pub fn pending_payload(&self) -> Option<u64> {
        match self.expect {
            Expect::Payload(len) => Some(len),
            _ => None,
        }
    }

    /// Next frame of the stream, or `None` after the terminator.
    ///
    /// A payload left unread after a size frame is skipped.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Expect::Payload(len) = self.expect {
            self.skip_payload(len)?;
        }

        match self.expect {
            Expect::Finished(_) => Ok(None),
            Expect::Size => self.read_size_frame().map(|size| Some(Frame::Size(size))),
            _ => match self.read_path_frame()? {
                Some(()) => Ok(Some(Frame::Path(self.path.clone()))),
                None => Ok(self.termination().map(Frame::Terminator)),
            },
        }
    }

    /// Read a path frame and its size frame as one entry descriptor.
    pub fn next_entry(&mut self) -> Result<Next> {
        if let Expect::Payload(len) = self.expect {
            self.skip_payload(len)?;
        }

        match self.expect {
            Expect::Finished(termination) => return Ok(Next::End(termination)),
            Expect::Size => {}
            _ => {
                if self.read_path_frame()?.is_none() {
                    let termination = self.termination().unwrap_or(Termination::EndOfInput);
                    return Ok(Next::End(termination));
                }
            }
        }

        let size = self.read_size_frame()?;
        Ok(Next::Entry(EntryDescriptor {
            path: std::mem::take(&mut self.path),
            size,
        }))
    }

    /// Read the pending payload into `out` and return how many bytes arrived.
    ///
    /// Fewer bytes than announced means the input ended early. A zero-size
    /// payload performs no read.
    pub fn read_payload(&mut self, out: &mut Vec<u8>) -> Result<u64> {
        let Expect::Payload(len) = self.expect else {
            return Ok(0);
        };
        self.expect = Expect::Path;

        if len == 0 {
            return Ok(0);
        }

        let read = self
            .inner
            .by_ref()
            .take(len)
            .read_to_end(out)
            .map_err(|e| Error::InputReadFailed { source: e })?;
        Ok(read as u64)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn termination(&self) -> Option<Termination> {
        match self.expect {
            Expect::Finished(termination) => Some(termination),
            _ => None,
        }
    }

    /// Returns `None` when the stream terminated instead of naming a path.
    fn read_path_frame(&mut self) -> Result<Option<()>> {
        let token = match self.read_token(self.limits.max_path_len)? {
            None => {
                self.expect = Expect::Finished(Termination::EndOfInput);
                return Ok(None);
            }
            Some(token) => token,
        };

        if token == TERMINATOR {
            self.expect = Expect::Finished(Termination::Explicit);
            return Ok(None);
        }

        self.path = token;
        self.expect = Expect::Size;
        Ok(Some(()))
    }

    fn read_size_frame(&mut self) -> Result<u64> {
        let token = self
            .read_token(self.limits.max_size_len)?
            .ok_or(Error::TruncatedFrame { read: 0 })?;
        let size = parse_size(&token)?;
        self.expect = Expect::Payload(size);
        Ok(size)
    }

    fn skip_payload(&mut self, len: u64) -> Result<()> {
        self.expect = Expect::Path;
        let skipped = std::io::copy(&mut self.inner.by_ref().take(len), &mut std::io::sink())
            .map_err(|e| Error::InputReadFailed { source: e })?;

        if skipped < len {
            return Err(Error::TruncatedPayload {
                path: String::from_utf8_lossy(&self.path).into_owned(),
                expected: len,
                actual: skipped,
            });
        }
        Ok(())
    }

    /// A newline-terminated token without its newline, or `None` on a clean
    /// end of input.
    fn read_token(&mut self, limit: usize) -> Result<Option<Vec<u8>>> {
        let mut token = Vec::new();

        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::InputReadFailed { source: e }),
            };

            if buf.is_empty() {
                if token.is_empty() {
                    return Ok(None);
                }
                return Err(Error::TruncatedFrame { read: token.len() });
            }

            match buf.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    if token.len() + end > limit {
                        return Err(Error::FrameTooLong { limit });
                    }
                    token.extend_from_slice(&buf[..end]);
                    self.inner.consume(end + 1);
                    return Ok(Some(token));
                }
                None => {
                    let n = buf.len();
                    if token.len() + n > limit {
                        return Err(Error::FrameTooLong { limit });
                    }
                    token.extend_from_slice(buf);
                    self.inner.consume(n);
                }
            }
        }
    }
}

/// Parse a size token: one or more ASCII digits, nothing else.
///
/// A well-formed number too large for `u64` saturates into `EntryTooLarge`.
pub fn parse_size(token: &[u8]) -> Result<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(Error::InvalidSize {
            token: String::from_utf8_lossy(token).into_owned(),
        });
    }

    token
        .iter()
        .try_fold(0u64, |acc, &digit| {
            acc.checked_mul(10)?.checked_add(u64::from(digit - b'0'))
        })
        .ok_or(Error::EntryTooLarge {
            size: u64::MAX,
            limit: u64::MAX,
        })
}
