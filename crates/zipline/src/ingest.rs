use std::io::BufRead;

use tracing::debug;
use zipline_archive::{AddMode, Added, ArchiveWriter};

use crate::error::{Error, Result};
use crate::protocol::{EntryDescriptor, FrameReader, Next, Termination};

/// Largest payload the platform can allocate in one piece.
pub const ALLOCATION_LIMIT: u64 = isize::MAX as u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Entries forwarded to the writer, replacements included.
    pub entries: usize,
    pub bytes: u64,
    pub replaced: usize,
    /// Largest payload held in memory at once.
    pub peak_payload: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestedEntry {
    pub path: String,
    pub size: u64,
    pub added: Added,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Entry(IngestedEntry),
    Finished(Termination),
}

/// Reads one entry at a time and hands it to an [`ArchiveWriter`].
///
/// Each payload is owned here only from the read until the writer takes it,
/// so at most one payload is alive at any time.
#[derive(Debug)]
pub struct EntryIngestor {
    max_entry_size: u64,
    stats: IngestStats,
}

impl Default for EntryIngestor {
    fn default() -> Self {
        Self::new(ALLOCATION_LIMIT)
    }
}

impl EntryIngestor {
    pub fn new(max_entry_size: u64) -> Self {
        Self {
            max_entry_size: max_entry_size.min(ALLOCATION_LIMIT),
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn ingest_next<R, W>(&mut self, frames: &mut FrameReader<R>, writer: &mut W) -> Result<Step>
    where
        R: BufRead,
        W: ArchiveWriter,
    {
        let entry = match frames.next_entry()? {
            Next::Entry(entry) => entry,
            Next::End(termination) => return Ok(Step::Finished(termination)),
        };

        let payload = self.read_payload(frames, &entry)?;
        self.stats.peak_payload = self.stats.peak_payload.max(payload.len() as u64);

        let added = writer
            .add_entry(&entry.path, payload, AddMode::Overwrite)
            .map_err(|source| Error::WriterRejectedEntry {
                path: entry.display_path().into_owned(),
                source,
            })?;

        self.stats.entries += 1;
        self.stats.bytes += entry.size;
        if added == Added::Replaced {
            self.stats.replaced += 1;
        }

        let path = entry.display_path().into_owned();
        debug!(%path, size = entry.size, ?added, "entry ingested");

        Ok(Step::Entry(IngestedEntry {
            path,
            size: entry.size,
            added,
        }))
    }

    fn read_payload<R: BufRead>(
        &self,
        frames: &mut FrameReader<R>,
        entry: &EntryDescriptor,
    ) -> Result<Vec<u8>> {
        let too_large = || Error::EntryTooLarge {
            size: entry.size,
            limit: self.max_entry_size,
        };

        if entry.size > self.max_entry_size {
            return Err(too_large());
        }
        let len = usize::try_from(entry.size).map_err(|_| too_large())?;

        let mut payload = Vec::new();
        payload.try_reserve_exact(len).map_err(|_| too_large())?;

        let read = frames.read_payload(&mut payload)?;
        if read < entry.size {
            return Err(Error::TruncatedPayload {
                path: entry.display_path().into_owned(),
                expected: entry.size,
                actual: read,
            });
        }

        Ok(payload)
    }
}
