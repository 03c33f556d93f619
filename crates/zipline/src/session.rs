//! The single run-scoped context that sequences one archive build.
//!
//! ```text
//! INIT -> INGESTING -> FINALIZING -> TRANSFERRING -> DONE
//!   \________\______________\_____________\______-> FAILED
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{debug, warn};
use zipline_archive::{ArchiveReport, ArchiveWriter, ZipArchiveWriter};
use zipline_fs::ScratchSink;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::ingest::{EntryIngestor, Step};
use crate::protocol::{FrameReader, Termination};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Ingesting,
    Finalizing,
    Transferring,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Ingesting => "ingesting",
            Self::Finalizing => "finalizing",
            Self::Transferring => "transferring",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Entries read from the input, replacements included.
    pub entries_ingested: usize,
    /// Entries in the finished archive.
    pub entries: usize,
    pub replaced: usize,
    pub payload_bytes: u64,
    pub archive_bytes: u64,
    pub peak_payload: u64,
    pub termination: Termination,
}

pub struct Session {
    state: SessionState,
    config: SessionConfig,
    ingestor: EntryIngestor,
    // The writer is discarded in `Drop`; the archive handle then drops
    // before the sinks it points into.
    writer: Option<ZipArchiveWriter<File>>,
    archive: Option<File>,
    archive_report: Option<ArchiveReport>,
    termination: Option<Termination>,
    scratch: ScratchSink,
    spill: Option<ScratchSink>,
}

impl Session {
    /// Acquire the scratch sink and open the writer on it.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let scratch = config
            .scratch
            .acquire()
            .map_err(|source| Error::ScratchCreateFailed { source })?;
        let handle = scratch
            .handle()
            .map_err(|source| Error::ScratchCreateFailed { source })?;

        let writer = ZipArchiveWriter::open(handle, config.writer);
        let ingestor = EntryIngestor::new(config.max_entry_size);

        let mut session = Self {
            state: SessionState::Init,
            config,
            ingestor,
            writer: Some(writer),
            archive: None,
            archive_report: None,
            termination: None,
            scratch,
            spill: None,
        };
        session.transition(SessionState::Ingesting);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Consume entries until a terminator or a clean end of input.
    pub fn ingest<R: BufRead>(&mut self, input: R) -> Result<Termination> {
        self.expect_state(SessionState::Ingesting, "ingest")?;

        let mut frames = FrameReader::new(input, self.config.limits);
        match self.ingest_frames(&mut frames) {
            Ok(termination) => {
                debug!(?termination, "input terminated");
                self.termination = Some(termination);
                self.transition(SessionState::Finalizing);
                Ok(termination)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Commit the archive, compacting it when entries were replaced.
    pub fn finalize(&mut self) -> Result<ArchiveReport> {
        self.expect_state(SessionState::Finalizing, "finalize")?;

        match self.finalize_archive() {
            Ok(report) => {
                self.archive_report = Some(report);
                self.transition(SessionState::Transferring);
                Ok(report)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Stream the finished archive to `out`, then remove every scratch sink.
    pub fn transfer<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<SessionReport> {
        self.expect_state(SessionState::Transferring, "transfer")?;

        let Some(mut archive) = self.archive.take() else {
            return Err(self.fail(Error::InvalidState {
                operation: "transfer",
                state: self.state,
            }));
        };

        match zipline_fs::transfer(&mut archive, out, self.config.transfer) {
            Ok(archive_bytes) => {
                drop(archive);
                self.release_all();
                self.transition(SessionState::Done);
                Ok(self.report(archive_bytes))
            }
            Err(source) => {
                drop(archive);
                Err(self.fail(Error::OutputWriteFailed { source }))
            }
        }
    }

    fn ingest_frames<R: BufRead>(&mut self, frames: &mut FrameReader<R>) -> Result<Termination> {
        let writer = self.writer.as_mut().ok_or(Error::InvalidState {
            operation: "ingest",
            state: self.state,
        })?;

        loop {
            if let Step::Finished(termination) = self.ingestor.ingest_next(frames, writer)? {
                return Ok(termination);
            }
        }
    }

    fn finalize_archive(&mut self) -> Result<ArchiveReport> {
        let writer = self.writer.take().ok_or(Error::InvalidState {
            operation: "finalize",
            state: self.state,
        })?;

        let finished = writer
            .finalize()
            .map_err(|source| Error::WriterFinalizeFailed { source })?;
        let report = finished.report();

        let archive = if finished.needs_compaction() {
            let spill = self
                .config
                .scratch
                .acquire()
                .map_err(|source| Error::ScratchCreateFailed { source })?;
            let handle = spill
                .handle()
                .map_err(|source| Error::ScratchCreateFailed { source })?;
            self.spill = Some(spill);

            let compacted = finished
                .compact_into(handle)
                .map_err(|source| Error::WriterFinalizeFailed { source })?;
            release(&mut self.scratch);
            compacted
        } else {
            finished.into_sink()
        };

        self.archive = Some(archive);
        Ok(report)
    }

    fn report(&self, archive_bytes: u64) -> SessionReport {
        let stats = self.ingestor.stats();
        let archive = self.archive_report.unwrap_or_default();
        SessionReport {
            entries_ingested: stats.entries,
            entries: archive.entry_count,
            replaced: stats.replaced,
            payload_bytes: stats.bytes,
            archive_bytes,
            peak_payload: stats.peak_payload,
            termination: self.termination.unwrap_or(Termination::EndOfInput),
        }
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Abort: discard the writer before any sink goes away, then empty and
    /// remove every sink.
    fn fail(&mut self, err: Error) -> Error {
        debug!(state = %self.state, kind = %err.kind(), "session failed");

        self.discard_writer();
        self.archive = None;
        truncate(&self.scratch);
        if let Some(spill) = &self.spill {
            truncate(spill);
        }
        self.release_all();
        self.transition(SessionState::Failed);
        err
    }

    fn discard_writer(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.discard();
        }
    }

    fn release_all(&mut self) {
        release(&mut self.scratch);
        if let Some(spill) = self.spill.as_mut() {
            release(spill);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.discard_writer();
    }
}

fn truncate(sink: &ScratchSink) {
    if sink.is_released() {
        return;
    }
    if let Err(err) = sink.truncate() {
        warn!(%err, "failed to truncate scratch sink");
    }
}

fn release(sink: &mut ScratchSink) {
    if let Err(err) = sink.release() {
        warn!(%err, "failed to release scratch sink");
    }
}
