use crate::error::Result;

/// What to do when an entry path has already been added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AddMode {
    /// The new payload replaces the earlier entry.
    #[default]
    Overwrite,
    /// Adding the same path twice is an error.
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Added {
    Inserted,
    Replaced,
}

/// Incremental archive construction.
///
/// A writer is either finalized or discarded; there is no third way out.
pub trait ArchiveWriter {
    type Finished;

    /// Add one entry. The writer takes ownership of `payload`.
    fn add_entry(&mut self, path: &[u8], payload: Vec<u8>, mode: AddMode) -> Result<Added>;

    /// Commit every entry to the sink.
    fn finalize(self) -> Result<Self::Finished>;

    /// Abandon the archive without committing it.
    fn discard(self);
}
