/// Summary of the logical archive, after overwrites are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub entry_count: usize,
    pub total_bytes: u64,
    pub replaced: usize,
}
