use zipline_archive::WriterOptions;
use zipline_fs::{ScratchDir, TransferOptions};

use crate::ingest::ALLOCATION_LIMIT;
use crate::protocol::FrameLimits;

/// Everything a session needs to know up front.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub scratch: ScratchDir,
    pub limits: FrameLimits,
    pub max_entry_size: u64,
    pub writer: WriterOptions,
    pub transfer: TransferOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch: ScratchDir::default(),
            limits: FrameLimits::default(),
            max_entry_size: ALLOCATION_LIMIT,
            writer: WriterOptions::default(),
            transfer: TransferOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn scratch(mut self, scratch: ScratchDir) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn limits(mut self, limits: FrameLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = bytes.min(ALLOCATION_LIMIT);
        self
    }

    pub fn writer(mut self, writer: WriterOptions) -> Self {
        self.writer = writer;
        self
    }

    pub fn transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }
}
