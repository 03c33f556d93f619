use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Deflated entries within 1/1000 of the zip32 size limit are written as zip64.
const DEFLATE_HEADROOM: u64 = 1000;

/// Compression applied to every entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// How strictly entry paths are checked before they reach the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PathPolicy {
    /// Reject only names a zip cannot hold: empty, NUL, non-UTF-8.
    #[default]
    Lenient,
    /// Also reject names that would escape an extraction root.
    Strict,
}

#[derive(Clone, Copy, Debug)]
pub struct WriterOptions {
    pub compression: Compression,
    pub level: Option<u8>,
    pub path_policy: PathPolicy,
    pub unix_permissions: u32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            level: None,
            path_policy: PathPolicy::default(),
            unix_permissions: 0o644,
        }
    }
}

impl WriterOptions {
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Deflate level, 0-9. Ignored for stored entries.
    pub fn level(mut self, level: u8) -> Self {
        self.level = Some(level.min(9));
        self
    }

    pub fn path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    pub fn unix_permissions(mut self, mode: u32) -> Self {
        self.unix_permissions = mode;
        self
    }

    /// Whether an entry of `size` uncompressed bytes needs zip64 headers.
    ///
    /// Deflate can grow incompressible input a little, so deflated entries
    /// switch over slightly below the zip32 limit.
    pub(crate) fn needs_zip64(&self, size: u64) -> bool {
        let limit = u64::from(u32::MAX);
        match self.compression {
            Compression::Stored => size >= limit,
            Compression::Deflated => size >= limit - limit / DEFLATE_HEADROOM,
        }
    }

    pub(crate) fn file_options(&self, size: u64) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .unix_permissions(self.unix_permissions)
            .large_file(self.needs_zip64(size));

        match self.compression {
            Compression::Stored => options.compression_method(CompressionMethod::Stored),
            Compression::Deflated => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(self.level.map(Into::into)),
        }
    }
}
