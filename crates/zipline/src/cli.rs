use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use zipline::SessionConfig;
use zipline::ingest::ALLOCATION_LIMIT;
use zipline::protocol::{DEFAULT_MAX_PATH_LEN, FrameLimits};
use zipline_archive::{Compression, PathPolicy, WriterOptions};
use zipline_fs::{DEFAULT_CHUNK_SIZE, ScratchDir, TransferOptions};

/// Read `path\nsize\n<payload>` entries from stdin and write a zip archive to stdout.
#[derive(Clone, Debug, Parser)]
#[command(name = "zipline", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Directory for the scratch archive. Defaults to the system temp dir.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CompressionArg::Deflated)]
    pub compression: CompressionArg,

    /// Deflate level, 0-9.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub level: Option<u8>,

    /// Longest accepted entry path, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PATH_LEN)]
    pub max_path_len: usize,

    /// Largest accepted entry payload, in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_entry_size: Option<u64>,

    /// Chunk size used when copying the archive to stdout.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Reject absolute paths and `..` components.
    #[arg(long)]
    pub strict_paths: bool,

    /// More log output on stderr. Repeat for debug.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    Stored,
    Deflated,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Stored => Compression::Stored,
            CompressionArg::Deflated => Compression::Deflated,
        }
    }
}

impl Cli {
    /// Default filter directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut scratch = ScratchDir::new();
        if let Some(dir) = &self.scratch_dir {
            scratch = scratch.in_dir(dir.clone());
        }

        let mut writer = WriterOptions::default().compression(self.compression.into());
        if let Some(level) = self.level {
            writer = writer.level(level);
        }
        if self.strict_paths {
            writer = writer.path_policy(PathPolicy::Strict);
        }

        SessionConfig::default()
            .scratch(scratch)
            .limits(FrameLimits::default().max_path_len(self.max_path_len))
            .max_entry_size(self.max_entry_size.unwrap_or(ALLOCATION_LIMIT))
            .writer(writer)
            .transfer(TransferOptions::new().chunk_size(self.chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["zipline"]);
        let config = cli.session_config();
        assert_eq!(config.limits.max_path_len, DEFAULT_MAX_PATH_LEN);
        assert_eq!(config.max_entry_size, ALLOCATION_LIMIT);
        assert_eq!(config.writer.compression, Compression::Deflated);
        assert_eq!(config.writer.path_policy, PathPolicy::Lenient);
        assert_eq!(config.transfer.get_chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "zipline",
            "--scratch-dir",
            "/var/tmp",
            "--compression",
            "stored",
            "--level",
            "3",
            "--max-path-len",
            "16",
            "--max-entry-size",
            "1024",
            "--chunk-size",
            "512",
            "--strict-paths",
            "-vv",
        ]);
        let config = cli.session_config();
        assert_eq!(config.scratch.dir(), std::path::Path::new("/var/tmp"));
        assert_eq!(config.writer.compression, Compression::Stored);
        assert_eq!(config.writer.level, Some(3));
        assert_eq!(config.writer.path_policy, PathPolicy::Strict);
        assert_eq!(config.limits.max_path_len, 16);
        assert_eq!(config.max_entry_size, 1024);
        assert_eq!(config.transfer.get_chunk_size(), 512);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["zipline", "--level", "10"]).is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["zipline", "-q", "-v"]).is_err());
        assert_eq!(Cli::parse_from(["zipline", "-q"]).log_level(), "error");
    }
}
