use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek, Write};

use tracing::debug;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::gate::{Cutoff, Gate};
use crate::options::WriterOptions;
use crate::report::ArchiveReport;
use crate::sanitize::validate_entry_path;
use crate::writer::{AddMode, Added, ArchiveWriter};

/// Names under this prefix hold replacement payloads until compaction
/// renames them back.
const ALIAS_PREFIX: &str = ".zipline-pending/";

struct Physical {
    size: u64,
    superseded: bool,
}

/// Zip writer that streams every entry into its sink as it arrives.
///
/// A zip cannot hold two entries with the same name, so a replacement is
/// written under an alias and the earlier version is marked superseded.
/// [`Finished::compact_into`] then drops the stale versions without
/// decompressing anything.
///
/// Only [`ArchiveWriter::finalize`] writes a central directory. After
/// [`ArchiveWriter::discard`] or a failed write the sink is disconnected, so
/// whatever reached it never opens as an archive.
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<Gate<W>>,
    cutoff: Cutoff,
    options: WriterOptions,
    physical: Vec<Physical>,
    taken: HashSet<Box<str>>,
    live: HashMap<Box<str>, usize>,
    next_alias: u64,
    aliased: bool,
    report: ArchiveReport,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn open(sink: W, options: WriterOptions) -> Self {
        let cutoff = Cutoff::default();
        Self {
            zip: ZipWriter::new(Gate::new(sink, &cutoff)),
            cutoff,
            options,
            physical: Vec::new(),
            taken: HashSet::new(),
            live: HashMap::new(),
            next_alias: 0,
            aliased: false,
            report: ArchiveReport::default(),
        }
    }

    pub fn report(&self) -> ArchiveReport {
        self.report
    }

    fn physical_name(&mut self, logical: &str) -> Box<str> {
        if !self.taken.contains(logical) {
            return logical.into();
        }

        self.aliased = true;
        loop {
            let alias: Box<str> = format!("{ALIAS_PREFIX}{}", self.next_alias).into();
            self.next_alias += 1;
            if !self.taken.contains(&alias) {
                return alias;
            }
        }
    }

    fn write_entry(&mut self, name: &str, payload: &[u8]) -> Result<()> {
        if self.cutoff.is_cut() {
            return Err(Error::Disconnected);
        }

        let options = self.options.file_options(payload.len() as u64);
        self.zip.start_file(name, options)?;
        self.zip.write_all(payload)?;
        Ok(())
    }

    fn compaction_plan(&self) -> Option<Vec<Option<Box<str>>>> {
        if !self.aliased && self.report.replaced == 0 {
            return None;
        }

        let mut plan: Vec<Option<Box<str>>> = vec![None; self.physical.len()];
        for (logical, &index) in &self.live {
            plan[index] = Some(logical.clone());
        }
        Some(plan)
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    type Finished = Finished<W>;

    fn add_entry(&mut self, path: &[u8], payload: Vec<u8>, mode: AddMode) -> Result<Added> {
        let logical = validate_entry_path(path, self.options.path_policy)?;
        let previous = self.live.get(logical).copied();

        if previous.is_some() && mode == AddMode::Reject {
            return Err(Error::DuplicateEntry(logical.to_owned()));
        }

        let logical: Box<str> = logical.into();
        let name = self.physical_name(&logical);
        self.write_entry(&name, &payload)?;

        let size = payload.len() as u64;
        let index = self.physical.len();
        self.physical.push(Physical {
            size,
            superseded: false,
        });
        self.taken.insert(name);

        let added = match previous {
            Some(old) => {
                let stale = &mut self.physical[old];
                stale.superseded = true;
                self.report.total_bytes -= stale.size;
                self.report.replaced += 1;
                Added::Replaced
            }
            None => {
                self.report.entry_count += 1;
                Added::Inserted
            }
        };
        self.report.total_bytes += size;

        debug!(path = %logical, size, ?added, "entry written");
        self.live.insert(logical, index);

        Ok(added)
    }

    fn finalize(self) -> Result<Finished<W>> {
        if self.cutoff.is_cut() {
            return Err(Error::Disconnected);
        }

        let plan = self.compaction_plan();
        let report = self.report;
        let sink = self.zip.finish()?.into_inner();

        debug!(
            entries = report.entry_count,
            replaced = report.replaced,
            compaction = plan.is_some(),
            "archive finalized"
        );

        Ok(Finished { sink, report, plan })
    }

    fn discard(mut self) {
        if let Err(err) = self.zip.abort_file() {
            debug!(%err, "no open entry to abort");
        }
        self.cutoff.cut();

        debug!(
            written = self.physical.len(),
            stale = self.physical.iter().filter(|p| p.superseded).count(),
            "archive discarded"
        );
    }
}

/// A finalized archive still sitting in its sink.
pub struct Finished<W> {
    sink: W,
    report: ArchiveReport,
    plan: Option<Vec<Option<Box<str>>>>,
}

impl<W> Finished<W> {
    /// True when the sink still carries superseded or aliased entries.
    pub fn needs_compaction(&self) -> bool {
        self.plan.is_some()
    }

    pub fn report(&self) -> ArchiveReport {
        self.report
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

impl<W: Read + Seek> Finished<W> {
    /// Copy the live entries into `out`, still compressed, under their
    /// logical names.
    ///
    /// On failure `out` never receives a central directory.
    pub fn compact_into<O: Write + Seek>(self, out: O) -> Result<O> {
        let mut archive = ZipArchive::new(self.sink)?;
        let cutoff = Cutoff::default();
        let mut writer = ZipWriter::new(Gate::new(out, &cutoff));

        let kept = match copy_live(&mut archive, &mut writer, self.plan.as_deref()) {
            Ok(kept) => kept,
            Err(err) => {
                cutoff.cut();
                return Err(err);
            }
        };

        debug!(kept, dropped = archive.len() - kept, "archive compacted");
        Ok(writer.finish()?.into_inner())
    }
}

fn copy_live<R, O>(
    archive: &mut ZipArchive<R>,
    writer: &mut ZipWriter<Gate<O>>,
    plan: Option<&[Option<Box<str>>]>,
) -> Result<usize>
where
    R: Read + Seek,
    O: Write + Seek,
{
    let mut kept = 0usize;

    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        let target: Option<Box<str>> = match plan {
            Some(plan) => plan.get(index).cloned().flatten(),
            None => Some(file.name().into()),
        };
        let Some(target) = target else {
            continue;
        };

        if file.name() == &*target {
            writer.raw_copy_file(file)?;
        } else {
            writer.raw_copy_file_rename(file, target)?;
        }
        kept += 1;
    }

    Ok(kept)
}
