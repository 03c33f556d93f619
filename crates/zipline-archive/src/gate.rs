use std::io::{self, ErrorKind, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared switch that disconnects a [`Gate`] from its sink.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cutoff(Arc<AtomicBool>);

impl Cutoff {
    pub(crate) fn cut(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_cut(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Position bookkeeping once the sink is disconnected.
#[derive(Clone, Copy, Debug)]
struct Void {
    pos: u64,
    len: u64,
}

/// Sink wrapper handed to `ZipWriter`.
///
/// Once cut, writes and seeks land nowhere and always succeed, so the
/// finalize that `ZipWriter` runs on drop commits nothing to the sink. A
/// write or seek error other than `Interrupted` cuts the gate as well.
pub(crate) struct Gate<W> {
    inner: W,
    cutoff: Cutoff,
    void: Option<Void>,
}

impl<W: Write + Seek> Gate<W> {
    pub(crate) fn new(inner: W, cutoff: &Cutoff) -> Self {
        Self {
            inner,
            cutoff: cutoff.clone(),
            void: None,
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }

    fn void(&mut self) -> Option<&mut Void> {
        if self.void.is_none() && self.cutoff.is_cut() {
            let pos = self.inner.stream_position().unwrap_or(0);
            self.void = Some(Void { pos, len: pos });
        }
        self.void.as_mut()
    }

    fn check<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if matches!(&result, Err(e) if e.kind() != ErrorKind::Interrupted) {
            self.cutoff.cut();
        }
        result
    }
}

impl<W: Write + Seek> Write for Gate<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(void) = self.void() {
            void.pos += buf.len() as u64;
            void.len = void.len.max(void.pos);
            return Ok(buf.len());
        }
        let result = self.inner.write(buf);
        self.check(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.void().is_some() {
            return Ok(());
        }
        let result = self.inner.flush();
        self.check(result)
    }
}

impl<W: Write + Seek> Seek for Gate<W> {
    fn seek(&mut self, to: SeekFrom) -> io::Result<u64> {
        if let Some(void) = self.void() {
            void.pos = match to {
                SeekFrom::Start(n) => n,
                SeekFrom::Current(d) => void.pos.saturating_add_signed(d),
                SeekFrom::End(d) => void.len.saturating_add_signed(d),
            };
            return Ok(void.pos);
        }
        let result = self.inner.seek(to);
        self.check(result)
    }
}
