//! Live heap stays at one payload no matter how many entries pass through.
//!
//! Lives in its own test binary because it installs a global allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::io::{self, BufReader, Read};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::tempdir;
use zipline::{SessionConfig, run};
use zipline_archive::{Compression, WriterOptions};
use zipline_fs::ScratchDir;

static LIVE: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

struct Tracking;

fn grow(size: usize) {
    let live = LIVE.fetch_add(size, Ordering::Relaxed) + size;
    PEAK.fetch_max(live, Ordering::Relaxed);
}

fn shrink(size: usize) {
    LIVE.fetch_sub(size, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for Tracking {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            grow(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        shrink(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new = unsafe { System.realloc(ptr, layout, new_size) };
        if !new.is_null() {
            grow(new_size);
            shrink(layout.size());
        }
        new
    }
}

#[global_allocator]
static GLOBAL: Tracking = Tracking;

/// Generates `count` frames of `size` bytes each, then `DONE`, one frame at
/// a time into a buffer allocated up front.
struct Frames {
    remaining: usize,
    next: usize,
    size: usize,
    frame: Vec<u8>,
    pos: usize,
    done: bool,
}

impl Frames {
    fn new(count: usize, size: usize) -> Self {
        Self {
            remaining: count,
            next: 0,
            size,
            frame: Vec::with_capacity(size + 64),
            pos: 0,
            done: false,
        }
    }

    fn refill(&mut self) {
        self.frame.clear();
        self.pos = 0;

        if self.remaining == 0 {
            if !self.done {
                self.frame.extend_from_slice(b"DONE\n");
                self.done = true;
            }
            return;
        }

        let header = format!("entry-{:06}\n{}\n", self.next, self.size);
        self.frame.extend_from_slice(header.as_bytes());
        let fill = (self.next % 251) as u8;
        self.frame.resize(self.frame.len() + self.size, fill);
        self.remaining -= 1;
        self.next += 1;
    }
}

impl Read for Frames {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.frame.len() {
            self.refill();
        }
        let n = buf.len().min(self.frame.len() - self.pos);
        buf[..n].copy_from_slice(&self.frame[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

const PAYLOAD: usize = 256 * 1024;

/// Peak live heap above the level at the start of the run.
fn peak_for(count: usize, config: &SessionConfig) -> usize {
    let input = BufReader::new(Frames::new(count, PAYLOAD));
    let mut out = io::sink();

    let baseline = LIVE.load(Ordering::Relaxed);
    PEAK.store(baseline, Ordering::Relaxed);

    let report = run(input, &mut out, config).unwrap();
    assert_eq!(report.entries, count);
    assert_eq!(report.payload_bytes, (count * PAYLOAD) as u64);

    PEAK.load(Ordering::Relaxed) - baseline
}

#[test]
fn heap_does_not_grow_with_entry_count() {
    let dir = tempdir().unwrap();
    let config = SessionConfig::default()
        .scratch(ScratchDir::new().in_dir(dir.path()))
        .writer(WriterOptions::default().compression(Compression::Stored));

    let few = 4;
    let many = 128;
    let small = peak_for(few, &config);
    let large = peak_for(many, &config);

    // 128 entries push 32 MiB through; the heap holds one payload plus
    // fixed buffers and a little metadata per entry.
    assert!(
        large < 2 * PAYLOAD + (1 << 20),
        "peak {large} bytes for {many} entries"
    );
    assert!(
        large.saturating_sub(small) < (many - few) * 8 * 1024,
        "peak grew from {small} to {large} bytes"
    );
}
