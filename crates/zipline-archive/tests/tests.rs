use std::fs::File;
use std::io::Read;

use zip::ZipArchive;
use zipline_archive::{AddMode, ArchiveWriter, WriterOptions, ZipArchiveWriter};

fn read_back(file: File) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(file).expect("Failed to open archive");
    let mut entries: Vec<_> = (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_owned(), content)
        })
        .collect();
    entries.sort();
    entries
}

#[test]
fn build_zip_in_file() {
    let sink = tempfile::Builder::new()
        .prefix("zipline-test-")
        .tempfile()
        .expect("Failed to create temp file");

    let mut writer =
        ZipArchiveWriter::open(sink.reopen().unwrap(), WriterOptions::default().level(9));
    writer
        .add_entry(b"README.md", b"# hello\n".to_vec(), AddMode::Overwrite)
        .unwrap();
    writer
        .add_entry(b"src/lib.rs", vec![b'x'; 100_000], AddMode::Overwrite)
        .unwrap();

    let finished = writer.finalize().unwrap();
    assert!(!finished.needs_compaction());
    let file = finished.into_sink();

    let entries = read_back(file);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], ("README.md".to_owned(), b"# hello\n".to_vec()));
    assert_eq!(entries[1].1.len(), 100_000);

    let on_disk = std::fs::metadata(sink.path()).unwrap().len();
    assert!(on_disk < 100_000, "deflate should shrink repetitive data");
}

#[test]
fn compact_between_files() {
    let primary = tempfile::tempfile().unwrap();
    let spill = tempfile::tempfile().unwrap();

    let mut writer = ZipArchiveWriter::open(primary, WriterOptions::default());
    for round in 0..3u8 {
        for name in ["a", "b", "c"] {
            writer
                .add_entry(name.as_bytes(), vec![round; 64], AddMode::Overwrite)
                .unwrap();
        }
    }

    let finished = writer.finalize().unwrap();
    let report = finished.report();
    assert_eq!(report.entry_count, 3);
    assert_eq!(report.replaced, 6);
    assert_eq!(report.total_bytes, 192);
    assert!(finished.needs_compaction());

    let compacted = finished.compact_into(spill).unwrap();
    let entries = read_back(compacted);
    assert_eq!(
        entries,
        vec![
            ("a".to_owned(), vec![2; 64]),
            ("b".to_owned(), vec![2; 64]),
            ("c".to_owned(), vec![2; 64]),
        ]
    );
}

#[test]
fn discarded_file_does_not_open_as_zip() {
    let sink = tempfile::Builder::new()
        .prefix("zipline-test-")
        .tempfile()
        .expect("Failed to create temp file");

    let mut writer = ZipArchiveWriter::open(sink.reopen().unwrap(), WriterOptions::default());
    writer
        .add_entry(b"a", b"payload".to_vec(), AddMode::Overwrite)
        .unwrap();
    writer.discard();

    assert!(ZipArchive::new(sink.reopen().unwrap()).is_err());
}
