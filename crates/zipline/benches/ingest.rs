use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::tempdir;
use zipline::{SessionConfig, run};
use zipline_archive::{Compression, WriterOptions};
use zipline_fs::ScratchDir;

fn input(entries: usize, size: usize) -> Vec<u8> {
    let payload = vec![b'a'; size];
    let mut out = Vec::with_capacity(entries * (size + 32));
    for i in 0..entries {
        out.extend_from_slice(format!("dir/file-{i}\n{size}\n").as_bytes());
        out.extend_from_slice(&payload);
    }
    out.extend_from_slice(b"DONE\n");
    out
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let dir = tempdir().unwrap();

    for (entries, size) in [(1000, 64), (100, 64 * 1024), (4, 4 * 1024 * 1024)] {
        let data = input(entries, size);
        group.throughput(Throughput::Bytes((entries * size) as u64));

        for compression in [Compression::Stored, Compression::Deflated] {
            let config = SessionConfig::default()
                .scratch(ScratchDir::new().in_dir(dir.path()))
                .writer(WriterOptions::default().compression(compression).level(1));

            group.bench_with_input(
                BenchmarkId::new(format!("{compression:?}"), format!("{entries}x{size}")),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut out = Vec::new();
                        let report = run(&data[..], &mut out, &config).unwrap();
                        black_box(report.archive_bytes)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_overwrite(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let config = SessionConfig::default().scratch(ScratchDir::new().in_dir(dir.path()));

    let mut data = Vec::new();
    for round in 0..10 {
        for i in 0..100 {
            data.extend_from_slice(format!("f{i}\n8\nround-{round:02}").as_bytes());
        }
    }

    c.bench_function("overwrite_compaction", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            black_box(run(&data[..], &mut out, &config).unwrap())
        });
    });
}

criterion_group!(benches, bench_session, bench_overwrite);
criterion_main!(benches);
