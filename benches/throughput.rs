use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recio::{RecordReader, RecordWriter};
use std::io::{Cursor, Read, Write};

fn build_stream(count: usize, payload: &[u8], compress: bool) -> Vec<u8> {
    let mut writer = if compress {
        RecordWriter::compressed(Vec::new())
    } else {
        RecordWriter::new(Vec::new())
    };
    for _ in 0..count {
        let mut rec = writer.new_record();
        rec.write_all(payload).unwrap();
        rec.finish().unwrap();
    }
    writer.into_inner().unwrap()
}

fn bench_write(c: &mut Criterion) {
    let payload = vec![42u8; 1024];

    c.bench_function("write_1k_records_raw", |b| {
        b.iter(|| build_stream(1024, black_box(&payload), false))
    });
    c.bench_function("write_1k_records_gzip", |b| {
        b.iter(|| build_stream(1024, black_box(&payload), true))
    });
}

fn bench_read(c: &mut Criterion) {
    let payload = vec![42u8; 1024];
    let raw = build_stream(1024, &payload, false);
    let gzip = build_stream(1024, &payload, true);
    let mut scratch = Vec::with_capacity(payload.len());

    c.bench_function("read_1k_records_raw", |b| {
        b.iter(|| {
            let mut reader = RecordReader::new(Cursor::new(black_box(&raw)));
            let mut count = 0;
            while reader.next_record().unwrap() {
                scratch.clear();
                reader.read_to_end(&mut scratch).unwrap();
                count += 1;
            }
            count
        })
    });
    c.bench_function("read_1k_records_gzip", |b| {
        b.iter(|| {
            let mut reader = RecordReader::new(Cursor::new(black_box(&gzip)));
            let mut count = 0;
            while reader.next_record().unwrap() {
                scratch.clear();
                reader.read_to_end(&mut scratch).unwrap();
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
