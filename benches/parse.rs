use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::LazyLock;
use usbwatch::parser;

static DUMP: LazyLock<String> = LazyLock::new(|| {
    std::fs::read_to_string("./tests/data/usb_devices.txt").unwrap()
});
static COMPACT_DUMP: LazyLock<String> = LazyLock::new(|| {
    std::fs::read_to_string("./tests/data/usb_devices_compact.txt").unwrap()
});

pub fn parse_records(c: &mut Criterion) {
    let dump = &DUMP;
    c.bench_function("parse_records", |b| {
        b.iter(|| {
            let result = parser::parse_records(black_box(dump.as_str()));
            black_box(result);
        });
    });
    let compact = &COMPACT_DUMP;
    c.bench_function("parse_records_compact", |b| {
        b.iter(|| {
            let result = parser::parse_records(black_box(compact.as_str()));
            black_box(result);
        });
    });
}

pub fn split_blocks(c: &mut Criterion) {
    let dump = &DUMP;
    c.bench_function("split_blocks", |b| {
        b.iter(|| {
            let result = parser::split_blocks(black_box(dump.as_str()));
            black_box(result);
        });
    });
}

criterion_group!(benches, parse_records, split_blocks);
criterion_main!(benches);
