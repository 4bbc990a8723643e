//! VByte codec hot-path bench, mirroring `crates/benchmarks`' per-primitive
//! criterion benches.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mithril_index::{vbyte_decode, vbyte_encode};

fn bench_encode(c: &mut Criterion) {
    let values: Vec<u32> = (0..1000).map(|i| i * 37 + 1).collect();
    c.bench_function("vbyte_encode_1000", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            for &v in &values {
                vbyte_encode(black_box(v), &mut buf);
            }
            black_box(buf)
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let values: Vec<u32> = (0..1000).map(|i| i * 37 + 1).collect();
    let mut buf = Vec::new();
    for &v in &values {
        vbyte_encode(v, &mut buf);
    }

    c.bench_function("vbyte_decode_1000", |b| {
        b.iter(|| {
            let mut pos = 0;
            let mut sum = 0u64;
            while pos < buf.len() {
                sum += vbyte_decode(black_box(&buf), &mut pos) as u64;
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
