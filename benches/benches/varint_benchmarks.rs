use std::hint::black_box;

use cereal::{
    codec::{decode_uvarint, encode_uvarint, encode_varint, read_uvarint, MAX_VARINT_LEN64},
    ByteSeeker,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn sample_values(bits: u32) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(42);
    let max = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    (0..1024).map(|_| rng.gen_range(0..=max)).collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint encode");
    for bits in [7u32, 14, 28, 64] {
        let values = sample_values(bits);
        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_with_input(BenchmarkId::new("unsigned", bits), &values, |b, values| {
            let mut buf = [0u8; MAX_VARINT_LEN64];
            b.iter(|| {
                for &v in values {
                    black_box(encode_uvarint(&mut buf, black_box(v)));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("signed", bits), &values, |b, values| {
            let mut buf = [0u8; MAX_VARINT_LEN64];
            b.iter(|| {
                for &v in values {
                    black_box(encode_varint(&mut buf, black_box(v as i64)));
                }
            })
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint decode");
    for bits in [7u32, 28, 64] {
        let values = sample_values(bits);
        let mut stream = Vec::new();
        let mut buf = [0u8; MAX_VARINT_LEN64];
        for &v in &values {
            let n = encode_uvarint(&mut buf, v);
            stream.extend_from_slice(&buf[..n]);
        }
        group.throughput(Throughput::Elements(values.len() as u64));

        group.bench_with_input(BenchmarkId::new("slice", bits), &stream, |b, stream| {
            b.iter(|| {
                let mut pos = 0;
                while pos < stream.len() {
                    let (v, n) = decode_uvarint(&stream[pos..]).unwrap();
                    black_box(v);
                    pos += n;
                }
            })
        });

        // чтение окном с откатом через Seek
        group.bench_with_input(BenchmarkId::new("seeker", bits), &stream, |b, stream| {
            b.iter(|| {
                let mut src = ByteSeeker::new(stream.clone());
                for _ in 0..values.len() {
                    black_box(read_uvarint(&mut src).unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
