use std::{collections::HashMap, hint::black_box};

use cereal::{DataType, Reader, Value, Writer};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

fn mixed_records() -> Vec<Value> {
    let mut map = HashMap::new();
    map.insert("id".to_string(), Value::UnsignedInteger(42));
    map.insert("name".to_string(), Value::String("cereal".into()));

    (0..100)
        .map(|i| match i % 5 {
            0 => Value::Integer(-i),
            1 => Value::String(format!("key{i}")),
            2 => Value::Float(i as f64 * 0.5),
            3 => Value::StringSlice(vec!["a".into(), "bb".into(), "ccc".into()]),
            _ => Value::KeyValueMap(map.clone()),
        })
        .collect()
}

fn encode(records: &[Value]) -> Vec<u8> {
    let mut w = Writer::from_buffer();
    for r in records {
        w.write(r).unwrap();
    }
    w.into_inner().unwrap()
}

fn bench_write_records(c: &mut Criterion) {
    let records = mixed_records();
    c.bench_function("write 100 mixed records", |b| {
        b.iter(|| black_box(encode(black_box(&records))))
    });
}

fn bench_read_records(c: &mut Criterion) {
    let bytes = encode(&mixed_records());
    c.bench_function("read 100 mixed records", |b| {
        b.iter(|| {
            let mut r = Reader::from_buffer(bytes.clone());
            for _ in 0..100 {
                black_box(r.read(DataType::Any).unwrap());
            }
        })
    });
}

fn bench_compressed_block(c: &mut Criterion) {
    let payload: Vec<u8> = (0..256 * 1024u32).map(|i| (i % 97) as u8).collect();

    let mut group = c.benchmark_group("compressed block");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("write 256 KiB", |b| {
        b.iter(|| {
            let mut w = Writer::from_buffer();
            w.write_compressed_block(black_box(&payload)).unwrap();
            black_box(w.into_inner().unwrap())
        })
    });

    let mut w = Writer::from_buffer();
    w.write_compressed_block(&payload).unwrap();
    let compressed = w.into_inner().unwrap();
    group.bench_function("read 256 KiB", |b| {
        let mut out = vec![0u8; 64 * 1024];
        b.iter(|| {
            let mut r = Reader::from_buffer(compressed.clone());
            for _ in 0..4 {
                r.read_compressed_block(&mut out).unwrap();
            }
            black_box(&out);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_write_records,
    bench_read_records,
    bench_compressed_block
);
criterion_main!(benches);
