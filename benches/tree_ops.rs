//! Benchmarks for radix tree operations, with `BTreeMap` as the baseline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cow_radix::{Bytes, Decoder, Encoder, EncoderConfig, RadixTree};
use std::collections::BTreeMap;

fn generate_sequential_keys(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("key:{:08}", i).into_bytes()).collect()
}

fn generate_url_like_keys(n: usize) -> Vec<Vec<u8>> {
    let domains = ["example.com", "test.org", "demo.net", "sample.io"];
    let paths = ["users", "posts", "comments", "api/v1", "api/v2"];

    (0..n)
        .map(|i| {
            let domain = domains[i % domains.len()];
            let path = paths[(i / domains.len()) % paths.len()];
            let id = i / (domains.len() * paths.len());
            format!("{}/{}/{}", domain, path, id).into_bytes()
        })
        .collect()
}

fn build(keys: &[Vec<u8>]) -> RadixTree<u64> {
    let mut tree = RadixTree::new();
    for (i, key) in keys.iter().enumerate() {
        tree.replace_or_insert(key, i as u64);
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_url_like_keys(size);

        group.bench_with_input(BenchmarkId::new("RadixTree", size), &keys, |b, keys| {
            b.iter(|| black_box(build(keys)));
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_sequential_keys(size);
        let tree = build(&keys);
        let btree: BTreeMap<Vec<u8>, u64> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i as u64))
            .collect();

        group.bench_with_input(BenchmarkId::new("RadixTree", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = tree.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = btree.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_snapshot_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_then_write");

    for size in [10_000, 100_000] {
        let keys = generate_url_like_keys(size);
        let mut tree = build(&keys);
        let map: BTreeMap<Vec<u8>, u64> = tree.iter().map(|(k, v)| (k, *v)).collect();

        // One write after a snapshot forks a single path.
        group.bench_function(BenchmarkId::new("RadixTree", size), |b| {
            b.iter(|| {
                let mut snap = tree.snapshot();
                snap.replace_or_insert(b"example.com/users/0", 0);
                black_box(snap)
            });
        });

        // The baseline has to copy everything.
        group.bench_function(BenchmarkId::new("BTreeMap", size), |b| {
            b.iter(|| {
                let mut copy = map.clone();
                copy.insert(b"example.com/users/0".to_vec(), 0);
                black_box(copy)
            });
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.sample_size(20);

    let keys = generate_url_like_keys(100_000);
    let mut tree: RadixTree<Vec<u8>> = RadixTree::new();
    for (i, key) in keys.iter().enumerate() {
        tree.replace_or_insert(key, (i as u32).to_le_bytes().to_vec());
    }
    let plain = Encoder::new(Bytes).encode(&tree).unwrap();
    let packed = Encoder::with_config(Bytes, EncoderConfig::gzip())
        .encode(&tree)
        .unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| black_box(Encoder::new(Bytes).encode(&tree).unwrap()));
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            let back: RadixTree<Vec<u8>> = Decoder::new(Bytes).decode(&plain).unwrap();
            black_box(back)
        });
    });
    group.bench_function("decode_gzip", |b| {
        b.iter(|| {
            let back: RadixTree<Vec<u8>> = Decoder::new(Bytes).decode(&packed).unwrap();
            black_box(back)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_snapshot_write, bench_codec);
criterion_main!(benches);
