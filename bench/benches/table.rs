// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use criterion::BatchSize;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use fft::api::TableParams;
use fft::ddi::time::Timestamp;
use fft::engine::LinkType;
use fft::engine::Packet;
use fft_bench::*;
use std::hint::black_box;

const LOOKUPS: usize = 256;

fn t0() -> Timestamp {
    Timestamp::from_millis(1_000)
}

fn t1() -> Timestamp {
    Timestamp::from_millis(1_500)
}

pub fn parse<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let keys = random_keys(LOOKUPS, 1);
    let frames = pkts_for(&keys, t0())
        .into_iter()
        .map(|p| p.bytes().to_vec())
        .collect::<Vec<_>>();

    let mut c = c.benchmark_group(format!("parse/{}", M::label()));
    c.throughput(Throughput::Elements(LOOKUPS as u64));
    c.bench_function("ipv4-tcp", |b| {
        b.iter_batched(
            || frames.clone(),
            |frames| {
                for f in frames {
                    black_box(Packet::new(f, LinkType::Ip, t0()));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn insert<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("insert/{}", M::label()));
    c.throughput(Throughput::Elements(LOOKUPS as u64));

    for size in TABLE_SIZES {
        let keys = random_keys(size, 2);
        let mut ft = filled_table(&keys, TableParams::default(), t0());
        let descs = pkts_for(&keys[..LOOKUPS], t1())
            .iter()
            .filter_map(Packet::flow_desc)
            .collect::<Vec<_>>();

        // Overwrites leave the table's shape untouched, so every
        // iteration sees the same table.
        let id = BenchmarkId::new("overwrite", size);
        c.bench_with_input(id, &size, |b, _| {
            b.iter(|| {
                for d in &descs {
                    let _ = black_box(ft.insert_desc(d, 1, true));
                }
            })
        });

        let id = BenchmarkId::new("fresh", size);
        c.bench_with_input(id, &size, |b, _| {
            b.iter(|| {
                for d in &descs {
                    let _ = black_box(ft.insert_desc(d, 1, false));
                }
            })
        });
    }
}

pub fn verify<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("verify/{}", M::label()));
    c.throughput(Throughput::Elements(LOOKUPS as u64));

    for size in TABLE_SIZES {
        let keys = random_keys(size, 4);
        let mut ft = filled_table(&keys, TableParams::default(), t0());

        c.bench_with_input(BenchmarkId::new("hit", size), &size, |b, _| {
            b.iter(|| {
                for k in &keys[..LOOKUPS] {
                    black_box(ft.verify(k, t1(), TTL));
                }
            })
        });

        let misses = random_keys(LOOKUPS, 5);
        c.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| {
                for k in &misses {
                    black_box(ft.verify(k, t1(), TTL));
                }
            })
        });
    }
}

pub fn route<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("route/{}", M::label()));
    c.throughput(Throughput::Elements(LOOKUPS as u64));

    for size in TABLE_SIZES {
        let keys = random_keys(size, 6);
        let ft = filled_table(&keys, TableParams::default(), t0());

        c.bench_with_input(BenchmarkId::new("hit", size), &size, |b, _| {
            b.iter(|| {
                for k in &keys[..LOOKUPS] {
                    let mut next_hop = None;
                    black_box(ft.route(k, &mut next_hop));
                }
            })
        });
    }
}

pub fn gc<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("gc/{}", M::label()));

    // Nothing expires, so each sweep walks the same records.
    for size in TABLE_SIZES {
        let keys = random_keys(size, 7);
        let mut ft = filled_table(&keys, TableParams::default(), t0());
        let seed = keys[0];

        let id = BenchmarkId::new("bucket", size);
        c.bench_with_input(id, &size, |b, _| {
            b.iter(|| black_box(ft.bucket_garbage_collection(&seed, t1())))
        });

        let id = BenchmarkId::new("global", size);
        c.bench_with_input(id, &size, |b, _| {
            b.iter(|| black_box(ft.global_garbage_collection(t1())))
        });
    }
}

criterion_group!(table_wall, parse, insert, verify, route, gc);
criterion_main!(table_wall);
