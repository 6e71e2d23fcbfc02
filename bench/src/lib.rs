// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Workloads for flow table benchmarks.

use criterion::measurement::Measurement;
use criterion::measurement::WallTime;
use fft::api::FlowKey;
use fft::api::TableParams;
use fft::ddi::time::Timestamp;
use fft::engine::FlowTable;
use fft::engine::Packet;
use fft_test_utils::tcp_pkt;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::Ipv4Addr;

/// Additional labelling information for [`Measurement`]s for
/// pretty-printing and grouping.
pub trait MeasurementInfo: Measurement {
    fn label() -> &'static str;
}

impl MeasurementInfo for WallTime {
    fn label() -> &'static str {
        "wallclock"
    }
}

/// Table sizes each benchmark is run against.
pub const TABLE_SIZES: [usize; 3] = [1_000, 10_000, 100_000];

/// The TTL every workload packet carries.
pub const TTL: u8 = 64;

/// Generate up to `n` distinct keys from a fixed seed, so every run
/// sees the same table layout.
pub fn random_keys(n: usize, seed: u64) -> Vec<FlowKey> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys = (0..n)
        .map(|_| {
            FlowKey::new(
                Ipv4Addr::from(rng.random::<u32>()),
                Ipv4Addr::from(rng.random::<u32>()),
                rng.random(),
                rng.random(),
            )
        })
        .collect::<Vec<_>>();

    keys.sort();
    keys.dedup();
    keys
}

/// A table holding a record for each of `keys`, all last seen at
/// `ts` on a port derived from the key.
pub fn filled_table(
    keys: &[FlowKey],
    params: TableParams,
    ts: Timestamp,
) -> FlowTable {
    let mut ft = FlowTable::new(params);
    for (i, key) in keys.iter().enumerate() {
        // Keys are distinct so nothing is declined.
        let _ = ft.insert(*key, ts, None, (i % 4) as u8, TTL, true);
    }
    ft
}

/// One TCP packet per key.
pub fn pkts_for(keys: &[FlowKey], ts: Timestamp) -> Vec<Packet> {
    keys.iter().map(|k| tcp_pkt(*k, TTL, ts)).collect()
}
