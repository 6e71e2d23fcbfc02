// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Read-only views of flow table state.

use super::cmd::CmdOk;
use super::flow::FlowKey;
use serde::Deserialize;
use serde::Serialize;
use std::net::Ipv4Addr;

/// A single flow record, as presented by a table dump.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlowDumpEntry {
    /// The bucket the key hashes to at the time of the dump.
    pub bucket: u64,
    pub key: FlowKey,
    pub port: u8,
    pub gateway: Option<Ipv4Addr>,
    pub ttl: u8,
    /// Milliseconds since the record was last refreshed. Negative when
    /// the record is stamped in the future.
    pub age_ms: i64,
    pub stats: Option<FlowStatsDump>,
}

/// Per-record packet accounting, present only when the engine is
/// built with `detailed-stats`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlowStatsDump {
    /// Nanoseconds since the Unix epoch.
    pub first_ns: i64,
    /// Nanoseconds since the Unix epoch.
    pub last_ns: i64,
    pub packets: u32,
    pub bytes: u64,
}

/// A snapshot of the flow table counters.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableStatsSnap {
    /// Records written by an insert.
    pub insert: u64,
    /// Inserts declined because a fresh record already existed.
    pub insert_fresh: u64,
    pub verify_hit: u64,
    pub verify_miss: u64,
    pub route_hit: u64,
    pub route_miss: u64,
    /// Records removed by bucket garbage collection.
    pub gc_bucket: u64,
    /// Records removed by full garbage collection sweeps.
    pub gc_global: u64,
    /// Records removed because their egress port went away.
    pub port_removed: u64,
}

impl CmdOk for TableStatsSnap {}
