// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Flow table counters.

use crate::api::TableStatsSnap;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

/// A monotonically increasing counter.
///
/// Atomic so that it may be bumped from behind a shared reference,
/// e.g. by a route lookup holding only the table's read lock.
#[derive(Debug, Default)]
pub struct StatU64 {
    value: AtomicU64,
}

impl StatU64 {
    pub const fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn incr(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn val(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct TableStats {
    /// The number of records written by an insert.
    pub insert: StatU64,

    /// The number of inserts declined because an existing record was
    /// still fresh.
    pub insert_fresh: StatU64,

    /// The number of verifies which found a fresh, loop-free record.
    pub verify_hit: StatU64,

    /// The number of verifies which found no record, or found one
    /// that was expired or looping.
    pub verify_miss: StatU64,

    pub route_hit: StatU64,
    pub route_miss: StatU64,

    /// The number of records removed by bucket garbage collection.
    pub gc_bucket: StatU64,

    /// The number of records removed by a full sweep.
    pub gc_global: StatU64,

    /// The number of records removed along with their egress port.
    pub port_removed: StatU64,
}

impl TableStats {
    pub fn snap(&self) -> TableStatsSnap {
        TableStatsSnap {
            insert: self.insert.val(),
            insert_fresh: self.insert_fresh.val(),
            verify_hit: self.verify_hit.val(),
            verify_miss: self.verify_miss.val(),
            route_hit: self.route_hit.val(),
            route_miss: self.route_miss.val(),
            gc_bucket: self.gc_bucket.val(),
            gc_global: self.gc_global.val(),
            port_removed: self.port_removed.val(),
        }
    }
}
