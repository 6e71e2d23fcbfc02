// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! The flow table implementation.
//!
//! The table maps a [`FlowKey`] to the forwarding decision last made
//! for that flow. It is a separately chained hash table: a `Vec` of
//! buckets, each a `Vec` of records, indexed by
//! `hashcode % bucket_count`. The explicit buckets are what make
//! incremental garbage collection cheap: after a lookup has touched a
//! bucket, sweeping the rest of that bucket costs only a few more
//! comparisons.
//!
//! # Expiration
//!
//! A record stamped `ts` is expired relative to a reference time
//! `now` when `now - ts`, in whole milliseconds, is either negative or
//! greater than the table's timeout. A negative age means the clock
//! moved backwards relative to the record; such a record is not
//! trusted. The same rule is applied by [`FlowTable::verify`], by the
//! freshness check in [`FlowTable::insert`], and by both garbage
//! collection passes.

use super::stat::TableStats;
use crate::api::DumpFlowsResp;
use crate::api::FlowDumpEntry;
use crate::api::FlowKey;
use crate::api::ParamSet;
use crate::api::TableInfoResp;
use crate::api::TableParams;
use crate::api::TableStatsSnap;
use crate::ddi::sync::KRwLock;
use crate::ddi::time::Timestamp;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "detailed-stats")]
use crate::api::FlowStatsDump;
#[cfg(feature = "detailed-stats")]
use std::collections::VecDeque;

/// The number of buckets a table starts with by default.
pub const DEF_BUCKETS: usize = 64;

/// The table doubles its bucket count once it holds more than this
/// many records per bucket.
pub const MAX_LOAD_FACTOR: usize = 2;

/// The bucket count never grows past this.
pub const MAX_BUCKETS: usize = 1 << 24;

/// The number of overwritten records retained for dumps.
#[cfg(feature = "detailed-stats")]
pub const OVERWRITE_HISTORY_MAX: usize = 1024;

/// A table shared between pipeline stages.
pub type SharedFlowTable = Arc<KRwLock<FlowTable>>;

/// An insert was declined: a fresh, loop-consistent record already
/// exists for the flow.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("fresh record already exists")]
pub struct AlreadyFresh;

/// A packet, reduced to what the flow table needs from it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlowDesc {
    pub key: FlowKey,
    pub ts: Timestamp,
    pub ttl: u8,
    /// The length of the packet in bytes.
    pub len: usize,
    /// The packet's destination annotation. Recorded as the flow's
    /// gateway by a packet-derived insert.
    pub next_hop: Option<Ipv4Addr>,
}

#[cfg(feature = "detailed-stats")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlowStats {
    pub first: Timestamp,
    pub last: Timestamp,
    pub packets: u32,
    pub bytes: u64,
}

#[cfg(feature = "detailed-stats")]
impl FlowStats {
    fn new(ts: Timestamp, len: usize) -> Self {
        Self { first: ts, last: ts, packets: 1, bytes: len as u64 }
    }

    fn record(&mut self, ts: Timestamp, len: usize) {
        self.last = ts;
        self.packets = self.packets.saturating_add(1);
        self.bytes = self.bytes.saturating_add(len as u64);
    }

    fn dump(&self) -> FlowStatsDump {
        FlowStatsDump {
            first_ns: self.first.as_nanos(),
            last_ns: self.last.as_nanos(),
            packets: self.packets,
            bytes: self.bytes,
        }
    }
}

/// The forwarding state of a single flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlowRecord {
    last_seen: Timestamp,
    port: u8,
    gateway: Option<Ipv4Addr>,
    ttl: u8,
    #[cfg(feature = "detailed-stats")]
    stats: FlowStats,
}

impl FlowRecord {
    fn new(
        ts: Timestamp,
        gateway: Option<Ipv4Addr>,
        port: u8,
        ttl: u8,
        len: usize,
    ) -> Self {
        #[cfg(not(feature = "detailed-stats"))]
        let _ = len;

        Self {
            last_seen: ts,
            port,
            // The unspecified address means "no override".
            gateway: gateway.filter(|gw| !gw.is_unspecified()),
            ttl,
            #[cfg(feature = "detailed-stats")]
            stats: FlowStats::new(ts, len),
        }
    }

    fn refresh(&mut self, ts: Timestamp, len: usize) {
        self.last_seen = ts;
        #[cfg(feature = "detailed-stats")]
        self.stats.record(ts, len);
        #[cfg(not(feature = "detailed-stats"))]
        let _ = len;
    }

    /// The time of the last packet to insert or refresh this record.
    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn gateway(&self) -> Option<Ipv4Addr> {
        self.gateway
    }

    /// The IP TTL this flow was last seen with.
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    #[cfg(feature = "detailed-stats")]
    pub fn stats(&self) -> &FlowStats {
        &self.stats
    }
}

/// Is a record last seen at `ts` expired relative to `now`?
pub fn is_expired(ts: Timestamp, now: Timestamp, timeout_ms: u32) -> bool {
    let age = now.delta_as_millis(ts);
    age < 0 || age > i64::from(timeout_ms)
}

type Bucket = Vec<(FlowKey, FlowRecord)>;

#[derive(Debug)]
pub struct FlowTable {
    buckets: Vec<Bucket>,
    len: usize,
    params: TableParams,
    stats: TableStats,
    #[cfg(feature = "detailed-stats")]
    overwritten: VecDeque<FlowDumpEntry>,
}

impl Default for FlowTable {
    fn default() -> Self {
        Self::new(TableParams::default())
    }
}

impl FlowTable {
    pub fn new(params: TableParams) -> Self {
        Self::with_buckets(params, DEF_BUCKETS)
    }

    /// Create a table starting out with `nbuckets` buckets. The count
    /// is clamped to `1..=MAX_BUCKETS`.
    pub fn with_buckets(params: TableParams, nbuckets: usize) -> Self {
        let nbuckets = nbuckets.clamp(1, MAX_BUCKETS);
        Self {
            buckets: (0..nbuckets).map(|_| Vec::new()).collect(),
            len: 0,
            params,
            stats: TableStats::default(),
            #[cfg(feature = "detailed-stats")]
            overwritten: VecDeque::new(),
        }
    }

    /// Wrap this table for sharing between stages.
    pub fn into_shared(self) -> SharedFlowTable {
        Arc::new(KRwLock::new(self))
    }

    /// The bucket `key` lives in.
    pub fn bucket_of(&self, key: &FlowKey) -> usize {
        key.hashcode() as usize % self.buckets.len()
    }

    fn find(&self, key: &FlowKey) -> Option<(usize, usize)> {
        let b = self.bucket_of(key);
        self.buckets[b].iter().position(|(k, _)| k == key).map(|i| (b, i))
    }

    pub fn get(&self, key: &FlowKey) -> Option<&FlowRecord> {
        self.find(key).map(|(b, i)| &self.buckets[b][i].1)
    }

    /// Insert a record for `key`.
    ///
    /// Unless `overwrite` is set, an existing record which is not
    /// expired relative to `ts` is left alone and [`AlreadyFresh`] is
    /// returned. With loop avoidance on, a TTL different from the one
    /// recorded lifts that protection: the flow has changed path.
    ///
    /// # Errors
    ///
    /// [`AlreadyFresh`] when the insert was declined. The table is
    /// unchanged.
    pub fn insert(
        &mut self,
        key: FlowKey,
        ts: Timestamp,
        gateway: Option<Ipv4Addr>,
        port: u8,
        ttl: u8,
        overwrite: bool,
    ) -> Result<(), AlreadyFresh> {
        // A hand-added flow counts as one packet with no payload.
        let rec = FlowRecord::new(ts, gateway, port, ttl, 0);
        self.insert_record(key, rec, overwrite)
    }

    /// Insert a record learned from a packet. The packet's destination
    /// annotation becomes the flow's gateway.
    ///
    /// # Errors
    ///
    /// See [`FlowTable::insert`].
    pub fn insert_desc(
        &mut self,
        desc: &FlowDesc,
        port: u8,
        overwrite: bool,
    ) -> Result<(), AlreadyFresh> {
        let rec =
            FlowRecord::new(desc.ts, desc.next_hop, port, desc.ttl, desc.len);
        self.insert_record(desc.key, rec, overwrite)
    }

    fn insert_record(
        &mut self,
        key: FlowKey,
        rec: FlowRecord,
        overwrite: bool,
    ) -> Result<(), AlreadyFresh> {
        let ts = rec.last_seen;

        match self.find(&key) {
            Some((b, i)) => {
                let old = self.buckets[b][i].1;

                if !overwrite
                    && !is_expired(old.last_seen, ts, self.params.timeout_ms)
                    && (!self.params.loop_avoidance || old.ttl == rec.ttl)
                {
                    self.stats.insert_fresh.incr(1);
                    return Err(AlreadyFresh);
                }

                #[cfg(feature = "detailed-stats")]
                self.remember_overwritten(b, &key, &old, ts);

                self.buckets[b][i].1 = rec;
            }

            None => {
                let b = self.bucket_of(&key);
                self.buckets[b].push((key, rec));
                self.len += 1;
                self.maybe_grow();
            }
        }

        self.stats.insert.incr(1);

        if self.params.gc_on_add {
            self.bucket_garbage_collection(&key, ts);
        }

        Ok(())
    }

    #[cfg(feature = "detailed-stats")]
    fn remember_overwritten(
        &mut self,
        bucket: usize,
        key: &FlowKey,
        old: &FlowRecord,
        now: Timestamp,
    ) {
        if self.overwritten.len() == OVERWRITE_HISTORY_MAX {
            self.overwritten.pop_front();
        }
        let entry = dump_entry(bucket, key, old, now);
        self.overwritten.push_back(entry);
    }

    fn maybe_grow(&mut self) {
        let nbuckets = self.buckets.len();
        if self.len <= nbuckets * MAX_LOAD_FACTOR || nbuckets >= MAX_BUCKETS {
            return;
        }

        let new_count = (nbuckets * 2).min(MAX_BUCKETS);
        let old = core::mem::replace(
            &mut self.buckets,
            (0..new_count).map(|_| Vec::new()).collect(),
        );

        for (key, rec) in old.into_iter().flatten() {
            let b = key.hashcode() as usize % new_count;
            self.buckets[b].push((key, rec));
        }
    }

    /// Check that `key` has a usable record at time `ts` for a packet
    /// with IP TTL `ttl`, refreshing the record if so.
    ///
    /// A record is unusable if it is expired, or if loop avoidance is
    /// on and `ttl` differs from the recorded TTL.
    pub fn verify(&mut self, key: &FlowKey, ts: Timestamp, ttl: u8) -> bool {
        self.verify_inner(key, ts, ttl, 0)
    }

    /// Verify the flow of a classified packet.
    pub fn verify_desc(&mut self, desc: &FlowDesc) -> bool {
        self.verify_inner(&desc.key, desc.ts, desc.ttl, desc.len)
    }

    fn verify_inner(
        &mut self,
        key: &FlowKey,
        ts: Timestamp,
        ttl: u8,
        len: usize,
    ) -> bool {
        let Some((b, i)) = self.find(key) else {
            self.stats.verify_miss.incr(1);
            return false;
        };

        let timeout_ms = self.params.timeout_ms;
        let loop_avoidance = self.params.loop_avoidance;
        let rec = &mut self.buckets[b][i].1;

        let hit = !is_expired(rec.last_seen, ts, timeout_ms)
            && !(loop_avoidance && rec.ttl != ttl);

        if hit {
            rec.refresh(ts, len);
            self.stats.verify_hit.incr(1);
        } else {
            self.stats.verify_miss.incr(1);
        }

        if self.params.gc_on_check {
            self.bucket_garbage_collection(key, ts);
        }

        hit
    }

    /// Look up the egress port of `key`.
    ///
    /// If the record has a gateway, it is written to `next_hop`;
    /// otherwise `next_hop` is left alone. No expiration check is
    /// made: a stale record still routes until it is collected.
    pub fn route(
        &self,
        key: &FlowKey,
        next_hop: &mut Option<Ipv4Addr>,
    ) -> Option<u8> {
        let Some(rec) = self.get(key) else {
            self.stats.route_miss.incr(1);
            return None;
        };

        if let Some(gw) = rec.gateway {
            *next_hop = Some(gw);
        }

        self.stats.route_hit.incr(1);
        Some(rec.port)
    }

    /// Remove every record egressing `port`, returning the number
    /// removed.
    pub fn remove_by_port(&mut self, port: u8) -> usize {
        let removed = self.retain(|_, rec| rec.port != port);
        self.stats.port_removed.incr(removed as u64);
        removed
    }

    /// Remove every record which is expired relative to `now`,
    /// returning the number removed.
    pub fn global_garbage_collection(&mut self, now: Timestamp) -> usize {
        let timeout_ms = self.params.timeout_ms;
        let removed =
            self.retain(|_, rec| !is_expired(rec.last_seen, now, timeout_ms));
        self.stats.gc_global.incr(removed as u64);
        removed
    }

    /// Remove the expired records sharing a bucket with `seed`,
    /// `seed` included, returning the number removed.
    ///
    /// Nothing happens unless `seed` is present. The seed is first
    /// moved to the head of its bucket so that a live flow is found
    /// on the first probe next time.
    pub fn bucket_garbage_collection(
        &mut self,
        seed: &FlowKey,
        ts: Timestamp,
    ) -> usize {
        let Some((b, i)) = self.find(seed) else {
            return 0;
        };

        let timeout_ms = self.params.timeout_ms;
        let bucket = &mut self.buckets[b];
        bucket[..=i].rotate_right(1);

        let before = bucket.len();
        bucket.retain(|(_, rec)| !is_expired(rec.last_seen, ts, timeout_ms));
        let removed = before - bucket.len();

        self.len -= removed;
        self.stats.gc_bucket.incr(removed as u64);
        removed
    }

    // Keep only the records for which `f` is true, returning the
    // number removed.
    fn retain<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&FlowKey, &FlowRecord) -> bool,
    {
        let before = self.len;
        for bucket in &mut self.buckets {
            bucket.retain(|(k, rec)| f(k, rec));
        }
        self.len = self.buckets.iter().map(Vec::len).sum();
        before - self.len
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
        #[cfg(feature = "detailed-stats")]
        self.overwritten.clear();
    }

    /// The number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The number of records in the most occupied bucket.
    pub fn max_bucket_size(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn info(&self) -> TableInfoResp {
        TableInfoResp {
            size: self.len as u64,
            bucket_count: self.bucket_count() as u64,
            max_bucket_size: self.max_bucket_size() as u64,
        }
    }

    pub fn params(&self) -> TableParams {
        self.params
    }

    pub fn set_param(&mut self, p: ParamSet) {
        self.params.apply(p);
    }

    pub fn stats(&self) -> TableStatsSnap {
        self.stats.snap()
    }

    /// Dump the records, with ages relative to `now`.
    ///
    /// With `active_only`, expired records are skipped. Otherwise any
    /// retained history of overwritten records is included as well.
    pub fn dump(&self, active_only: bool, now: Timestamp) -> DumpFlowsResp {
        let timeout_ms = self.params.timeout_ms;
        let mut flows = Vec::with_capacity(self.len);

        for (b, bucket) in self.buckets.iter().enumerate() {
            for (key, rec) in bucket {
                if active_only && is_expired(rec.last_seen, now, timeout_ms) {
                    continue;
                }
                flows.push(dump_entry(b, key, rec, now));
            }
        }

        #[cfg(feature = "detailed-stats")]
        let overwritten = if active_only {
            vec![]
        } else {
            self.overwritten.iter().cloned().collect()
        };
        #[cfg(not(feature = "detailed-stats"))]
        let overwritten = vec![];

        DumpFlowsResp { overwritten, flows }
    }
}

fn dump_entry(
    bucket: usize,
    key: &FlowKey,
    rec: &FlowRecord,
    now: Timestamp,
) -> FlowDumpEntry {
    FlowDumpEntry {
        bucket: bucket as u64,
        key: *key,
        port: rec.port,
        gateway: rec.gateway,
        ttl: rec.ttl,
        age_ms: now.delta_as_millis(rec.last_seen),
        #[cfg(feature = "detailed-stats")]
        stats: Some(rec.stats.dump()),
        #[cfg(not(feature = "detailed-stats"))]
        stats: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    const A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const GW: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);

    fn ms(n: i64) -> Timestamp {
        Timestamp::from_millis(n)
    }

    fn key(sport: u16) -> FlowKey {
        FlowKey::new(A, B, sport, 1234)
    }

    fn params(timeout_ms: u32) -> TableParams {
        TableParams { timeout_ms, ..Default::default() }
    }

    // Find `n` keys in each of two distinct buckets of `ft`.
    fn colliding_keys(ft: &FlowTable, n: usize) -> (Vec<FlowKey>, Vec<FlowKey>) {
        let mut by_bucket: BTreeMap<usize, Vec<FlowKey>> = BTreeMap::new();
        for sport in 1..u16::MAX {
            let k = key(sport);
            by_bucket.entry(ft.bucket_of(&k)).or_default().push(k);
            let full: Vec<_> =
                by_bucket.values().filter(|v| v.len() >= n).collect();
            if full.len() >= 2 {
                return (full[0][..n].to_vec(), full[1][..n].to_vec());
            }
        }
        panic!("not enough colliding keys");
    }

    #[test]
    fn worked_example() {
        let mut ft = FlowTable::new(params(500));
        let k = key(80);
        assert_eq!(ft.insert(k, ms(0), None, 1, 64, false), Ok(()));
        assert!(ft.verify(&k, ms(100), 64));
        assert_eq!(ft.get(&k).unwrap().last_seen(), ms(100));
        assert!(!ft.verify(&k, ms(700), 64));
        // A miss never refreshes.
        assert_eq!(ft.get(&k).unwrap().last_seen(), ms(100));
    }

    #[test]
    fn uniqueness() {
        let mut ft = FlowTable::default();
        let k = key(80);
        ft.insert(k, ms(0), None, 1, 64, true).unwrap();
        ft.insert(k, ms(5), Some(GW), 2, 63, true).unwrap();
        assert_eq!(ft.len(), 1);
        let rec = ft.get(&k).unwrap();
        assert_eq!(rec.port(), 2);
        assert_eq!(rec.gateway(), Some(GW));
        assert_eq!(rec.ttl(), 63);
        assert_eq!(rec.last_seen(), ms(5));
    }

    #[test]
    fn freshness_gate() {
        let mut ft = FlowTable::new(params(500));
        let k = key(80);
        ft.insert(k, ms(0), None, 1, 64, false).unwrap();
        assert_eq!(ft.insert(k, ms(499), None, 2, 64, false), Err(AlreadyFresh));
        assert_eq!(ft.insert(k, ms(500), None, 2, 64, false), Err(AlreadyFresh));
        assert_eq!(ft.get(&k).unwrap().port(), 1);
        assert_eq!(ft.insert(k, ms(501), None, 2, 64, false), Ok(()));
        assert_eq!(ft.get(&k).unwrap().port(), 2);

        // Overwrite ignores freshness.
        assert_eq!(ft.insert(k, ms(502), None, 3, 64, true), Ok(()));
        assert_eq!(ft.get(&k).unwrap().port(), 3);

        let snap = ft.stats();
        assert_eq!(snap.insert, 3);
        assert_eq!(snap.insert_fresh, 2);
    }

    #[test]
    fn loop_avoidance() {
        let mut ft = FlowTable::new(params(500));
        let k = key(80);
        ft.insert(k, ms(0), None, 1, 64, false).unwrap();
        assert_eq!(ft.insert(k, ms(10), None, 2, 63, false), Ok(()));
        assert_eq!(ft.get(&k).unwrap().ttl(), 63);

        // A TTL change makes verify miss.
        assert!(!ft.verify(&k, ms(20), 62));
        assert!(ft.verify(&k, ms(20), 63));

        ft.set_param(ParamSet::LoopAvoidance(false));
        assert_eq!(ft.insert(k, ms(30), None, 3, 10, false), Err(AlreadyFresh));
        assert!(ft.verify(&k, ms(40), 1));
    }

    #[test]
    fn expiration_symmetry() {
        let mut ft = FlowTable::new(params(500));
        let k = key(80);
        ft.insert(k, ms(1000), None, 1, 64, false).unwrap();

        // Behind the record: a clock anomaly.
        assert!(!ft.verify(&k, ms(999), 64));
        // Too far ahead.
        assert!(!ft.verify(&k, ms(1501), 64));
        assert!(ft.verify(&k, ms(1500), 64));

        // A record in the future is replaceable by a non-overwriting
        // insert, too.
        ft.insert(key(81), ms(5000), None, 1, 64, false).unwrap();
        assert_eq!(ft.insert(key(81), ms(4000), None, 2, 64, false), Ok(()));
    }

    #[test]
    fn verify_absent() {
        let mut ft = FlowTable::default();
        assert!(!ft.verify(&key(1), ms(0), 64));
        assert_eq!(ft.len(), 0);
        assert_eq!(ft.stats().verify_miss, 1);
    }

    #[test]
    fn bucket_gc_locality() {
        let mut ft = FlowTable::with_buckets(params(100), 4);
        let (same, other) = colliding_keys(&ft, 3);

        // same[0] and same[2] go stale; same[1] stays fresh.
        ft.insert(same[0], ms(0), None, 1, 64, false).unwrap();
        ft.insert(same[1], ms(900), None, 1, 64, false).unwrap();
        ft.insert(same[2], ms(0), None, 1, 64, false).unwrap();
        for k in &other {
            ft.insert(*k, ms(0), None, 1, 64, false).unwrap();
        }
        assert_eq!(ft.bucket_count(), 4);
        assert_eq!(ft.len(), 6);

        assert_eq!(ft.bucket_garbage_collection(&same[1], ms(1000)), 2);
        assert!(ft.get(&same[0]).is_none());
        assert!(ft.get(&same[1]).is_some());
        assert!(ft.get(&same[2]).is_none());
        for k in &other {
            assert!(ft.get(k).is_some());
        }
        assert_eq!(ft.len(), 4);
        assert_eq!(ft.stats().gc_bucket, 2);

        // An expired seed collects itself.
        assert_eq!(ft.bucket_garbage_collection(&other[0], ms(1000)), 3);
        assert_eq!(ft.len(), 1);

        // An absent seed collects nothing.
        assert_eq!(ft.bucket_garbage_collection(&key(0), ms(5000)), 0);
    }

    #[test]
    fn gc_on_add_and_check() {
        let mut ft = FlowTable::with_buckets(params(100), 4);
        let (same, _) = colliding_keys(&ft, 3);

        ft.insert(same[0], ms(0), None, 1, 64, false).unwrap();
        ft.set_param(ParamSet::GcOnAdd(true));
        ft.insert(same[1], ms(500), None, 1, 64, false).unwrap();
        assert!(ft.get(&same[0]).is_none());
        assert_eq!(ft.len(), 1);

        ft.set_param(ParamSet::GcOnAdd(false));
        ft.insert(same[2], ms(500), None, 1, 64, false).unwrap();
        ft.set_param(ParamSet::GcOnCheck(true));
        // A missed verify still collects, the seed included.
        assert!(!ft.verify(&same[1], ms(1000), 64));
        assert_eq!(ft.len(), 0);
    }

    #[test]
    fn global_gc() {
        let mut ft = FlowTable::new(params(100));
        for sport in 0..50 {
            let ts = if sport % 2 == 0 { ms(0) } else { ms(950) };
            ft.insert(key(sport), ts, None, 1, 64, false).unwrap();
        }
        assert_eq!(ft.global_garbage_collection(ms(1000)), 25);
        assert_eq!(ft.len(), 25);
        assert!(ft.get(&key(1)).is_some());
        assert!(ft.get(&key(2)).is_none());
        assert_eq!(ft.stats().gc_global, 25);
    }

    #[test]
    fn port_removal() {
        let mut ft = FlowTable::default();
        for sport in 0..30 {
            ft.insert(key(sport), ms(0), None, (sport % 3) as u8, 64, false)
                .unwrap();
        }
        assert_eq!(ft.remove_by_port(1), 10);
        assert_eq!(ft.len(), 20);
        for sport in 0..30 {
            let rec = ft.get(&key(sport));
            if sport % 3 == 1 {
                assert!(rec.is_none());
            } else {
                assert_eq!(rec.unwrap().port(), (sport % 3) as u8);
            }
        }
        assert_eq!(ft.remove_by_port(1), 0);
    }

    #[test]
    fn route_rewrite() {
        let mut ft = FlowTable::default();
        ft.insert(key(1), ms(0), Some(GW), 4, 64, false).unwrap();
        ft.insert(key(2), ms(0), None, 5, 64, false).unwrap();
        // The unspecified address is no gateway at all.
        ft.insert(key(3), ms(0), Some(Ipv4Addr::UNSPECIFIED), 6, 64, false)
            .unwrap();

        let mut nh = Some(B);
        assert_eq!(ft.route(&key(1), &mut nh), Some(4));
        assert_eq!(nh, Some(GW));

        let mut nh = Some(B);
        assert_eq!(ft.route(&key(2), &mut nh), Some(5));
        assert_eq!(nh, Some(B));
        assert_eq!(ft.route(&key(3), &mut nh), Some(6));
        assert_eq!(nh, Some(B));

        let mut nh = Some(B);
        assert_eq!(ft.route(&key(9), &mut nh), None);
        assert_eq!(nh, Some(B));

        // No expiry check on route.
        ft.set_param(ParamSet::Timeout(0));
        assert_eq!(ft.route(&key(1), &mut nh), Some(4));

        let snap = ft.stats();
        assert_eq!((snap.route_hit, snap.route_miss), (4, 1));
    }

    #[test]
    fn insert_desc_records_next_hop() {
        let mut ft = FlowTable::new(params(500));
        let desc = FlowDesc {
            key: key(7),
            ts: ms(0),
            ttl: 64,
            len: 100,
            next_hop: Some(GW),
        };
        ft.insert_desc(&desc, 2, true).unwrap();
        assert_eq!(ft.get(&key(7)).unwrap().gateway(), Some(GW));
        assert_eq!(ft.insert_desc(&desc, 3, false), Err(AlreadyFresh));
        assert!(ft.verify_desc(&FlowDesc { ts: ms(10), ..desc }));
    }

    #[test]
    fn grows_and_keeps_records() {
        let mut ft = FlowTable::with_buckets(TableParams::default(), 2);
        for sport in 0..100 {
            ft.insert(key(sport), ms(0), None, 1, 64, false).unwrap();
        }
        assert_eq!(ft.len(), 100);
        assert!(ft.bucket_count() >= 50);
        assert!(ft.bucket_count().is_power_of_two());
        for sport in 0..100 {
            assert!(ft.get(&key(sport)).is_some());
        }
        let info = ft.info();
        assert_eq!(info.size, 100);
        assert!(info.max_bucket_size >= 1);
    }

    #[test]
    fn dump_and_clear() {
        let mut ft = FlowTable::new(params(100));
        ft.insert(key(1), ms(0), None, 1, 64, false).unwrap();
        ft.insert(key(2), ms(950), None, 2, 64, false).unwrap();

        let all = ft.dump(false, ms(1000));
        assert_eq!(all.flows.len(), 2);
        let active = ft.dump(true, ms(1000));
        assert_eq!(active.flows.len(), 1);
        let e = &active.flows[0];
        assert_eq!(e.key, key(2));
        assert_eq!(e.port, 2);
        assert_eq!(e.age_ms, 50);
        assert_eq!(e.bucket, ft.bucket_of(&key(2)) as u64);

        ft.clear();
        assert_eq!(ft.len(), 0);
        assert!(ft.dump(false, ms(1000)).flows.is_empty());
        assert!(ft.dump(false, ms(1000)).overwritten.is_empty());
    }

    #[cfg(feature = "detailed-stats")]
    #[test]
    fn detailed_stats() {
        let mut ft = FlowTable::new(params(500));
        let desc = FlowDesc {
            key: key(7),
            ts: ms(0),
            ttl: 64,
            len: 100,
            next_hop: None,
        };
        ft.insert_desc(&desc, 2, true).unwrap();
        assert!(ft.verify_desc(&FlowDesc { ts: ms(10), len: 50, ..desc }));
        let st = *ft.get(&key(7)).unwrap().stats();
        assert_eq!((st.packets, st.bytes), (2, 150));
        assert_eq!((st.first, st.last), (ms(0), ms(10)));

        ft.insert_desc(&FlowDesc { ts: ms(20), ..desc }, 3, true).unwrap();
        let dump = ft.dump(false, ms(20));
        assert_eq!(dump.overwritten.len(), 1);
        assert_eq!(dump.overwritten[0].port, 2);
        assert!(ft.dump(true, ms(20)).overwritten.is_empty());

        // A hand-added flow starts as a single empty packet.
        ft.insert(key(8), ms(30), None, 1, 64, true).unwrap();
        let st = *ft.get(&key(8)).unwrap().stats();
        assert_eq!((st.packets, st.bytes), (1, 0));
        assert_eq!((st.first, st.last), (ms(30), ms(30)));
    }
}
