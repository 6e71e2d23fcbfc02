// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Replay captured packets through a chain of stages.
//!
//! Each packet visits the configured stages in order: insertion,
//! verification, then routing. A packet the verification stage
//! declares unmatched leaves the chain there and is never routed.

use fft::cfg::InsertCfg;
use fft::cfg::RouteCfg;
use fft::cfg::VerifyCfg;
use fft::ddi::time::Moment;
use fft::ddi::time::Timestamp;
use fft::engine::Packet;
use fft::engine::SharedFlowTable;
use fft::engine::stage::InsertStage;
use fft::engine::stage::RouteStage;
use fft::engine::stage::RouteVerdict;
use fft::engine::stage::VerifyStage;
use fft::engine::stage::VerifyVerdict;
use slog::Logger;
use slog::info;
use std::collections::BTreeMap;

/// Which stages to run. An absent stage is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplayCfg {
    pub insert: Option<InsertCfg>,
    pub verify: Option<VerifyCfg>,
    pub route: Option<RouteCfg>,
    /// Stamp each packet with the wall clock as it is replayed,
    /// instead of keeping its capture time.
    pub restamp: bool,
}

/// What happened to the replayed packets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplaySummary {
    pub packets: u64,
    /// Packets carrying no IPv4 flow.
    pub no_flow: u64,
    pub learned: u64,
    pub matched: u64,
    pub unmatched: u64,
    /// Packets forwarded, by egress port.
    pub forwarded: BTreeMap<u8, u64>,
    pub unrouted: u64,
    pub dropped: u64,
}

pub struct Replayer {
    insert: Option<InsertStage>,
    verify: Option<VerifyStage>,
    route: Option<RouteStage>,
    restamp: bool,
    log: Logger,
}

impl Replayer {
    pub fn new(table: &SharedFlowTable, cfg: &ReplayCfg, log: &Logger) -> Self {
        Self {
            insert: cfg.insert.map(|c| InsertStage::new(table.clone(), c, log)),
            verify: cfg.verify.map(|c| VerifyStage::new(table.clone(), c, log)),
            route: cfg.route.map(|c| RouteStage::new(table.clone(), c, log)),
            restamp: cfg.restamp,
            log: log.clone(),
        }
    }

    pub fn replay(&self, pkts: Vec<Packet>) -> ReplaySummary {
        let mut sum = ReplaySummary::default();
        for pkt in pkts {
            self.replay_one(pkt, &mut sum);
        }

        info!(self.log, "replay done";
            "packets" => sum.packets,
            "learned" => sum.learned,
            "unmatched" => sum.unmatched,
            "unrouted" => sum.unrouted
        );
        sum
    }

    /// Take the insertion stage down, forgetting every flow learned
    /// for its port. Returns the number of records removed, or `None`
    /// when no insertion stage is configured.
    pub fn admin_down(&self) -> Option<usize> {
        self.insert.as_ref().map(|st| st.set_down(Moment::now()))
    }

    /// Bring the insertion stage back up. Returns false when no
    /// insertion stage is configured.
    pub fn admin_up(&self) -> bool {
        self.insert.as_ref().map(InsertStage::set_up).is_some()
    }

    fn replay_one(&self, mut pkt: Packet, sum: &mut ReplaySummary) {
        sum.packets += 1;
        if self.restamp {
            pkt.set_timestamp(Timestamp::now());
        }
        if pkt.flow_key().is_none() {
            sum.no_flow += 1;
        }

        if let Some(insert) = &self.insert {
            if insert.process(&pkt) {
                sum.learned += 1;
            }
        }

        if let Some(verify) = &self.verify {
            match verify.process(&pkt) {
                VerifyVerdict::Matched => sum.matched += 1,
                VerifyVerdict::Unmatched => {
                    sum.unmatched += 1;
                    return;
                }
            }
        }

        if let Some(route) = &self.route {
            match route.process(&mut pkt) {
                RouteVerdict::Forward(p) => {
                    *sum.forwarded.entry(p).or_default() += 1;
                }
                RouteVerdict::Unrouted => sum.unrouted += 1,
                RouteVerdict::Drop => sum.dropped += 1,
            }
        }
    }
}
