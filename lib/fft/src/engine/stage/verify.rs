// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use super::pkt_summary;
use crate::cfg::VerifyCfg;
use crate::engine::flow_table::SharedFlowTable;
use crate::engine::packet::Packet;
use slog::Logger;
use slog::debug;
use slog::o;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerifyVerdict {
    /// The flow has a fresh record, and the packet's TTL agrees with
    /// it. The record has been refreshed.
    Matched,
    Unmatched,
}

/// A batch of packets split by verdict.
#[derive(Debug, Default)]
pub struct Classified {
    pub matched: Vec<Packet>,
    pub unmatched: Vec<Packet>,
}

pub struct VerifyStage {
    table: SharedFlowTable,
    verbose: bool,
    log: Logger,
}

impl VerifyStage {
    pub fn new(table: SharedFlowTable, cfg: VerifyCfg, log: &Logger) -> Self {
        Self {
            table,
            verbose: cfg.verbose,
            log: log.new(o!("stage" => "verify")),
        }
    }

    pub fn process(&self, pkt: &Packet) -> VerifyVerdict {
        let hit = match pkt.flow_desc() {
            Some(desc) => self.table.write().verify_desc(&desc),
            None => false,
        };
        self.verdict(pkt, hit)
    }

    fn verdict(&self, pkt: &Packet, hit: bool) -> VerifyVerdict {
        if self.verbose {
            debug!(self.log, "verify";
                "pkt" => pkt_summary(pkt),
                "hit" => hit
            );
        }

        if hit { VerifyVerdict::Matched } else { VerifyVerdict::Unmatched }
    }

    /// Verify a batch of packets under a single lock acquisition.
    pub fn push_batch(&self, pkts: Vec<Packet>) -> Classified {
        let mut out = Classified::default();
        let mut table = self.table.write();

        for pkt in pkts {
            let hit = match pkt.flow_desc() {
                Some(desc) => table.verify_desc(&desc),
                None => false,
            };

            match self.verdict(&pkt, hit) {
                VerifyVerdict::Matched => out.matched.push(pkt),
                VerifyVerdict::Unmatched => out.unmatched.push(pkt),
            }
        }

        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::FlowKey;
    use crate::api::TableParams;
    use crate::ddi::time::Timestamp;
    use crate::engine::flow_table::FlowTable;
    use crate::engine::packet::LinkType;
    use std::net::Ipv4Addr;

    // UDP 10.0.0.1:53 -> 10.0.0.2:53 with the given TTL.
    fn pkt(ttl: u8, ts_ms: i64) -> Packet {
        Packet::new(
            vec![
                0x45, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, ttl, 0x11,
                0x00, 0x00, 10, 0, 0, 1, 10, 0, 0, 2, 0x00, 0x35, 0x00, 0x35,
            ],
            LinkType::Ip,
            Timestamp::from_millis(ts_ms),
        )
    }

    fn key() -> FlowKey {
        FlowKey::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            53,
            53,
        )
    }

    fn setup() -> (SharedFlowTable, VerifyStage) {
        let params = TableParams { timeout_ms: 500, ..Default::default() };
        let table = FlowTable::new(params).into_shared();
        table
            .write()
            .insert(key(), Timestamp::from_millis(0), None, 1, 64, false)
            .unwrap();
        let log = Logger::root(slog::Discard, o!());
        let st = VerifyStage::new(table.clone(), VerifyCfg::default(), &log);
        (table, st)
    }

    #[test]
    fn verdicts() {
        let (table, st) = setup();
        assert_eq!(st.process(&pkt(64, 100)), VerifyVerdict::Matched);
        assert_eq!(
            table.read().get(&key()).unwrap().last_seen(),
            Timestamp::from_millis(100)
        );
        // Looping: TTL went down.
        assert_eq!(st.process(&pkt(63, 200)), VerifyVerdict::Unmatched);
        // Expired.
        assert_eq!(st.process(&pkt(64, 700)), VerifyVerdict::Unmatched);

        let junk = Packet::new(vec![0u8; 10], LinkType::Ip, Timestamp::ZERO);
        assert_eq!(st.process(&junk), VerifyVerdict::Unmatched);
    }

    #[test]
    fn batch() {
        let (_table, st) = setup();
        let out = st.push_batch(vec![
            pkt(64, 100),
            pkt(63, 150),
            pkt(64, 200),
            pkt(64, 900),
        ]);
        assert_eq!(out.matched.len(), 2);
        assert_eq!(out.unmatched.len(), 2);
        assert_eq!(out.matched[1].timestamp(), Timestamp::from_millis(200));
    }
}
