// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use super::pkt_summary;
use crate::cfg::InsertCfg;
use crate::ddi::sync::KMutex;
use crate::ddi::sync::KMutexGuard;
use crate::ddi::time::Moment;
use crate::engine::flow_table::SharedFlowTable;
use crate::engine::packet::Packet;
use core::time::Duration;
use slog::Logger;
use slog::debug;
use slog::info;
use slog::o;

/// How long an insert stage stays down before re-enabling itself.
pub const DOWN_RECOVERY: Duration = Duration::from_secs(5);

/// The administrative state of an [`InsertStage`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdminState {
    Up,
    /// Inserts are suppressed until `until`, at which point the stage
    /// goes back up on its own.
    Down { until: Moment },
}

/// Learns the flow of each packet, recording the stage's port as the
/// flow's egress port.
///
/// Packets always pass through unchanged; a declined insert is not an
/// error.
pub struct InsertStage {
    table: SharedFlowTable,
    port: u8,
    overwrite: bool,
    verbose: bool,
    state: KMutex<AdminState>,
    log: Logger,
}

impl InsertStage {
    pub fn new(table: SharedFlowTable, cfg: InsertCfg, log: &Logger) -> Self {
        Self {
            table,
            port: cfg.port,
            overwrite: cfg.overwrite,
            verbose: cfg.verbose,
            state: KMutex::new(AdminState::Up),
            log: log.new(o!("stage" => "insert", "port" => cfg.port)),
        }
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    /// The current admin state, after applying any recovery due by
    /// `now`.
    pub fn state(&self, now: Moment) -> AdminState {
        *self.lock_state(now)
    }

    fn lock_state(&self, now: Moment) -> KMutexGuard<'_, AdminState> {
        let mut state = self.state.lock();
        if let AdminState::Down { until } = *state {
            if now >= until {
                *state = AdminState::Up;
                info!(self.log, "recovered from admin down");
            }
        }
        state
    }

    /// The state guard, if the stage is up at `now`. Inserts hold it
    /// until their table write is done, so none can land after a
    /// concurrent [`InsertStage::set_down`] has swept the port.
    fn lock_up(&self, now: Moment) -> Option<KMutexGuard<'_, AdminState>> {
        let state = self.lock_state(now);
        (*state == AdminState::Up).then_some(state)
    }

    /// Take the stage down: forget every flow egressing this stage's
    /// port and stop learning until [`DOWN_RECOVERY`] has passed, or
    /// until [`InsertStage::set_up`]. Returns the number of records
    /// removed.
    pub fn set_down(&self, now: Moment) -> usize {
        // Lock order: state, then table.
        let mut state = self.state.lock();
        *state = AdminState::Down { until: now + DOWN_RECOVERY };
        let removed = self.table.write().remove_by_port(self.port);
        drop(state);
        info!(self.log, "admin down"; "removed" => removed);
        removed
    }

    pub fn set_up(&self) {
        *self.state.lock() = AdminState::Up;
        info!(self.log, "admin up");
    }

    /// Learn the flow of `pkt`. Returns true if a record was written.
    pub fn process(&self, pkt: &Packet) -> bool {
        self.process_at(pkt, Moment::now())
    }

    /// Like [`InsertStage::process`], with the admin timer evaluated
    /// at `now`.
    pub fn process_at(&self, pkt: &Packet, now: Moment) -> bool {
        let Some(_up) = self.lock_up(now) else {
            return false;
        };

        let Some(desc) = pkt.flow_desc() else {
            if self.verbose {
                debug!(self.log, "no flow"; "pkt" => pkt_summary(pkt));
            }
            return false;
        };

        let res =
            self.table.write().insert_desc(&desc, self.port, self.overwrite);
        if self.verbose {
            debug!(self.log, "insert";
                "pkt" => pkt_summary(pkt),
                "added" => res.is_ok()
            );
        }
        res.is_ok()
    }

    /// Learn the flows of a batch of packets under a single lock
    /// acquisition. Returns the number of records written.
    pub fn process_batch(&self, pkts: &[Packet]) -> usize {
        self.process_batch_at(pkts, Moment::now())
    }

    pub fn process_batch_at(&self, pkts: &[Packet], now: Moment) -> usize {
        let Some(_up) = self.lock_up(now) else {
            return 0;
        };

        let mut table = self.table.write();
        let mut added = 0;
        for pkt in pkts {
            let Some(desc) = pkt.flow_desc() else {
                continue;
            };
            let res = table.insert_desc(&desc, self.port, self.overwrite);
            if self.verbose {
                debug!(self.log, "insert";
                    "pkt" => pkt_summary(pkt),
                    "added" => res.is_ok()
                );
            }
            if res.is_ok() {
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::FlowKey;
    use crate::ddi::time::Timestamp;
    use crate::engine::flow_table::FlowTable;
    use std::net::Ipv4Addr;
    use std::thread;

    fn pkt(sport: u16) -> Packet {
        Packet::new(
            vec![
                0x45, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x40, 0x06,
                0x00, 0x00, 10, 0, 0, 1, 10, 0, 0, 2,
                (sport >> 8) as u8, sport as u8, 0x01, 0xBB,
            ],
            crate::engine::packet::LinkType::Ip,
            Timestamp::from_millis(0),
        )
    }

    fn key(sport: u16) -> FlowKey {
        FlowKey::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            sport,
            443,
        )
    }

    fn stage(table: &SharedFlowTable, port: u8) -> InsertStage {
        let log = Logger::root(slog::Discard, o!());
        let cfg = InsertCfg { port, ..Default::default() };
        InsertStage::new(table.clone(), cfg, &log)
    }

    #[test]
    fn learns_flow() {
        let table = FlowTable::default().into_shared();
        let st = stage(&table, 3);
        assert!(st.process(&pkt(1000)));
        let ft = table.read();
        let rec = ft.get(&key(1000)).unwrap();
        assert_eq!(rec.port(), 3);
        assert_eq!(rec.ttl(), 64);
        // The destination annotation is the recorded gateway.
        assert_eq!(rec.gateway(), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn down_then_recover() {
        let table = FlowTable::default().into_shared();
        let st = stage(&table, 3);
        let other = stage(&table, 4);
        assert!(st.process(&pkt(1)));
        assert!(other.process(&pkt(2)));

        let t0 = Moment::now();
        assert_eq!(st.set_down(t0), 1);
        assert!(table.read().get(&key(1)).is_none());
        assert!(table.read().get(&key(2)).is_some());

        assert!(!st.process_at(&pkt(1), t0 + Duration::from_secs(4)));
        assert_eq!(st.process_batch_at(&[pkt(1)], t0), 0);
        assert!(matches!(
            st.state(t0 + Duration::from_secs(4)),
            AdminState::Down { .. }
        ));
        assert!(table.read().get(&key(1)).is_none());

        assert!(st.process_at(&pkt(1), t0 + DOWN_RECOVERY));
        assert_eq!(st.state(t0 + DOWN_RECOVERY), AdminState::Up);
        assert!(table.read().get(&key(1)).is_some());
    }

    #[test]
    fn set_up_is_immediate() {
        let table = FlowTable::default().into_shared();
        let st = stage(&table, 3);
        let t0 = Moment::now();
        st.set_down(t0);
        st.set_up();
        assert_eq!(st.state(t0), AdminState::Up);
        assert!(st.process_at(&pkt(1), t0));
    }

    #[test]
    fn batch_skips_non_flows() {
        let table = FlowTable::default().into_shared();
        let st = stage(&table, 1);
        let junk = Packet::new(
            vec![0x60; 40],
            crate::engine::packet::LinkType::Ip,
            Timestamp::ZERO,
        );
        assert_eq!(st.process_batch(&[pkt(1), junk, pkt(2)]), 2);
        assert_eq!(table.read().len(), 2);
    }

    #[test]
    fn no_insert_outlives_concurrent_down() {
        let table = FlowTable::default().into_shared();
        let st = stage(&table, 3);
        let t0 = Moment::now();

        for sport in 0..50 {
            st.set_up();
            thread::scope(|s| {
                // Park an insert on the table lock, then take the stage
                // down behind it.
                let held = table.write();
                let ins = s.spawn(|| st.process_at(&pkt(sport), t0));
                thread::sleep(Duration::from_millis(1));
                let down = s.spawn(|| st.set_down(t0));
                thread::sleep(Duration::from_millis(1));
                drop(held);
                ins.join().unwrap();
                down.join().unwrap();
            });

            assert!(matches!(st.state(t0), AdminState::Down { .. }));
            assert!(table.read().get(&key(sport)).is_none());
        }
        assert_eq!(table.read().len(), 0);
    }
}
