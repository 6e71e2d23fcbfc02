// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use super::pkt_summary;
use crate::cfg::RouteCfg;
use crate::engine::flow_table::FlowTable;
use crate::engine::flow_table::SharedFlowTable;
use crate::engine::packet::Packet;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering;
use slog::Logger;
use slog::debug;
use slog::info;
use slog::o;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteVerdict {
    /// Send the packet out this port. The packet's destination
    /// annotation holds its next hop.
    Forward(u8),
    /// No record exists for the packet's flow.
    Unrouted,
    /// The recorded port is not one of this stage's outputs.
    Drop,
}

/// A batch of packets sorted by output.
#[derive(Debug, Default)]
pub struct RouteOutputs {
    /// One queue per output port.
    pub ports: Vec<Vec<Packet>>,
    pub unrouted: Vec<Packet>,
    pub dropped: usize,
}

pub struct RouteStage {
    table: SharedFlowTable,
    outputs: u16,
    verbose: bool,
    no_route_logged: AtomicBool,
    log: Logger,
}

impl RouteStage {
    pub fn new(table: SharedFlowTable, cfg: RouteCfg, log: &Logger) -> Self {
        Self {
            table,
            outputs: cfg.outputs,
            verbose: cfg.verbose,
            no_route_logged: AtomicBool::new(false),
            log: log.new(o!("stage" => "route")),
        }
    }

    pub fn outputs(&self) -> u16 {
        self.outputs
    }

    /// Resolve the output of `pkt`, rewriting its destination
    /// annotation to the flow's gateway if it has one.
    pub fn process(&self, pkt: &mut Packet) -> RouteVerdict {
        let table = self.table.read();
        self.route_one(&table, pkt)
    }

    fn route_one(&self, table: &FlowTable, pkt: &mut Packet) -> RouteVerdict {
        let mut next_hop = pkt.dst_ip_anno();
        let port = pkt.flow_key().and_then(|k| table.route(&k, &mut next_hop));
        if let Some(nh) = next_hop {
            pkt.set_dst_ip_anno(nh);
        }

        if self.verbose {
            debug!(self.log, "route";
                "pkt" => pkt_summary(pkt),
                "port" => ?port
            );
        }

        match port {
            Some(p) if u16::from(p) < self.outputs => RouteVerdict::Forward(p),
            Some(p) => {
                debug!(self.log, "port out of range"; "port" => p);
                RouteVerdict::Drop
            }
            None => {
                // Log only the first unrouted packet unless verbose.
                let logged = self.no_route_logged.swap(true, Ordering::Relaxed);
                if self.verbose || !logged {
                    info!(self.log, "no route for packet";
                        "pkt" => pkt_summary(pkt)
                    );
                }
                RouteVerdict::Unrouted
            }
        }
    }

    /// Route a batch of packets under a single read lock.
    pub fn push_batch(&self, pkts: Vec<Packet>) -> RouteOutputs {
        let mut out = RouteOutputs {
            ports: (0..self.outputs).map(|_| Vec::new()).collect(),
            ..Default::default()
        };
        let table = self.table.read();

        for mut pkt in pkts {
            match self.route_one(&table, &mut pkt) {
                RouteVerdict::Forward(p) => out.ports[usize::from(p)].push(pkt),
                RouteVerdict::Unrouted => out.unrouted.push(pkt),
                RouteVerdict::Drop => out.dropped += 1,
            }
        }

        out
    }
}
