// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! The pipeline stages driving a shared flow table.
//!
//! * [`InsertStage`] learns the flow of every packet it sees, assigning
//!   it the stage's egress port.
//! * [`VerifyStage`] sorts packets by whether their flow has a fresh,
//!   loop-free record.
//! * [`RouteStage`] forwards packets out the port recorded for their
//!   flow.
//!
//! Each stage holds a [`SharedFlowTable`]; any number of stages may
//! share one table.
//!
//! [`SharedFlowTable`]: super::flow_table::SharedFlowTable

use super::packet::Packet;

pub mod insert;
pub mod route;
pub mod verify;

pub use insert::*;
pub use route::*;
pub use verify::*;

/// A one-line description of a packet for logs.
pub fn pkt_summary(pkt: &Packet) -> String {
    match (pkt.net(), pkt.parse_error()) {
        (Some(net), _) => format!(
            "{} proto: {} ttl: {} len: {}",
            net.flow_key(),
            net.proto,
            net.ttl,
            pkt.len()
        ),
        (None, Some(e)) => format!("{} len: {} ({e})", pkt.link(), pkt.len()),
        (None, None) => format!("{} len: {}", pkt.link(), pkt.len()),
    }
}
