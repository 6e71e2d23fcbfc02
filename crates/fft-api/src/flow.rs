// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use std::net::Ipv4Addr;

/// The flow identifier.
///
/// A flow is the 4-tuple of IPv4 source/destination address and L4
/// source/destination port. Traffic which is not TCP or UDP, as well
/// as any fragment after the first, carries zero for both ports; all
/// such traffic between a pair of addresses shares one key.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct FlowKey {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub const fn new(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Self { src, dst, src_port, dst_port }
    }

    /// Return the hash code used to place this key in a flow table
    /// bucket.
    ///
    /// The tuple is folded into 32 bits and then run through Bob
    /// Jenkins' 6-shift integer finalizer. Bucket garbage collection
    /// scans whole collision chains, so the bits must be well spread.
    pub fn hashcode(&self) -> u32 {
        let mut a = u32::from(self.src).wrapping_mul(59) ^ u32::from(self.dst);
        a = a ^ u32::from(self.src_port) ^ (u32::from(self.dst_port) << 16);
        a = a.wrapping_add(0x7ed5_5d16).wrapping_add(a << 12);
        a = (a ^ 0xc761_c23c) ^ (a >> 19);
        a = a.wrapping_add(0x1656_67b1).wrapping_add(a << 5);
        a = a.wrapping_add(0xd3a2_646c) ^ (a << 9);
        a = a.wrapping_add(0xfd70_46c5).wrapping_add(a << 3);
        a = (a ^ 0xb55a_4f09) ^ (a >> 16);
        a
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src, self.src_port, self.dst, self.dst_port
        )
    }
}

fn parse_endpoint(s: &str) -> Result<(Ipv4Addr, u16), String> {
    let (ip, port) = s
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| format!("missing port in endpoint: {s}"))?;

    let ip = ip.parse().map_err(|_| format!("bad IPv4 address: {ip}"))?;
    let port = port.parse().map_err(|_| format!("bad port: {port}"))?;
    Ok((ip, port))
}

/// Parse a key written as `<src>:<sport> -> <dst>:<dport>`, the same
/// shape produced by [`Display`].
impl FromStr for FlowKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (src, dst) = s
            .split_once("->")
            .ok_or_else(|| format!("expected <src>:<port>-><dst>:<port>: {s}"))?;

        let (src, src_port) = parse_endpoint(src)?;
        let (dst, dst_port) = parse_endpoint(dst)?;
        Ok(Self { src, dst, src_port, dst_port })
    }
}
