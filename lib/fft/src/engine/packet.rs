// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Packets and the annotations the pipeline stages act on.
//!
//! A [`Packet`] owns its frame bytes and carries two annotations
//! alongside them:
//!
//! * the timestamp, which the flow table uses to judge freshness;
//! * the destination IP annotation, the next hop the packet should be
//!   sent to. It starts out as the IPv4 destination and is rewritten
//!   by the routing stage when a flow has a recorded gateway.
//!
//! Parsing happens once, at construction. A frame that is not IPv4,
//! or is too short to be one, is still a perfectly good packet; it
//! just has no network info and therefore no flow.

use super::flow_table::FlowDesc;
use crate::api::FlowKey;
use crate::ddi::time::Timestamp;
use core::fmt;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv4Packet;
use std::net::Ipv4Addr;
use thiserror::Error;

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_VLAN: u16 = 0x8100;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;

/// The size of an 802.1Q tag: TCI followed by the inner ethertype.
pub const VLAN_TAG_SZ: usize = 4;

/// How the frame bytes begin.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkType {
    /// The frame begins directly with the IP header.
    Ip,
    /// The frame begins with an Ethernet header, optionally carrying
    /// a single 802.1Q tag.
    Ethernet,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "IP"),
            Self::Ethernet => write!(f, "ETHER"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("frame too short for {layer} header")]
    Truncated { layer: &'static str },

    #[error("not IPv4: ethertype 0x{0:04X}")]
    NotIpv4(u16),

    #[error("not IPv4: IP version {0}")]
    BadIpVersion(u8),

    #[error("malformed IPv4 header")]
    BadIpv4Header,
}

/// The network and transport information of an IPv4 packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetInfo {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub ttl: u8,
    pub proto: u8,
    /// Is this an unfragmented packet, or the first fragment?
    pub first_frag: bool,
    /// The L4 ports. Only present for TCP and UDP on a first fragment.
    pub ports: Option<(u16, u16)>,
}

impl NetInfo {
    /// The flow this packet belongs to. Ports are zero unless they
    /// were parsed.
    pub fn flow_key(&self) -> FlowKey {
        let (sp, dp) = self.ports.unwrap_or((0, 0));
        FlowKey::new(self.src, self.dst, sp, dp)
    }
}

/// Parse the IPv4 header (and L4 ports, when present) out of `bytes`.
pub fn parse_net(bytes: &[u8], link: LinkType) -> Result<NetInfo, ParseError> {
    match link {
        LinkType::Ip => parse_ipv4(bytes),
        LinkType::Ethernet => parse_ether(bytes),
    }
}

fn parse_ether(bytes: &[u8]) -> Result<NetInfo, ParseError> {
    let eth = EthernetFrame::new_checked(bytes)
        .map_err(|_| ParseError::Truncated { layer: "Ethernet" })?;
    let mut ether_type = u16::from(eth.ethertype());
    let mut payload = eth.payload();

    if ether_type == ETHER_TYPE_VLAN {
        if payload.len() < VLAN_TAG_SZ {
            return Err(ParseError::Truncated { layer: "802.1Q" });
        }
        ether_type = u16::from_be_bytes([payload[2], payload[3]]);
        payload = &payload[VLAN_TAG_SZ..];
    }

    if ether_type != ETHER_TYPE_IPV4 {
        return Err(ParseError::NotIpv4(ether_type));
    }

    parse_ipv4(payload)
}

fn parse_ipv4(bytes: &[u8]) -> Result<NetInfo, ParseError> {
    let Some(first) = bytes.first() else {
        return Err(ParseError::Truncated { layer: "IPv4" });
    };

    let version = first >> 4;
    if version != 4 {
        return Err(ParseError::BadIpVersion(version));
    }

    let ip = Ipv4Packet::new_checked(bytes)
        .map_err(|_| ParseError::BadIpv4Header)?;
    let first_frag = ip.frag_offset() == 0;
    let proto = ip.next_header();

    let ports = match proto {
        IpProtocol::Tcp | IpProtocol::Udp if first_frag => {
            let l4 = ip.payload();
            if l4.len() >= 4 {
                Some((
                    u16::from_be_bytes([l4[0], l4[1]]),
                    u16::from_be_bytes([l4[2], l4[3]]),
                ))
            } else {
                None
            }
        }
        _ => None,
    };

    Ok(NetInfo {
        src: Ipv4Addr::from(ip.src_addr().0),
        dst: Ipv4Addr::from(ip.dst_addr().0),
        ttl: ip.hop_limit(),
        proto: u8::from(proto),
        first_frag,
        ports,
    })
}

/// A frame travelling through the pipeline.
#[derive(Clone, Debug)]
pub struct Packet {
    bytes: Vec<u8>,
    link: LinkType,
    ts: Timestamp,
    dst_ip: Option<Ipv4Addr>,
    net: Result<NetInfo, ParseError>,
}

impl Packet {
    /// Wrap `bytes`, parse its network header, and annotate it with
    /// `ts`. The destination annotation starts out as the IPv4
    /// destination address, if there is one.
    pub fn new(bytes: Vec<u8>, link: LinkType, ts: Timestamp) -> Self {
        let net = parse_net(&bytes, link);
        let dst_ip = net.as_ref().ok().map(|n| n.dst);
        Self { bytes, link, ts, dst_ip, net }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn link(&self) -> LinkType {
        self.link
    }

    pub fn timestamp(&self) -> Timestamp {
        self.ts
    }

    pub fn set_timestamp(&mut self, ts: Timestamp) {
        self.ts = ts;
    }

    /// The preferred next hop of this packet.
    pub fn dst_ip_anno(&self) -> Option<Ipv4Addr> {
        self.dst_ip
    }

    pub fn set_dst_ip_anno(&mut self, ip: Ipv4Addr) {
        self.dst_ip = Some(ip);
    }

    pub fn net(&self) -> Option<&NetInfo> {
        self.net.as_ref().ok()
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.net.as_ref().err()
    }

    pub fn flow_key(&self) -> Option<FlowKey> {
        self.net().map(NetInfo::flow_key)
    }

    /// Classify this packet into the descriptor the flow table
    /// operates on.
    pub fn flow_desc(&self) -> Option<FlowDesc> {
        let net = self.net()?;
        Some(FlowDesc {
            key: net.flow_key(),
            ts: self.ts,
            ttl: net.ttl,
            len: self.bytes.len(),
            next_hop: self.dst_ip,
        })
    }
}
