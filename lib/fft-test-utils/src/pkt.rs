// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Routines for building test packets.

use fft::api::FlowKey;
use fft::ddi::time::Timestamp;
use fft::engine::LinkType;
use fft::engine::Packet;
use fft::engine::packet::ETHER_TYPE_IPV4;
use fft::engine::packet::ETHER_TYPE_VLAN;
use smoltcp::wire::EthernetAddress;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::EthernetProtocol;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv4Address;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::TcpPacket;
use smoltcp::wire::UdpPacket;
use std::net::Ipv4Addr;

pub const IPV4_HDR_SZ: usize = 20;
pub const TCP_HDR_SZ: usize = 20;
pub const UDP_HDR_SZ: usize = 8;
pub const ETHER_HDR_SZ: usize = 14;

pub const GUEST_MAC: [u8; 6] = [0xA8, 0x40, 0x25, 0xF7, 0x00, 0x01];
pub const GW_MAC: [u8; 6] = [0xA8, 0x40, 0x25, 0xF7, 0x00, 0xFF];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum L4 {
    Tcp,
    Udp,
    /// Any other protocol, carried as opaque payload.
    Other(u8),
}

/// The fields of a generated IPv4 packet.
#[derive(Clone, Copy, Debug)]
pub struct Ipv4Spec {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub l4: L4,
    pub src_port: u16,
    pub dst_port: u16,
    pub ttl: u8,
    /// Fragment offset in bytes; must be a multiple of 8.
    pub frag_offset: u16,
    pub payload_len: usize,
}

impl Ipv4Spec {
    pub fn tcp(key: FlowKey, ttl: u8) -> Self {
        Self {
            src: key.src,
            dst: key.dst,
            l4: L4::Tcp,
            src_port: key.src_port,
            dst_port: key.dst_port,
            ttl,
            frag_offset: 0,
            payload_len: 0,
        }
    }

    pub fn udp(key: FlowKey, ttl: u8) -> Self {
        Self { l4: L4::Udp, ..Self::tcp(key, ttl) }
    }

    fn l4_hdr_len(&self) -> usize {
        if self.frag_offset != 0 {
            return 0;
        }

        match self.l4 {
            L4::Tcp => TCP_HDR_SZ,
            L4::Udp => UDP_HDR_SZ,
            L4::Other(_) => 0,
        }
    }

    fn proto(&self) -> IpProtocol {
        match self.l4 {
            L4::Tcp => IpProtocol::Tcp,
            L4::Udp => IpProtocol::Udp,
            L4::Other(p) => IpProtocol::from(p),
        }
    }
}

/// Generate the bytes of an IPv4 packet, starting at the IP header.
pub fn gen_ipv4(spec: &Ipv4Spec) -> Vec<u8> {
    let l4_len = spec.l4_hdr_len() + spec.payload_len;
    let total = IPV4_HDR_SZ + l4_len;
    let mut bytes = vec![0u8; total];
    let src = Ipv4Address::from_bytes(&spec.src.octets());
    let dst = Ipv4Address::from_bytes(&spec.dst.octets());

    {
        let mut ip = Ipv4Packet::new_unchecked(&mut bytes[..]);
        ip.set_version(4);
        ip.set_header_len(IPV4_HDR_SZ as u8);
        ip.set_total_len(total as u16);
        ip.set_ident(0x1DE);
        ip.clear_flags();
        ip.set_frag_offset(spec.frag_offset);
        ip.set_hop_limit(spec.ttl);
        ip.set_next_header(spec.proto());
        ip.set_src_addr(src);
        ip.set_dst_addr(dst);
        ip.fill_checksum();
    }

    if spec.frag_offset == 0 {
        let l4 = &mut bytes[IPV4_HDR_SZ..];
        match spec.l4 {
            L4::Tcp => {
                let mut tcp = TcpPacket::new_unchecked(l4);
                tcp.set_src_port(spec.src_port);
                tcp.set_dst_port(spec.dst_port);
                tcp.set_header_len(TCP_HDR_SZ as u8);
                tcp.set_window_len(64240);
                tcp.set_ack(true);
                tcp.fill_checksum(&src.into(), &dst.into());
            }

            L4::Udp => {
                let mut udp = UdpPacket::new_unchecked(l4);
                udp.set_src_port(spec.src_port);
                udp.set_dst_port(spec.dst_port);
                udp.set_len(l4_len as u16);
                udp.fill_checksum(&src.into(), &dst.into());
            }

            L4::Other(_) => (),
        }
    }

    bytes
}

/// Wrap `ip` in an Ethernet header, tagged with `vlan` if given.
pub fn gen_ether(ip: &[u8], vlan: Option<u16>) -> Vec<u8> {
    let tag_len = if vlan.is_some() { 4 } else { 0 };
    let mut bytes = vec![0u8; ETHER_HDR_SZ + tag_len];

    {
        let mut eth = EthernetFrame::new_unchecked(&mut bytes[..]);
        eth.set_dst_addr(EthernetAddress(GW_MAC));
        eth.set_src_addr(EthernetAddress(GUEST_MAC));
        match vlan {
            Some(_) => {
                eth.set_ethertype(EthernetProtocol::Unknown(ETHER_TYPE_VLAN))
            }
            None => eth.set_ethertype(EthernetProtocol::Ipv4),
        }
    }

    if let Some(vid) = vlan {
        bytes[ETHER_HDR_SZ..ETHER_HDR_SZ + 2]
            .copy_from_slice(&(vid & 0x0FFF).to_be_bytes());
        bytes[ETHER_HDR_SZ + 2..ETHER_HDR_SZ + 4]
            .copy_from_slice(&ETHER_TYPE_IPV4.to_be_bytes());
    }

    bytes.extend_from_slice(ip);
    bytes
}

/// A raw IPv4 TCP packet for `key`.
pub fn tcp_pkt(key: FlowKey, ttl: u8, ts: Timestamp) -> Packet {
    Packet::new(gen_ipv4(&Ipv4Spec::tcp(key, ttl)), LinkType::Ip, ts)
}

/// A raw IPv4 UDP packet for `key`.
pub fn udp_pkt(key: FlowKey, ttl: u8, ts: Timestamp) -> Packet {
    Packet::new(gen_ipv4(&Ipv4Spec::udp(key, ttl)), LinkType::Ip, ts)
}

/// An Ethernet-framed TCP packet for `key`.
pub fn ether_tcp_pkt(
    key: FlowKey,
    ttl: u8,
    vlan: Option<u16>,
    ts: Timestamp,
) -> Packet {
    let ip = gen_ipv4(&Ipv4Spec::tcp(key, ttl));
    Packet::new(gen_ether(&ip, vlan), LinkType::Ethernet, ts)
}

/// Build the key `10.0.<net>.1:<sport> -> 10.0.<net>.2:<dport>`.
pub fn flow_key(net: u8, sport: u16, dport: u16) -> FlowKey {
    FlowKey::new(
        Ipv4Addr::new(10, 0, net, 1),
        Ipv4Addr::new(10, 0, net, 2),
        sport,
        dport,
    )
}

/// Timestamp at `ms` milliseconds after the epoch.
pub fn ms(ms: i64) -> Timestamp {
    Timestamp::from_millis(ms)
}
