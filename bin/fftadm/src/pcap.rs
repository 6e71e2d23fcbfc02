// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Reading legacy pcap captures into packets.
//!
//! Both byte orders and both timestamp precisions are understood.
//! Frames must be Ethernet or raw IPv4; anything else is refused
//! up front rather than replayed as unparseable packets.

use crate::Error;
use fft::ddi::time::Timestamp;
use fft::engine::LinkType;
use fft::engine::Packet;
use pcap_parser::Linktype;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use pcap_parser::pcap::parse_pcap_frame;
use pcap_parser::pcap::parse_pcap_frame_be;
use pcap_parser::pcap::parse_pcap_header;
use std::path::Path;

/// `DLT_RAW` as it appears on some BSDs.
const DLT_RAW_BSD: Linktype = Linktype(12);

/// The packets of a capture, in file order.
#[derive(Debug)]
pub struct Capture {
    pub link: LinkType,
    pub pkts: Vec<Packet>,
}

fn link_type(network: Linktype) -> Result<LinkType, Error> {
    if network == Linktype::ETHERNET {
        Ok(LinkType::Ethernet)
    } else if network == Linktype::RAW
        || network == Linktype::IPV4
        || network == DLT_RAW_BSD
    {
        Ok(LinkType::Ip)
    } else {
        Err(Error::Pcap(format!("unsupported link type {}", network.0)))
    }
}

fn timestamp(hdr: &PcapHeader, block: &LegacyPcapBlock) -> Timestamp {
    if hdr.is_nanosecond_precision() {
        Timestamp::from_secs_nanos(block.ts_sec, block.ts_usec)
    } else {
        Timestamp::from_secs_micros(block.ts_sec, block.ts_usec)
    }
}

/// Parse a capture held in memory.
pub fn read_pcap(bytes: &[u8]) -> Result<Capture, Error> {
    let (mut rest, hdr) = parse_pcap_header(bytes)
        .map_err(|e| Error::Pcap(format!("bad header: {e:?}")))?;
    let link = link_type(hdr.network)?;
    let be = hdr.is_bigendian();
    let mut pkts = vec![];

    while !rest.is_empty() {
        let res = if be {
            parse_pcap_frame_be(rest)
        } else {
            parse_pcap_frame(rest)
        };

        let (next, block) = res.map_err(|e| {
            Error::Pcap(format!("bad frame {}: {e:?}", pkts.len()))
        })?;
        let ts = timestamp(&hdr, &block);
        pkts.push(Packet::new(block.data.to_vec(), link, ts));
        rest = next;
    }

    Ok(Capture { link, pkts })
}

/// Read and parse the capture at `path`.
pub fn load_pcap(path: &Path) -> Result<Capture, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_pcap(&bytes)
}
