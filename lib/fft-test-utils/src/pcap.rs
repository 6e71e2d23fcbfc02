// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Routines for building packet capture files.

use fft::ddi::time::NANOS;
use fft::ddi::time::Timestamp;
use fft::engine::LinkType;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use std::fs::File;
use std::io::Write;

/// Microsecond precision magic number.
pub const PCAP_MAGIC_US: u32 = 0xa1b2c3d4;
/// Nanosecond precision magic number.
pub const PCAP_MAGIC_NS: u32 = 0xa1b23c4d;

/// Build a legacy pcap capture in memory from a series of packets.
pub struct PcapBuilder {
    bytes: Vec<u8>,
    nanos: bool,
}

impl PcapBuilder {
    /// Start a capture of `link` frames, with nanosecond timestamps if
    /// `nanos` is set.
    pub fn new(link: LinkType, nanos: bool) -> Self {
        let network = match link {
            LinkType::Ip => Linktype::RAW,
            LinkType::Ethernet => Linktype::ETHERNET,
        };

        let mut hdr = PcapHeader {
            magic_number: if nanos { PCAP_MAGIC_NS } else { PCAP_MAGIC_US },
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 65535,
            network,
        };

        Self { bytes: hdr.to_vec().unwrap(), nanos }
    }

    /// Add a packet captured at `ts` to the capture.
    pub fn add_pkt(&mut self, pkt_bytes: &[u8], ts: Timestamp) {
        let nanos = ts.as_nanos();
        assert!(nanos >= 0, "capture timestamps must follow the epoch");
        let secs = (nanos as u64 / NANOS) as u32;
        let frac = (nanos as u64 % NANOS) as u32;

        let mut block = LegacyPcapBlock {
            ts_sec: secs,
            ts_usec: if self.nanos { frac } else { frac / 1_000 },
            caplen: pkt_bytes.len() as u32,
            origlen: pkt_bytes.len() as u32,
            data: pkt_bytes,
        };

        self.bytes.extend_from_slice(&block.to_vec().unwrap());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the capture to `path`.
    pub fn write_to(&self, path: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(&self.bytes).unwrap();
    }
}
