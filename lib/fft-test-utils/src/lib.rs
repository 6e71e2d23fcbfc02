// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Common routines for integration tests and benchmarks.

pub mod pcap;
pub mod pkt;

pub use fft::api::FlowKey;
pub use fft::ddi::time::Timestamp;
pub use fft::engine::LinkType;
pub use fft::engine::Packet;
pub use pkt::*;
