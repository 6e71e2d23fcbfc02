// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! The engine: flow table, packets, stages, and command handling.

pub mod flow_table;
pub mod ioctl;
pub mod packet;
pub mod stage;
pub mod stat;

pub use flow_table::FlowTable;
pub use flow_table::SharedFlowTable;
pub use packet::LinkType;
pub use packet::Packet;
