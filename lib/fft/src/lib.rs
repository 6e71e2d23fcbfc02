// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! The Fast Forwarding Table engine.
//!
//! A per-flow cache of forwarding decisions: the egress port and
//! optional gateway a flow was assigned, plus the IP TTL it last
//! arrived with for loop detection. The [`engine::flow_table`] module
//! holds the table itself; [`engine::stage`] holds the thin pipeline
//! stages which drive it from packets.

#![allow(clippy::len_without_is_empty)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod api;
pub mod cfg;
pub mod ddi;
pub mod engine;
pub mod print;
