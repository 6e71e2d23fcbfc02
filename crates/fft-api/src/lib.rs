// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Types shared between the FFT engine and its administration tools.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod cmd;
pub mod dump;
pub mod flow;

pub use cmd::*;
pub use dump::*;
pub use flow::*;

/// The overall version of the API. Anytime a command is added,
/// removed, or modified, this number should increment. Currently we
/// attach no semantic meaning to the number other than as a means to
/// verify that the admin client and the engine are compiled for the
/// same API.
pub const API_VERSION: u64 = 3;

/// Major version of the FFT package.
pub const MAJOR_VERSION: u64 = 0;
