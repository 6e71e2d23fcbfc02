// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use super::API_VERSION;
use super::dump::FlowDumpEntry;
use super::flow::FlowKey;
use core::fmt::Debug;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use std::net::Ipv4Addr;
use thiserror::Error;

/// The administrative commands understood by a flow table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(C)]
pub enum FftCmd {
    TableInfo = 1,    // record count, bucket count, max bucket size
    DumpFlows = 2,    // dump all or only active records
    DumpStats = 3,    // dump the table counters
    AddFlow = 10,     // manually insert a record
    RemoveFlows = 11, // remove every record for an egress port
    ClearTable = 12,  // remove every record
    ManualGc = 13,    // run a full garbage collection sweep
    GetParams = 20,   // read timeout and flags
    SetParams = 21,   // write timeout and/or flags
}

/// The envelope carrying a single command to the engine.
///
/// The command's request body is serialized with postcard into `req`.
/// The engine answers with either the postcard bytes of the command's
/// [`CmdOk`] response, or an [`FftError`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FftCmdReq {
    pub api_version: u64,
    pub cmd: FftCmd,
    pub req: Vec<u8>,
}

impl FftCmdReq {
    /// Build a request for `cmd` carrying `req` as its body.
    pub fn new<R: Serialize>(cmd: FftCmd, req: &R) -> Result<Self, FftError> {
        let req = postcard::to_allocvec(req)
            .map_err(|e| FftError::SerCmdReq(e.to_string()))?;
        Ok(Self { api_version: API_VERSION, cmd, req })
    }

    /// Is this the expected API version?
    pub fn check_version(&self) -> bool {
        self.api_version == API_VERSION
    }
}

/// Errors crossing the command boundary.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum FftError {
    #[error("API version mismatch: client {client}, engine {engine}")]
    BadApiVersion { client: u64, engine: u64 },

    /// Administrative input that could not be parsed. The table is
    /// never touched when this is returned.
    #[error("bad argument: {0}")]
    BadArg(String),

    #[error("failed to serialize request: {0}")]
    SerCmdReq(String),

    #[error("failed to deserialize request: {0}")]
    DeserCmdReq(String),

    #[error("failed to serialize response: {0}")]
    SerCmdResp(String),

    #[error("failed to deserialize response: {0}")]
    DeserCmdResp(String),
}

/// A marker trait indicating a success response type that is returned
/// from a command and may be passed across the API boundary.
pub trait CmdOk: Debug + Serialize {}

impl CmdOk for () {}

/// Indicates no meaningful response value on success.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NoResp {
    pub unused: u64,
}

impl CmdOk for NoResp {}

/// Capacity observability for a flow table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableInfoResp {
    /// The number of records.
    pub size: u64,
    /// The number of hash buckets.
    pub bucket_count: u64,
    /// The number of records in the most occupied bucket.
    pub max_bucket_size: u64,
}

impl CmdOk for TableInfoResp {}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct DumpFlowsReq {
    /// Skip records which are expired relative to the current time.
    pub active_only: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DumpFlowsResp {
    /// Records replaced by an overwriting insert. Only populated with
    /// the `detailed-stats` feature and when dumping all records.
    pub overwritten: Vec<FlowDumpEntry>,
    pub flows: Vec<FlowDumpEntry>,
}

impl CmdOk for DumpFlowsResp {}

/// Manually insert a flow record, stamped with the engine's current
/// time.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AddFlowReq {
    pub key: FlowKey,
    pub gateway: Option<Ipv4Addr>,
    pub port: u8,
    pub ttl: u8,
    /// Replace any existing record, even a fresh one.
    pub overwrite: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AddFlowResp {
    /// False when the insert was declined because a fresh record
    /// already exists.
    pub added: bool,
}

impl CmdOk for AddFlowResp {}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemoveFlowsReq {
    pub port: u8,
}

impl FromStr for RemoveFlowsReq {
    type Err = FftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = s
            .trim()
            .parse()
            .map_err(|_| FftError::BadArg(format!("bad port: {s}")))?;
        Ok(Self { port })
    }
}

/// The number of records removed by a command.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemovedResp {
    pub removed: u64,
}

impl CmdOk for RemovedResp {}

/// The tunable parameters of a flow table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableParams {
    /// Records idle for longer than this many milliseconds are
    /// expired.
    pub timeout_ms: u32,
    /// Treat a TTL change on a known flow as a loop.
    pub loop_avoidance: bool,
    /// Run bucket garbage collection after every insert.
    pub gc_on_add: bool,
    /// Run bucket garbage collection after every verify.
    pub gc_on_check: bool,
}

impl CmdOk for TableParams {}

impl Default for TableParams {
    /// Records never time out, loop avoidance is on, and garbage
    /// collection only runs when asked for.
    fn default() -> Self {
        Self {
            timeout_ms: u32::MAX,
            loop_avoidance: true,
            gc_on_add: false,
            gc_on_check: false,
        }
    }
}

impl TableParams {
    pub fn apply(&mut self, p: ParamSet) {
        match p {
            ParamSet::Timeout(ms) => self.timeout_ms = ms,
            ParamSet::LoopAvoidance(on) => self.loop_avoidance = on,
            ParamSet::GcOnAdd(on) => self.gc_on_add = on,
            ParamSet::GcOnCheck(on) => self.gc_on_check = on,
        }
    }
}

/// A single parameter write, written on the command line as
/// `name=value`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ParamSet {
    Timeout(u32),
    LoopAvoidance(bool),
    GcOnAdd(bool),
    GcOnCheck(bool),
}

fn parse_bool(name: &str, val: &str) -> Result<bool, FftError> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(FftError::BadArg(format!("bad value for {name}: {val}"))),
    }
}

impl FromStr for ParamSet {
    type Err = FftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, val) = s.split_once('=').ok_or_else(|| {
            FftError::BadArg(format!("expected <name>=<value>: {s}"))
        })?;
        let name = name.trim();
        let val = val.trim();

        match name {
            "timeout" => val.parse().map(Self::Timeout).map_err(|_| {
                FftError::BadArg(format!("bad value for timeout: {val}"))
            }),
            "loop_avoidance" => parse_bool(name, val).map(Self::LoopAvoidance),
            "gc_on_add" => parse_bool(name, val).map(Self::GcOnAdd),
            "gc_on_check" => parse_bool(name, val).map(Self::GcOnCheck),
            _ => Err(FftError::BadArg(format!("unknown parameter: {name}"))),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SetParamsReq {
    pub params: Vec<ParamSet>,
}
