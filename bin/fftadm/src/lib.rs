// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! FFT administration library

use fft::api::AddFlowReq;
use fft::api::AddFlowResp;
use fft::api::API_VERSION;
use fft::api::CmdOk;
use fft::api::DumpFlowsReq;
use fft::api::DumpFlowsResp;
use fft::api::FftCmd;
use fft::api::FftCmdReq;
use fft::api::FftError;
use fft::api::NoResp;
use fft::api::ParamSet;
use fft::api::RemoveFlowsReq;
use fft::api::RemovedResp;
use fft::api::SetParamsReq;
use fft::api::TableInfoResp;
use fft::api::TableParams;
use fft::api::TableStatsSnap;
use fft::engine::SharedFlowTable;
use fft::engine::ioctl::handle_cmd;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub mod pcap;
pub mod replay;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request serialization failed for command {0:?}: {1}")]
    ReqSer(FftCmd, postcard::Error),

    #[error("response deserialization failed for command {0:?}: {1}")]
    RespDeser(FftCmd, postcard::Error),

    #[error("command {0:?} failed: {1}")]
    CommandError(FftCmd, FftError),

    #[error("bad capture: {0}")]
    Pcap(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The handle used to send administration commands to a flow table.
///
/// Every command takes the same path an out-of-process client would:
/// the request is serialized into an [`FftCmdReq`], handed to the
/// engine's command handler, and the response deserialized on the
/// way back.
#[derive(Clone)]
pub struct FftAdm {
    table: SharedFlowTable,
}

impl FftAdm {
    pub fn new(table: SharedFlowTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SharedFlowTable {
        &self.table
    }

    /// Return the size, bucket count, and largest bucket of the table.
    pub fn table_info(&self) -> Result<TableInfoResp, Error> {
        self.run_cmd(FftCmd::TableInfo, None::<&()>)
    }

    /// Dump the table's records, or only those not yet expired.
    pub fn dump_flows(&self, active_only: bool) -> Result<DumpFlowsResp, Error> {
        let req = DumpFlowsReq { active_only };
        self.run_cmd(FftCmd::DumpFlows, Some(&req))
    }

    pub fn dump_stats(&self) -> Result<TableStatsSnap, Error> {
        self.run_cmd(FftCmd::DumpStats, None::<&()>)
    }

    /// Insert a record by hand, stamped with the current time.
    pub fn add_flow(&self, req: &AddFlowReq) -> Result<AddFlowResp, Error> {
        self.run_cmd(FftCmd::AddFlow, Some(req))
    }

    /// Remove every record for the egress port in `req`.
    pub fn remove_flows(
        &self,
        req: &RemoveFlowsReq,
    ) -> Result<RemovedResp, Error> {
        self.run_cmd(FftCmd::RemoveFlows, Some(req))
    }

    pub fn clear_table(&self) -> Result<NoResp, Error> {
        self.run_cmd(FftCmd::ClearTable, None::<&()>)
    }

    /// Sweep every bucket, removing expired records.
    pub fn manual_gc(&self) -> Result<RemovedResp, Error> {
        self.run_cmd(FftCmd::ManualGc, None::<&()>)
    }

    pub fn get_params(&self) -> Result<TableParams, Error> {
        self.run_cmd(FftCmd::GetParams, None::<&()>)
    }

    /// Apply `params` in order, returning the resulting parameters.
    pub fn set_params(&self, params: &[ParamSet]) -> Result<TableParams, Error> {
        let req = SetParamsReq { params: params.to_vec() };
        self.run_cmd(FftCmd::SetParams, Some(&req))
    }

    fn run_cmd<T, R>(&self, cmd: FftCmd, req: Option<&R>) -> Result<T, Error>
    where
        T: CmdOk + DeserializeOwned,
        R: Serialize,
    {
        let req = match req {
            Some(req) => {
                postcard::to_allocvec(req).map_err(|e| Error::ReqSer(cmd, e))?
            }
            None => vec![],
        };

        let cmd_req = FftCmdReq { api_version: API_VERSION, cmd, req };
        let resp = handle_cmd(&self.table, &cmd_req)
            .map_err(|e| Error::CommandError(cmd, e))?;
        postcard::from_bytes(&resp).map_err(|e| Error::RespDeser(cmd, e))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fft::engine::FlowTable;
    use std::net::Ipv4Addr;

    fn adm() -> FftAdm {
        FftAdm::new(FlowTable::default().into_shared())
    }

    fn add(adm: &FftAdm, sport: u16, port: u8) -> bool {
        let req = AddFlowReq {
            key: format!("10.0.0.1:{sport} -> 10.0.0.2:80").parse().unwrap(),
            gateway: Some(Ipv4Addr::new(10, 0, 0, 254)),
            port,
            ttl: 64,
            overwrite: false,
        };
        adm.add_flow(&req).unwrap().added
    }

    #[test]
    fn add_dump_remove() {
        let adm = adm();
        assert!(add(&adm, 1, 1));
        assert!(add(&adm, 2, 2));
        // Fresh records are left alone without overwrite.
        assert!(!add(&adm, 1, 3));

        let info = adm.table_info().unwrap();
        assert_eq!(info.size, 2);

        let dump = adm.dump_flows(true).unwrap();
        assert_eq!(dump.flows.len(), 2);
        assert!(dump.flows.iter().all(|e| e.port != 3));

        let removed = adm.remove_flows(&"2".parse().unwrap()).unwrap();
        assert_eq!(removed.removed, 1);
        assert_eq!(adm.table_info().unwrap().size, 1);

        adm.clear_table().unwrap();
        assert_eq!(adm.table_info().unwrap().size, 0);
        assert_eq!(adm.dump_stats().unwrap().insert, 2);
    }

    #[test]
    fn params() {
        let adm = adm();
        assert_eq!(adm.get_params().unwrap(), TableParams::default());

        let params = ["timeout=0", "gc_on_add=on"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect::<Vec<ParamSet>>();
        let p = adm.set_params(&params).unwrap();
        assert_eq!(p.timeout_ms, 0);
        assert!(p.gc_on_add);
        assert!(p.loop_avoidance);
    }

    #[test]
    fn manual_gc_expires_everything_with_zero_timeout() {
        let adm = adm();
        assert!(add(&adm, 1, 1));
        adm.set_params(&[ParamSet::Timeout(0)]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(adm.manual_gc().unwrap().removed, 1);
        assert!(adm.dump_flows(false).unwrap().flows.is_empty());
    }
}
