// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! The administrative command entry point.
//!
//! Every command arrives as an [`FftCmdReq`]: the API version, the
//! command code, and the postcard bytes of the command's request.
//! [`handle_cmd`] verifies the version, deserializes the request,
//! runs the command against the table, and hands back the postcard
//! bytes of the response. Malformed requests are rejected before the
//! table is locked.

use super::flow_table::FlowTable;
use crate::api::API_VERSION;
use crate::api::AddFlowReq;
use crate::api::AddFlowResp;
use crate::api::CmdOk;
use crate::api::DumpFlowsReq;
use crate::api::FftCmd;
use crate::api::FftCmdReq;
use crate::api::FftError;
use crate::api::NoResp;
use crate::api::RemoveFlowsReq;
use crate::api::RemovedResp;
use crate::api::SetParamsReq;
use crate::ddi::sync::KRwLock;
use crate::ddi::time::Timestamp;
use serde::de::DeserializeOwned;

fn get_req<T: DeserializeOwned>(req: &FftCmdReq) -> Result<T, FftError> {
    postcard::from_bytes(&req.req)
        .map_err(|e| FftError::DeserCmdReq(e.to_string()))
}

fn hdlr_resp<T: CmdOk>(resp: Result<T, FftError>) -> Result<Vec<u8>, FftError> {
    let resp = resp?;
    postcard::to_allocvec(&resp)
        .map_err(|e| FftError::SerCmdResp(e.to_string()))
}

/// Run a single administrative command against `table`.
pub fn handle_cmd(
    table: &KRwLock<FlowTable>,
    req: &FftCmdReq,
) -> Result<Vec<u8>, FftError> {
    if !req.check_version() {
        return Err(FftError::BadApiVersion {
            client: req.api_version,
            engine: API_VERSION,
        });
    }

    match req.cmd {
        FftCmd::TableInfo => hdlr_resp(Ok(table.read().info())),

        FftCmd::DumpFlows => {
            let resp = get_req::<DumpFlowsReq>(req).map(|r| {
                table.read().dump(r.active_only, Timestamp::now())
            });
            hdlr_resp(resp)
        }

        FftCmd::DumpStats => hdlr_resp(Ok(table.read().stats())),

        FftCmd::AddFlow => {
            let resp = get_req::<AddFlowReq>(req).map(|r| {
                let res = table.write().insert(
                    r.key,
                    Timestamp::now(),
                    r.gateway,
                    r.port,
                    r.ttl,
                    r.overwrite,
                );
                AddFlowResp { added: res.is_ok() }
            });
            hdlr_resp(resp)
        }

        FftCmd::RemoveFlows => {
            let resp = get_req::<RemoveFlowsReq>(req).map(|r| {
                let removed = table.write().remove_by_port(r.port);
                RemovedResp { removed: removed as u64 }
            });
            hdlr_resp(resp)
        }

        FftCmd::ClearTable => {
            table.write().clear();
            hdlr_resp(Ok(NoResp::default()))
        }

        FftCmd::ManualGc => {
            let removed =
                table.write().global_garbage_collection(Timestamp::now());
            hdlr_resp(Ok(RemovedResp { removed: removed as u64 }))
        }

        FftCmd::GetParams => hdlr_resp(Ok(table.read().params())),

        FftCmd::SetParams => {
            let resp = get_req::<SetParamsReq>(req).map(|r| {
                let mut ft = table.write();
                for p in r.params {
                    ft.set_param(p);
                }
                ft.params()
            });
            hdlr_resp(resp)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::FlowKey;
    use crate::api::ParamSet;
    use crate::api::TableInfoResp;
    use crate::api::TableParams;

    fn run<R: serde::Serialize, T: DeserializeOwned>(
        table: &KRwLock<FlowTable>,
        cmd: FftCmd,
        req: &R,
    ) -> Result<T, FftError> {
        let req = FftCmdReq::new(cmd, req)?;
        let bytes = handle_cmd(table, &req)?;
        Ok(postcard::from_bytes(&bytes).unwrap())
    }

    #[test]
    fn bad_version() {
        let table = KRwLock::new(FlowTable::default());
        let mut req = FftCmdReq::new(FftCmd::TableInfo, &()).unwrap();
        req.api_version = API_VERSION + 1;
        assert_eq!(
            handle_cmd(&table, &req),
            Err(FftError::BadApiVersion {
                client: API_VERSION + 1,
                engine: API_VERSION
            })
        );
    }

    #[test]
    fn bad_request_body() {
        let table = KRwLock::new(FlowTable::default());
        let req = FftCmdReq {
            api_version: API_VERSION,
            cmd: FftCmd::AddFlow,
            req: vec![],
        };
        assert!(matches!(
            handle_cmd(&table, &req),
            Err(FftError::DeserCmdReq(_))
        ));
        assert_eq!(table.read().len(), 0);
    }

    #[test]
    fn add_remove_info() {
        let table = KRwLock::new(FlowTable::default());
        let key: FlowKey = "10.0.0.1:80 -> 10.0.0.2:1234".parse().unwrap();
        let add = AddFlowReq {
            key,
            gateway: None,
            port: 3,
            ttl: 64,
            overwrite: false,
        };

        let resp: AddFlowResp = run(&table, FftCmd::AddFlow, &add).unwrap();
        assert!(resp.added);
        let resp: AddFlowResp = run(&table, FftCmd::AddFlow, &add).unwrap();
        assert!(!resp.added);

        let info: TableInfoResp = run(&table, FftCmd::TableInfo, &()).unwrap();
        assert_eq!(info.size, 1);
        assert_eq!(info.max_bucket_size, 1);

        let resp: RemovedResp =
            run(&table, FftCmd::RemoveFlows, &RemoveFlowsReq { port: 3 })
                .unwrap();
        assert_eq!(resp.removed, 1);
        assert_eq!(table.read().len(), 0);
    }

    #[test]
    fn set_params() {
        let table = KRwLock::new(FlowTable::default());
        let req = SetParamsReq {
            params: vec![ParamSet::Timeout(250), ParamSet::GcOnCheck(true)],
        };
        let resp: TableParams = run(&table, FftCmd::SetParams, &req).unwrap();
        assert_eq!(resp.timeout_ms, 250);
        assert!(resp.gc_on_check);
        assert!(resp.loop_avoidance);

        let resp: TableParams = run(&table, FftCmd::GetParams, &()).unwrap();
        assert_eq!(resp.timeout_ms, 250);
    }
}
