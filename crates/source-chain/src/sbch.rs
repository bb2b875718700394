// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use serde::de::DeserializeOwned;

use cc_collector_types::jsonrpc::{Request, Response};
use cc_collector_types::rpc_url::RpcUrl;
use cc_collector_types::{CustodyEpochDescriptor, PendingTransfer};
use cc_collector_utils::{Error, Result};

use crate::wire::{CcInfo, UtxoInfos};
use crate::ChainStateReader;

const GET_CC_INFO: &str = "sbch_getCcInfo";
const GET_REDEEMING_UTXOS: &str = "sbch_getRedeemingUtxosForOperators";
const GET_TO_BE_CONVERTED_UTXOS: &str = "sbch_getToBeConvertedUtxosForOperators";

/// A [`ChainStateReader`] talking JSON-RPC to a smartBCH node.
#[derive(Debug, Clone)]
pub struct SbchRpcClient {
    endpoint: RpcUrl,
    client: reqwest::Client,
}

impl SbchRpcClient {
    /// Creates a client whose every request is abandoned after `timeout`.
    pub fn new(endpoint: RpcUrl, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
    ) -> Result<Option<T>> {
        let request = Request {
            jsonrpc: "2.0",
            id: "cc-collector",
            method,
            params: Vec::<()>::new(),
        };
        let response = self
            .client
            .post(self.endpoint.as_url().clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| timeout_or(e, method))?;
        let body: Response<T> =
            response.json().await.map_err(|e| timeout_or(e, method))?;
        body.into_result()
    }
}

fn timeout_or(e: reqwest::Error, operation: &'static str) -> Error {
    if e.is_timeout() {
        Error::Timeout { operation }
    } else {
        Error::from(e)
    }
}

#[async_trait::async_trait]
impl ChainStateReader for SbchRpcClient {
    async fn custody_epoch_descriptor(&self) -> Result<CustodyEpochDescriptor> {
        let info: CcInfo = self
            .call(GET_CC_INFO)
            .await?
            .ok_or(Error::Generic("sbch_getCcInfo returned null"))?;
        Ok(info.into())
    }

    async fn pending_redeems(&self) -> Result<Vec<PendingTransfer>> {
        let utxos: UtxoInfos =
            self.call(GET_REDEEMING_UTXOS).await?.unwrap_or_default();
        let total = utxos.infos.len();
        let redeems: Vec<_> = utxos
            .infos
            .into_iter()
            .filter_map(|info| {
                let outpoint = format!("{}:{}", info.txid, info.index);
                let redeem = info.into_redeem();
                if redeem.is_none() {
                    tracing::warn!(%outpoint, "Redeem without a target, ignoring");
                }
                redeem
            })
            .collect();
        tracing::debug!(total, usable = redeems.len(), "Fetched pending redeems");
        Ok(redeems)
    }

    async fn pending_conversions(&self) -> Result<Vec<PendingTransfer>> {
        let utxos: UtxoInfos =
            self.call(GET_TO_BE_CONVERTED_UTXOS).await?.unwrap_or_default();
        tracing::debug!(total = utxos.infos.len(), "Fetched pending conversions");
        Ok(utxos
            .infos
            .into_iter()
            .map(|info| info.into_conversion())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    const PUBKEY: &str =
        "0x03aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899";
    const TXID: &str =
        "0x2222222222222222222222222222222222222222222222222222222222222222";

    async fn rpc(Json(req): Json<Value>) -> Json<Value> {
        let result = match req["method"].as_str() {
            Some(GET_CC_INFO) => json!({
                "operators": [
                    { "pubkey": PUBKEY, "rpcUrl": "https://op0" },
                    { "pubkey": PUBKEY, "rpcUrl": "https://op1" },
                ],
                "monitors": [{ "pubkey": PUBKEY }],
                "oldOperators": [],
                "oldMonitors": null,
            }),
            Some(GET_REDEEMING_UTXOS) => json!({
                "infos": [{
                    "covenantAddr": "0x00112233445566778899aabbccddeeff00112233",
                    "redeemTarget": "0xffeeddccbbaa99887766554433221100ffeeddcc",
                    "txid": TXID,
                    "index": 0,
                    "amount": 100000,
                }]
            }),
            Some(GET_TO_BE_CONVERTED_UTXOS) => json!({ "infos": null }),
            _ => {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": req["id"],
                    "error": { "code": -32601, "message": "method not found" },
                }))
            }
        };
        Json(json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }))
    }

    async fn spawn(app: Router) -> RpcUrl {
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        format!("http://{addr}").parse().unwrap()
    }

    #[tokio::test]
    async fn reads_descriptor_and_transfers() {
        let url = spawn(Router::new().route("/", post(rpc))).await;
        let client = SbchRpcClient::new(url, Duration::from_secs(5)).unwrap();

        let descriptor = client.custody_epoch_descriptor().await.unwrap();
        assert_eq!(descriptor.current_operators.len(), 2);
        assert_eq!(descriptor.current_operators[1].endpoint, "https://op1");
        assert!(descriptor.legacy_operators.is_empty());

        let redeems = client.pending_redeems().await.unwrap();
        assert_eq!(redeems.len(), 1);
        assert_eq!(redeems[0].amount, 100_000);

        let conversions = client.pending_conversions().await.unwrap();
        assert!(conversions.is_empty());
    }

    #[tokio::test]
    async fn rpc_errors_are_surfaced() {
        let app = Router::new().route(
            "/",
            post(|| async {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": "cc-collector",
                    "error": { "code": -32000, "message": "node is syncing" },
                }))
            }),
        );
        let url = spawn(app).await;
        let client = SbchRpcClient::new(url, Duration::from_secs(5)).unwrap();
        let err = client.pending_redeems().await.unwrap_err();
        assert!(matches!(err, Error::JsonRpc { code: -32000, .. }));
    }

    #[tokio::test]
    async fn slow_node_times_out() {
        let app = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "jsonrpc": "2.0", "id": 1, "result": null }))
            }),
        );
        let url = spawn(app).await;
        let client =
            SbchRpcClient::new(url, Duration::from_millis(100)).unwrap();
        let err = client.custody_epoch_descriptor().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { operation: GET_CC_INFO }));
    }
}
