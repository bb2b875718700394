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

use cc_collector_types::jsonrpc::{Request, Response};
use cc_collector_types::rpc_url::RpcUrl;
use cc_collector_types::secret::Secret;
use cc_collector_types::{FinalizedTransaction, Txid};
use cc_collector_utils::{Error, Result};

use crate::{BroadcastOutcome, Broadcaster};

/// `RPC_VERIFY_ALREADY_IN_CHAIN`
const ALREADY_IN_CHAIN: i64 = -27;
/// `RPC_VERIFY_REJECTED`
const VERIFY_REJECTED: i64 = -26;
/// `RPC_VERIFY_ERROR`
const VERIFY_ERROR: i64 = -25;

/// A [`Broadcaster`] calling `sendrawtransaction` with basic authentication.
#[derive(Debug, Clone)]
pub struct BchRpcBroadcaster {
    endpoint: RpcUrl,
    username: String,
    password: Secret,
    client: reqwest::Client,
}

impl BchRpcBroadcaster {
    /// Creates a broadcaster whose every request is abandoned after `timeout`.
    pub fn new(
        endpoint: RpcUrl,
        username: impl Into<String>,
        password: Secret,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            username: username.into(),
            password,
            client,
        })
    }
}

/// Maps the node's error object to an outcome.
fn classify(code: i64, message: String) -> Result<BroadcastOutcome> {
    let duplicate = code == ALREADY_IN_CHAIN
        || ((code == VERIFY_REJECTED || code == VERIFY_ERROR)
            && message.to_lowercase().contains("already"));
    if duplicate {
        tracing::warn!(code, %message, "Transaction already known to the node");
        Ok(BroadcastOutcome::AlreadyKnown)
    } else {
        Err(Error::BroadcastRejected { code, message })
    }
}

#[async_trait::async_trait]
impl Broadcaster for BchRpcBroadcaster {
    #[tracing::instrument(skip_all, fields(txid = %tx.txid, endpoint = %self.endpoint))]
    async fn broadcast(&self, tx: &FinalizedTransaction) -> Result<BroadcastOutcome> {
        let request = Request {
            jsonrpc: "1.0",
            id: "cc-collector",
            method: "sendrawtransaction",
            params: [tx.to_hex()],
        };
        tracing::debug!(size = tx.raw.len(), "Sending raw transaction");
        let response = self
            .client
            .post(self.endpoint.as_url().clone())
            .basic_auth(&self.username, Some(self.password.expose()))
            .json(&request)
            .send()
            .await
            .map_err(|e| timeout_or(e, "sendrawtransaction"))?;
        // the node reports RPC errors with a non-2xx status and a JSON body
        let status = response.status();
        let body: Response<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| timeout_or(e, "sendrawtransaction"))?;
        tracing::trace!(%status, ?body, "sendrawtransaction response");

        match body.into_result() {
            Ok(result) => {
                let txid = result
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Txid>().ok())
                    .unwrap_or(tx.txid);
                if txid != tx.txid {
                    tracing::warn!(node_txid = %txid, "Node reported a different txid");
                }
                Ok(BroadcastOutcome::Accepted(txid))
            }
            Err(Error::JsonRpc { code, message }) => classify(code, message),
            Err(e) => Err(e),
        }
    }
}

fn timeout_or(e: reqwest::Error, operation: &'static str) -> Error {
    if e.is_timeout() {
        Error::Timeout { operation }
    } else {
        Error::from(e)
    }
}
