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

use serde::Deserialize;

use cc_collector_types::{Operator, SignHash, Signature};
use cc_collector_utils::{Error, Result};

use crate::SignerClient;

/// Body of a `GET /sig` response.
#[derive(Debug, Deserialize)]
struct SigResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: String,
    #[serde(default)]
    error: String,
}

/// Queries `GET {endpoint}/sig?hash=<hex>` on each operator's signer.
#[derive(Debug, Clone)]
pub struct HttpSignerClient {
    client: reqwest::Client,
}

impl HttpSignerClient {
    /// Creates a client whose every request is abandoned after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SignerClient for HttpSignerClient {
    #[tracing::instrument(
        skip_all,
        fields(endpoint = %operator.endpoint, hash = %sign_hash)
    )]
    async fn request_signature(
        &self,
        operator: &Operator,
        sign_hash: &SignHash,
    ) -> Result<Signature> {
        let url = format!("{}/sig", operator.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("hash", sign_hash.to_string())])
            .send()
            .await
            .map_err(|e| timeout_or(e, "signer request"))?;
        let body: SigResponse = response
            .json()
            .await
            .map_err(|e| timeout_or(e, "signer request"))?;

        let rejected = |reason: String| Error::SignerRejected {
            endpoint: operator.endpoint.clone(),
            reason,
        };
        if !body.error.is_empty() {
            return Err(rejected(body.error));
        }
        if !body.success {
            return Err(rejected("signer reported failure".into()));
        }
        let signature: Signature = body.result.parse()?;
        if signature.as_bytes().is_empty() {
            return Err(rejected("empty signature".into()));
        }
        tracing::trace!(size = signature.as_bytes().len(), "Got signature share");
        Ok(signature)
    }
}

fn timeout_or(e: reqwest::Error, operation: &'static str) -> Error {
    if e.is_timeout() {
        Error::Timeout { operation }
    } else {
        Error::from(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::{routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn(app: Router) -> String {
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        format!("http://{addr}/")
    }

    fn operator(endpoint: String) -> Operator {
        Operator {
            pubkey: cc_collector_types::PublicKey([0x02; 33]),
            endpoint,
        }
    }

    #[tokio::test]
    async fn signer_echoes_hash() {
        let app = Router::new().route(
            "/sig",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                // sign "hash" by echoing its first byte
                let hash = q.get("hash").cloned().unwrap_or_default();
                Json(json!({
                    "success": true,
                    "result": format!("0x30{}41", &hash[..2]),
                }))
            }),
        );
        let endpoint = spawn(app).await;
        let client = HttpSignerClient::new(Duration::from_secs(5)).unwrap();
        let sig = client
            .request_signature(&operator(endpoint), &SignHash([0xab; 32]))
            .await
            .unwrap();
        assert_eq!(sig.0, vec![0x30, 0xab, 0x41]);
    }

    #[tokio::test]
    async fn explicit_error_is_a_rejection() {
        let app = Router::new().route(
            "/sig",
            get(|| async {
                Json::<Value>(json!({
                    "success": false,
                    "error": "unknown sign hash",
                }))
            }),
        );
        let endpoint = spawn(app).await;
        let client = HttpSignerClient::new(Duration::from_secs(5)).unwrap();
        let err = client
            .request_signature(&operator(endpoint), &SignHash([0; 32]))
            .await
            .unwrap_err();
        match err {
            Error::SignerRejected { reason, .. } => {
                assert_eq!(reason, "unknown sign hash")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_signer_fails() {
        let client = HttpSignerClient::new(Duration::from_millis(500)).unwrap();
        let res = client
            .request_signature(
                &operator("http://127.0.0.1:1".into()),
                &SignHash([0; 32]),
            )
            .await;
        assert!(res.is_err());
    }
}
