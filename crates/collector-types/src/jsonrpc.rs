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

use serde::{Deserialize, Serialize};

use cc_collector_utils::{Error, Result};

/// A JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub struct Request<'a, P> {
    /// Protocol version, `"1.0"` or `"2.0"`.
    pub jsonrpc: &'a str,
    /// Request id echoed back by the server.
    pub id: &'a str,
    /// Remote method name.
    pub method: &'a str,
    /// Positional parameters.
    pub params: P,
}

/// A JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    /// The result, `null` when the call failed.
    pub result: Option<T>,
    /// The error object, `null` when the call succeeded.
    pub error: Option<RpcError>,
    /// Echo of the request id.
    #[serde(default)]
    pub id: serde_json::Value,
}

/// The error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human readable error message.
    pub message: String,
}

impl<T> Response<T> {
    /// Converts the envelope into its result, mapping a non-null error object
    /// into [`Error::JsonRpc`].
    pub fn into_result(self) -> Result<Option<T>> {
        match self.error {
            Some(RpcError { code, message }) => {
                Err(Error::JsonRpc { code, message })
            }
            None => Ok(self.result),
        }
    }
}
