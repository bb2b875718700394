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

#![warn(missing_docs)]
//! # Signing Backend 🕸️
//!
//! Every operator of a custody epoch runs a remote signer holding its key.
//! A [`SignerClient`] asks one of them for its signature over a sign hash.

use cc_collector_types::{Operator, SignHash, Signature};
use cc_collector_utils::Result;

/// HTTP client of the operators' signers.
pub mod http;

pub use http::HttpSignerClient;

/// Requests signature shares from remote signers.
#[async_trait::async_trait]
pub trait SignerClient: Send + Sync {
    /// Asks `operator` to sign `sign_hash`.
    ///
    /// Any failure, including an explicit refusal by the signer, is an error;
    /// the caller decides whether the remaining operators are enough.
    async fn request_signature(
        &self,
        operator: &Operator,
        sign_hash: &SignHash,
    ) -> Result<Signature>;
}
