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
//! # Transaction Broadcaster 🕸️
//!
//! Hands finalized transactions to a target-chain node.

use cc_collector_types::{FinalizedTransaction, Txid};
use cc_collector_utils::Result;

/// `sendrawtransaction` over the node's JSON-RPC 1.0 interface.
pub mod bch;

pub use bch::BchRpcBroadcaster;

/// How the node took a broadcast it did not reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Accepted into the mempool.
    Accepted(Txid),
    /// Already in the mempool or the chain, e.g. from an earlier cycle.
    AlreadyKnown,
}

/// Submits transactions to the target chain.
#[async_trait::async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submits `tx`. Never retried in place; a rejection is an error.
    async fn broadcast(&self, tx: &FinalizedTransaction) -> Result<BroadcastOutcome>;
}
