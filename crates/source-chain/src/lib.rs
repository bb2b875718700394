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
//! # Source Chain 🕸️
//!
//! The collector's view of the smart-contract chain: the custody-epoch
//! descriptor and the transfers it reports as pending.

use cc_collector_types::{CustodyEpochDescriptor, PendingTransfer};
use cc_collector_utils::Result;

/// JSON-RPC client of a smartBCH node.
pub mod sbch;
/// Wire representation of the node's responses.
pub mod wire;

pub use sbch::SbchRpcClient;

/// Reads the state the collector acts on.
///
/// Every call is bounded by a timeout; a failed call fails the whole cycle.
/// "Nothing pending" is an empty list, never an error.
#[async_trait::async_trait]
pub trait ChainStateReader: Send + Sync {
    /// The current and previous custody key sets.
    async fn custody_epoch_descriptor(&self) -> Result<CustodyEpochDescriptor>;
    /// Redeem transfers waiting for their payout.
    async fn pending_redeems(&self) -> Result<Vec<PendingTransfer>>;
    /// Custody outputs waiting to be moved to the current epoch.
    async fn pending_conversions(&self) -> Result<Vec<PendingTransfer>>;
}
