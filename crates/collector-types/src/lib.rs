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
//! # Collector Types 🕸️
//!
//! Byte-level primitives shared across the collector and the data model that
//! flows through one polling cycle.

/// Fixed-size hex encoded byte types.
pub mod bytes;
/// Custody epochs and their descriptor.
pub mod epoch;
/// JSON-RPC request and response framing.
pub mod jsonrpc;
/// An RPC URL that can be read from the environment.
pub mod rpc_url;
/// Secret strings that can be read from the environment.
pub mod secret;
/// Pending cross-chain transfers and finalized transactions.
pub mod transfer;

pub use bytes::{Hash160, PublicKey, SignHash, Signature, Txid};
pub use epoch::{CustodyEpoch, CustodyEpochDescriptor, EpochKind, Operator};
pub use transfer::{FinalizedTransaction, PendingTransfer, TransferKind};

/// A custody address is the HASH160 of the custody redeem script.
pub type CustodyAddress = Hash160;
