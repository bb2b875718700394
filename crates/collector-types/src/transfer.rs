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

use crate::{CustodyAddress, Hash160, SignHash, Txid};

/// What a pending transfer does with the custody output it spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Pay bridged funds out to an end user.
    Redeem {
        /// HASH160 of the destination public key (P2PKH).
        destination: Hash160,
    },
    /// Move the output from the legacy epoch's custody to the current one's.
    ConvertEpoch,
}

/// A transfer the source chain reports as pending.
///
/// Read fresh every cycle and never mutated: it disappears from the feed once
/// the source chain observes it settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    /// Redeem or conversion.
    pub kind: TransferKind,
    /// Transaction holding the custody output.
    pub txid: Txid,
    /// Index of the custody output.
    pub vout: u32,
    /// Value of the custody output, in satoshis.
    pub amount: u64,
    /// The custody address holding the output, when the source chain reports it.
    pub custody_address: Option<CustodyAddress>,
    /// The digest the source chain expects the operators to sign, if reported.
    pub sign_hash: Option<SignHash>,
}

impl PendingTransfer {
    /// `txid:vout` of the custody output, used to identify the transfer in logs.
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }

    /// Short label of the transfer kind.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            TransferKind::Redeem { .. } => "redeem",
            TransferKind::ConvertEpoch => "convert",
        }
    }
}

/// Signed transaction bytes ready for broadcast. Never stored: a failed
/// broadcast is regenerated from scratch on the next cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct FinalizedTransaction {
    /// Serialized transaction.
    pub raw: Vec<u8>,
    /// Id of the transaction.
    pub txid: Txid,
}

impl FinalizedTransaction {
    /// Hex encoding of the raw transaction, as `sendrawtransaction` expects it.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

impl std::fmt::Debug for FinalizedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizedTransaction")
            .field("txid", &self.txid)
            .field("size", &self.raw.len())
            .finish()
    }
}
