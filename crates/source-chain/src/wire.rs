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

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use cc_collector_types::bytes::quantity;
use cc_collector_types::{
    CustodyEpochDescriptor, Hash160, Operator, PendingTransfer, PublicKey,
    SignHash, TransferKind, Txid,
};

/// Result of `sbch_getCcInfo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcInfo {
    /// Operators of the current epoch.
    #[serde(default, deserialize_with = "nullable")]
    pub operators: Vec<OperatorInfo>,
    /// Monitors of the current epoch.
    #[serde(default, deserialize_with = "nullable")]
    pub monitors: Vec<MonitorInfo>,
    /// Operators of the previous epoch.
    #[serde(default, deserialize_with = "nullable")]
    pub old_operators: Vec<OperatorInfo>,
    /// Monitors of the previous epoch.
    #[serde(default, deserialize_with = "nullable")]
    pub old_monitors: Vec<MonitorInfo>,
}

/// One operator entry of [`CcInfo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    /// Key placed in the custody script.
    pub pubkey: PublicKey,
    /// Base URL of the operator's signer.
    #[serde(default)]
    pub rpc_url: String,
}

/// One monitor entry of [`CcInfo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorInfo {
    /// Key placed in the custody script.
    pub pubkey: PublicKey,
}

/// Result of the pending UTXO queries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoInfos {
    /// The pending outputs, `null` when there are none.
    #[serde(default, deserialize_with = "nullable")]
    pub infos: Vec<UtxoInfo>,
}

/// One custody output the chain wants spent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoInfo {
    /// Custody address holding the output.
    #[serde(default, deserialize_with = "optional_hex")]
    pub covenant_addr: Option<Hash160>,
    /// Payout destination of a redeem.
    #[serde(default, deserialize_with = "optional_hex")]
    pub redeem_target: Option<Hash160>,
    /// Transaction holding the output.
    pub txid: Txid,
    /// Output index.
    pub index: u32,
    /// Output value in satoshis.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub amount: u64,
    /// Digest the chain expects the operators to sign.
    #[serde(default, deserialize_with = "optional_hex")]
    pub tx_sig_hash: Option<SignHash>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null`, `""` and `"0x"` all mean absent.
fn optional_hex<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() || s == "0x" => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl From<CcInfo> for CustodyEpochDescriptor {
    fn from(info: CcInfo) -> Self {
        let operators = |list: Vec<OperatorInfo>| -> Vec<Operator> {
            list.into_iter()
                .map(|o| Operator {
                    pubkey: o.pubkey,
                    endpoint: o.rpc_url,
                })
                .collect()
        };
        let monitors = |list: Vec<MonitorInfo>| -> Vec<PublicKey> {
            list.into_iter().map(|m| m.pubkey).collect()
        };
        Self {
            current_operators: operators(info.operators),
            current_monitors: monitors(info.monitors),
            legacy_operators: operators(info.old_operators),
            legacy_monitors: monitors(info.old_monitors),
        }
    }
}

impl UtxoInfo {
    /// A pending redeem, or `None` when the entry carries no destination.
    pub fn into_redeem(self) -> Option<PendingTransfer> {
        let destination = self.redeem_target?;
        Some(self.into_transfer(TransferKind::Redeem { destination }))
    }

    /// A pending epoch conversion.
    pub fn into_conversion(self) -> PendingTransfer {
        self.into_transfer(TransferKind::ConvertEpoch)
    }

    fn into_transfer(self, kind: TransferKind) -> PendingTransfer {
        PendingTransfer {
            kind,
            txid: self.txid,
            vout: self.index,
            amount: self.amount,
            custody_address: self.covenant_addr,
            sign_hash: self.tx_sig_hash,
        }
    }
}
