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

use cc_collector_covenant::{Covenant, TxTemplate};
use cc_collector_tx_broadcaster::{BroadcastOutcome, Broadcaster};
use cc_collector_types::{PendingTransfer, Signature, Txid};
use cc_collector_utils::{probe, Error, Result};

/// How a transfer left the collector in this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The target chain accepted the transaction.
    Broadcast(Txid),
    /// The target chain already had the transaction.
    AlreadyKnown(Txid),
}

/// Refuses to sign a template whose sign hash differs from the one the
/// source chain expects.
pub fn check_sign_hash(
    transfer: &PendingTransfer,
    template: &TxTemplate,
) -> Result<()> {
    match transfer.sign_hash {
        Some(expected) if expected != template.sign_hash => {
            Err(Error::SignHashMismatch {
                expected: expected.to_string(),
                actual: template.sign_hash.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Assembles the transaction of `template` and hands it to the target chain.
pub async fn finalize_and_broadcast<C, B>(
    covenant: &C,
    broadcaster: &B,
    template: &TxTemplate,
    signatures: &[Signature],
) -> Result<TransferOutcome>
where
    C: Covenant + ?Sized,
    B: Broadcaster + ?Sized,
{
    let tx = covenant.finalize(template, signatures)?;
    let txid = tx.txid;
    let outcome = broadcaster.broadcast(&tx).await;
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Broadcast,
        %txid,
        size = tx.raw.len(),
        ok = outcome.is_ok(),
    );
    match outcome? {
        BroadcastOutcome::Accepted(_) => Ok(TransferOutcome::Broadcast(txid)),
        BroadcastOutcome::AlreadyKnown => Ok(TransferOutcome::AlreadyKnown(txid)),
    }
}
