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
//! # Covenant 🕸️
//!
//! Everything that depends on the custody script of the target chain: the
//! custody address of an epoch, the unsigned spending transaction of a
//! transfer together with its sign hash, and the assembly of the final
//! transaction once a quorum of operator signatures is available.
//!
//! The orchestrator only talks to the [`Covenant`] trait; [`MultisigCovenant`]
//! is the P2SH multisig construction shipped with the collector.

use cc_collector_types::{
    CustodyAddress, CustodyEpoch, FinalizedTransaction, Hash160,
    PendingTransfer, SignHash, Signature,
};
use cc_collector_utils::Result;

/// The P2SH multisig custody covenant.
pub mod multisig;
/// Script opcodes and a minimal script builder.
pub mod script;
/// Transaction serialization and signature hashing.
pub mod tx;

pub use multisig::{CovenantParams, MultisigCovenant};
pub use tx::UnsignedTransaction;

/// An unsigned spending transaction for one transfer, with everything needed
/// to finalize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxTemplate {
    /// The unsigned transaction.
    pub tx: UnsignedTransaction,
    /// The redeem script of the custody output being spent.
    pub redeem_script: Vec<u8>,
    /// The digest the operators must sign.
    pub sign_hash: SignHash,
    /// How many signatures the redeem script requires.
    pub threshold: usize,
}

/// The custody script of the target chain, seen from the collector.
///
/// Operator order is positional everywhere: keys go into the script in the
/// order of [`CustodyEpoch::operators`], and [`Covenant::finalize`] expects
/// its signatures in that same order.
pub trait Covenant: Send + Sync {
    /// Number of operator signatures needed to spend a custody output.
    fn threshold(&self) -> usize;

    /// The custody address controlled by the epoch's key sets.
    fn custody_address(&self, epoch: &CustodyEpoch) -> Result<CustodyAddress>;

    /// Builds the transaction paying a redeem transfer out to `destination`.
    fn redeem_template(
        &self,
        epoch: &CustodyEpoch,
        transfer: &PendingTransfer,
        destination: &Hash160,
    ) -> Result<TxTemplate>;

    /// Builds the transaction moving a custody output of the `legacy` epoch to
    /// the custody address of the `current` epoch.
    fn conversion_template(
        &self,
        legacy: &CustodyEpoch,
        current: &CustodyEpoch,
        transfer: &PendingTransfer,
    ) -> Result<TxTemplate>;

    /// Rejects a signature the custody script could never accept. `index` is
    /// the position of the signing operator in the epoch.
    fn check_signature(&self, index: usize, signature: &Signature) -> Result<()>;

    /// Combines a template with exactly [`Covenant::threshold`] signatures,
    /// in operator order, into a broadcastable transaction.
    fn finalize(
        &self,
        template: &TxTemplate,
        signatures: &[Signature],
    ) -> Result<FinalizedTransaction>;
}
