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

use crate::PublicKey;

/// One operator of a custody epoch: a key in the custody script and the
/// endpoint of the remote signer holding the matching secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// The operator's public key, as placed in the custody script.
    pub pubkey: PublicKey,
    /// Base URL of the operator's remote signer.
    ///
    /// Kept verbatim from the source chain: an operator with a broken endpoint
    /// still occupies its position in the key ordering.
    pub endpoint: String,
}

/// The raw custody-epoch descriptor, as reported by the source chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustodyEpochDescriptor {
    /// Operators of the current epoch, in custody-script order.
    pub current_operators: Vec<Operator>,
    /// Monitors of the current epoch, in custody-script order.
    pub current_monitors: Vec<PublicKey>,
    /// Operators of the previous epoch; empty when they did not change.
    pub legacy_operators: Vec<Operator>,
    /// Monitors of the previous epoch; empty when they did not change.
    pub legacy_monitors: Vec<PublicKey>,
}

/// Which generation of custody keys an epoch is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpochKind {
    /// The epoch currently in force.
    Current,
    /// The epoch being rotated away from.
    Legacy,
}

impl std::fmt::Display for EpochKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpochKind::Current => f.write_str("current"),
            EpochKind::Legacy => f.write_str("legacy"),
        }
    }
}

/// A fully populated custody epoch.
///
/// The order of `operators` and `monitors` is significant: it determines the
/// custody script, hence the custody address, and the positional alignment of
/// signatures at finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyEpoch {
    /// Current or legacy.
    pub kind: EpochKind,
    /// Operators, in custody-script order.
    pub operators: Vec<Operator>,
    /// Monitor keys, in custody-script order.
    pub monitors: Vec<PublicKey>,
}

impl CustodyEpoch {
    /// The operator keys, in custody-script order.
    pub fn operator_keys(&self) -> Vec<PublicKey> {
        self.operators.iter().map(|o| o.pubkey).collect()
    }

    /// Returns `true` if both epochs are built from identical key sets.
    pub fn same_keys_as(&self, other: &CustodyEpoch) -> bool {
        self.operator_keys() == other.operator_keys()
            && self.monitors == other.monitors
    }
}
