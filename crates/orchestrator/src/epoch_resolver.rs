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

use cc_collector_covenant::Covenant;
use cc_collector_types::{
    CustodyAddress, CustodyEpoch, CustodyEpochDescriptor, EpochKind,
    PendingTransfer,
};
use cc_collector_utils::{probe, Error, Result};

/// A custody epoch with its address, when one could be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEpoch {
    /// The key sets.
    pub epoch: CustodyEpoch,
    /// The custody address, `None` if the key sets do not form a valid script.
    pub address: Option<CustodyAddress>,
}

/// The two custody epochs of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEpochs {
    /// The epoch currently in force.
    pub current: BoundEpoch,
    /// The epoch being rotated away from. Aliases `current`'s key sets when
    /// the descriptor reports no previous ones.
    pub legacy: BoundEpoch,
}

impl ResolvedEpochs {
    /// Derives both epochs and their custody addresses from a descriptor.
    pub fn resolve<C: Covenant + ?Sized>(
        descriptor: &CustodyEpochDescriptor,
        covenant: &C,
    ) -> Self {
        let current = CustodyEpoch {
            kind: EpochKind::Current,
            operators: descriptor.current_operators.clone(),
            monitors: descriptor.current_monitors.clone(),
        };
        let legacy = CustodyEpoch {
            kind: EpochKind::Legacy,
            operators: if descriptor.legacy_operators.is_empty() {
                current.operators.clone()
            } else {
                descriptor.legacy_operators.clone()
            },
            monitors: if descriptor.legacy_monitors.is_empty() {
                current.monitors.clone()
            } else {
                descriptor.legacy_monitors.clone()
            },
        };

        let current = bind(current, covenant);
        let legacy = bind(legacy, covenant);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::EpochResolution,
            current_address = ?current.address,
            current_operators = current.epoch.operators.len(),
            legacy_address = ?legacy.address,
            legacy_operators = legacy.epoch.operators.len(),
            aliased = current.epoch.same_keys_as(&legacy.epoch),
        );
        Self { current, legacy }
    }

    /// The epoch owning a redeem transfer's custody output. `Current` wins
    /// when both epochs share an address.
    pub fn bind_redeem(&self, transfer: &PendingTransfer) -> Result<&CustodyEpoch> {
        let address = transfer.custody_address.ok_or_else(|| {
            Error::UnresolvableCustodyAddress {
                address: String::from("<none>"),
            }
        })?;
        [&self.current, &self.legacy]
            .into_iter()
            .find(|bound| bound.address == Some(address))
            .map(|bound| &bound.epoch)
            .ok_or_else(|| Error::UnresolvableCustodyAddress {
                address: address.to_string(),
            })
    }

    /// Conversions always spend from `Legacy` towards `Current`.
    pub fn bind_conversion(&self) -> (&CustodyEpoch, &CustodyEpoch) {
        (&self.legacy.epoch, &self.current.epoch)
    }
}

fn bind<C: Covenant + ?Sized>(epoch: CustodyEpoch, covenant: &C) -> BoundEpoch {
    let address = match covenant.custody_address(&epoch) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::warn!(
                epoch = %epoch.kind,
                error = %e,
                "Cannot derive the custody address",
            );
            None
        }
    };
    BoundEpoch { epoch, address }
}
