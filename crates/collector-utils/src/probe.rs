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

use derive_more::Display;
/// Target for logger
pub const TARGET: &str = "cc_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the collector changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// Start and end of one polling cycle.
    #[display(fmt = "cycle")]
    Cycle,
    /// Custody epochs derived from the source chain descriptor.
    #[display(fmt = "epoch_resolution")]
    EpochResolution,
    /// A single request to an operator's signer.
    #[display(fmt = "signer_query")]
    SignerQuery,
    /// Outcome of collecting signatures for one transfer.
    #[display(fmt = "quorum")]
    Quorum,
    /// Submission of a finalized transaction to the target chain.
    #[display(fmt = "broadcast")]
    Broadcast,
}
