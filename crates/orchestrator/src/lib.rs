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
//! # Orchestrator 🕸️
//!
//! One polling cycle reads the custody epochs and the pending transfers from
//! the source chain, then drives every transfer through
//! `sign request -> quorum -> finalize -> broadcast`. A failing transfer never
//! stops its siblings, and nothing survives a cycle: whatever is still
//! pending is read again, and retried, on the next one.

/// The polling loop.
pub mod cycle;
/// Binding transfers to the custody epoch that owns their funds.
pub mod epoch_resolver;
/// Turning a template and its signatures into a broadcast transaction.
pub mod finalizer;
/// Threshold signature collection.
pub mod quorum;

pub use cycle::{CycleReport, Orchestrator, TransferReport};
pub use epoch_resolver::{BoundEpoch, ResolvedEpochs};
pub use finalizer::TransferOutcome;
pub use quorum::QuorumCollector;

#[cfg(test)]
pub(crate) mod test_utils;
