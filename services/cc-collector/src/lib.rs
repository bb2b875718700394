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

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Covenant Collector Crate 🕸️
//!
//! The collector watches the smart-contract chain for custody outputs that
//! must be spent: redeems paying bridged funds back to users, and
//! conversions moving funds from a retiring custody epoch to the current
//! one. For each of them it asks the operators of the owning epoch for their
//! signatures, assembles the fully signed transaction and broadcasts it to
//! the target chain.
//!
//! The collector keeps no state of its own. The source chain is the record
//! of what is still pending, and anything that fails is simply picked up
//! again on the next polling cycle.

/// Background services of the collector.
pub mod service;

/// A type alias for the result for the collector, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, cc_collector_utils::Error>;
