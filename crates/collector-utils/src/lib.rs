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
//! Shared primitives for every crate of the covenant collector: the error
//! type, the probe log target and the prometheus metrics.

/// Metrics functionality
pub mod metric;
/// A module used for debugging the collector lifecycle and per-cycle state.
pub mod probe;

/// An enum of all possible errors that could be encountered during the execution of the
/// collector.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Hex decoding error.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Reqwest error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// HTTP Error from the metrics server.
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    /// Prometheus registration or encoding error.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// The loaded configuration failed validation.
    #[error("Invalid config: {}", _0)]
    InvalidConfig(String),
    /// A value had the wrong number of bytes.
    #[error("Invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// What was being decoded.
        what: &'static str,
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        actual: usize,
    },
    /// A network call did not finish within its deadline.
    #[error("Timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
    },
    /// The source chain answered a JSON-RPC call with an error object.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// The remote error code.
        code: i64,
        /// The remote error message.
        message: String,
    },
    /// An operator's signer answered with an explicit error.
    #[error("Signer {endpoint} refused to sign: {reason}")]
    SignerRejected {
        /// The signer endpoint that was queried.
        endpoint: String,
        /// The reason reported by the signer.
        reason: String,
    },
    /// Fewer operators than the threshold produced a signature.
    #[error("Insufficient quorum: required {required}, received {received}")]
    InsufficientQuorum {
        /// The quorum threshold.
        required: usize,
        /// The number of signatures collected.
        received: usize,
    },
    /// The custody address of a transfer matches no known custody epoch.
    #[error("Custody address {address} matches neither the current nor the legacy epoch")]
    UnresolvableCustodyAddress {
        /// Hex encoded custody address.
        address: String,
    },
    /// The sign hash reported by the source chain differs from the one derived locally.
    #[error("Sign hash mismatch: source chain reported {expected}, derived {actual}")]
    SignHashMismatch {
        /// Hex encoded sign hash reported by the source chain.
        expected: String,
        /// Hex encoded sign hash derived from the transaction template.
        actual: String,
    },
    /// A custody key set cannot be turned into a script.
    #[error("Invalid custody key set: {}", _0)]
    InvalidKeySet(String),
    /// The redeem script exceeds the P2SH push limit.
    #[error("Redeem script of {size} bytes exceeds the maximum of {max}")]
    ScriptTooLarge {
        /// The script size in bytes.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },
    /// The transferred amount does not cover the miner fee.
    #[error("Amount {amount} does not cover the miner fee {fee}")]
    AmountTooLow {
        /// The amount being spent.
        amount: u64,
        /// The configured miner fee.
        fee: u64,
    },
    /// The wrong number of signatures was handed to the finalizer.
    #[error("Expected exactly {expected} signatures, got {actual}")]
    SignatureCount {
        /// The threshold of the custody script.
        expected: usize,
        /// The number of signatures provided.
        actual: usize,
    },
    /// A signature cannot be placed in the unlocking script.
    #[error("Malformed signature at position {index}: {reason}")]
    MalformedSignature {
        /// Position of the signature in operator order.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The target chain refused the transaction.
    #[error("Transaction rejected with code {code}: {message}")]
    BroadcastRejected {
        /// The remote error code.
        code: i64,
        /// The remote error message.
        message: String,
    },
}

/// A type alias for the result for the collector, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;
