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

//! # Collector Configuration Module 🕸️
//!
//! A module for configuring the collector.
//!
//! ## Overview
//!
//! Possible configuration include:
//! * `poll-interval`: milliseconds between two polling cycles. Defaults to 60000.
//! * `metrics-port`: when set, prometheus metrics are served on this port.
//! * `source-chain`: the smart-contract-chain RPC endpoint to poll.
//! * `target-chain`: the target-chain node used to broadcast transactions.
//! * `signers`: how the operators' remote signers are queried.
//! * `covenant`: parameters of the custody script.
//!
//! Every key can be overridden from the environment, e.g.
//! `CC_COLLECTOR_SIGNERS__MAX_CONCURRENCY=4` for `signers.max-concurrency`.

/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Default values of optional configuration keys.
pub mod defaults;
/// Utils for processing configuration
pub mod utils;

use std::time::Duration;

use serde::Deserialize;

use cc_collector_types::rpc_url::RpcUrl;
use cc_collector_types::secret::Secret;
use cc_collector_utils::Error;

/// Most keys a custody-script multisig branch can hold.
const MAX_THRESHOLD: usize = 16;

/// CollectorConfig is the configuration for the covenant collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectorConfig {
    /// Milliseconds to sleep between two polling cycles.
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval: u64,
    /// Port of the prometheus metrics endpoint, disabled when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// The chain the pending transfers are read from.
    pub source_chain: SourceChainConfig,
    /// The chain the finalized transactions are broadcast to.
    pub target_chain: TargetChainConfig,
    /// How the operators' remote signers are queried.
    #[serde(default)]
    pub signers: SignersConfig,
    /// Parameters of the custody script.
    #[serde(default)]
    pub covenant: CovenantConfig,
}

impl CollectorConfig {
    /// The interval between two polling cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    /// Makes sure that the config is valid, by going
    /// through the whole config and doing some basic checks.
    pub fn verify(&self) -> cc_collector_utils::Result<()> {
        if self.poll_interval == 0 {
            return Err(Error::InvalidConfig(
                "poll-interval must be greater than zero".into(),
            ));
        }
        if self.signers.threshold == 0 || self.signers.threshold > MAX_THRESHOLD {
            return Err(Error::InvalidConfig(format!(
                "signers.threshold must be between 1 and {MAX_THRESHOLD}, got {}",
                self.signers.threshold
            )));
        }
        if self.signers.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "signers.max-concurrency must be greater than zero".into(),
            ));
        }
        if self.covenant.monitor_threshold == 0
            || self.covenant.monitor_threshold > MAX_THRESHOLD
        {
            return Err(Error::InvalidConfig(format!(
                "covenant.monitor-threshold must be between 1 and {MAX_THRESHOLD}, got {}",
                self.covenant.monitor_threshold
            )));
        }
        Ok(())
    }
}

/// SourceChainConfig is the configuration of the smart-contract-chain reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceChainConfig {
    /// Http(s) Endpoint for quick Req/Res
    pub http_endpoint: RpcUrl,
    /// Milliseconds before a request is abandoned.
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout: u64,
}

impl SourceChainConfig {
    /// The timeout of one request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// TargetChainConfig is the configuration of the transaction broadcaster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetChainConfig {
    /// Http(s) Endpoint of the node's JSON-RPC interface.
    pub http_endpoint: RpcUrl,
    /// RPC user name.
    pub username: String,
    /// RPC password, either a literal or `$ENV_VAR`.
    pub password: Secret,
    /// Milliseconds before a request is abandoned.
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout: u64,
}

impl TargetChainConfig {
    /// The timeout of one request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// SignersConfig describes how remote signers are queried.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SignersConfig {
    /// Number of operator signatures required to spend a custody output.
    #[serde(default = "defaults::threshold")]
    pub threshold: usize,
    /// Milliseconds before a signature request is abandoned.
    #[serde(default = "defaults::signer_request_timeout")]
    pub request_timeout: u64,
    /// Most signature requests in flight at once for one transfer.
    #[serde(default = "defaults::max_concurrency")]
    pub max_concurrency: usize,
}

impl SignersConfig {
    /// The timeout of one signature request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

impl Default for SignersConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::threshold(),
            request_timeout: defaults::signer_request_timeout(),
            max_concurrency: defaults::max_concurrency(),
        }
    }
}

/// CovenantConfig holds the parameters of the custody script.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CovenantConfig {
    /// Number of monitor signatures on the recovery branch.
    #[serde(default = "defaults::monitor_threshold")]
    pub monitor_threshold: usize,
    /// Relative lock time of the recovery branch, in blocks.
    #[serde(default = "defaults::monitor_delay_blocks")]
    pub monitor_delay_blocks: u16,
    /// Fee deducted from every custody output spent, in satoshis.
    #[serde(default = "defaults::miner_fee")]
    pub miner_fee: u64,
}

impl Default for CovenantConfig {
    fn default() -> Self {
        Self {
            monitor_threshold: defaults::monitor_threshold(),
            monitor_delay_blocks: defaults::monitor_delay_blocks(),
            miner_fee: defaults::miner_fee(),
        }
    }
}
