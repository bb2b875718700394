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
//! # Collector Context Module 🕸️
//!
//! A module for managing the context of the collector.

use std::sync::Arc;

use tokio::sync::broadcast;

use cc_collector_config::CollectorConfig;
use cc_collector_covenant::{CovenantParams, MultisigCovenant};
use cc_collector_signing_backend::HttpSignerClient;
use cc_collector_source_chain::SbchRpcClient;
use cc_collector_tx_broadcaster::BchRpcBroadcaster;
use cc_collector_utils::metric::Metrics;

/// CollectorContext contains the collector's configuration, metrics and
/// shutdown signal.
#[derive(Clone)]
pub struct CollectorContext {
    /// The configuration of the collector.
    pub config: CollectorConfig,
    /// Broadcasts a shutdown signal to all active tasks.
    ///
    /// When a graceful shutdown is initiated, a `()` value is sent via the
    /// broadcast::Sender. Each task receives it, reaches a safe terminal
    /// state, and completes.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the collector
    pub metrics: Arc<Metrics>,
}

impl CollectorContext {
    /// Creates a new CollectorContext.
    pub fn new(config: CollectorConfig) -> cc_collector_utils::Result<Self> {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// Returns the reader of the source chain.
    pub fn source_chain_reader(
        &self,
    ) -> cc_collector_utils::Result<SbchRpcClient> {
        let chain = &self.config.source_chain;
        tracing::debug!(endpoint = %chain.http_endpoint, "Connecting to source chain");
        SbchRpcClient::new(chain.http_endpoint.clone(), chain.request_timeout())
    }

    /// Returns the client used to query the operators' signers.
    pub fn signer_client(&self) -> cc_collector_utils::Result<HttpSignerClient> {
        HttpSignerClient::new(self.config.signers.request_timeout())
    }

    /// Returns the broadcaster of the target chain.
    pub fn broadcaster(&self) -> cc_collector_utils::Result<BchRpcBroadcaster> {
        let chain = &self.config.target_chain;
        BchRpcBroadcaster::new(
            chain.http_endpoint.clone(),
            chain.username.clone(),
            chain.password.clone(),
            chain.request_timeout(),
        )
    }

    /// Returns the custody covenant described by the configuration.
    pub fn covenant(&self) -> MultisigCovenant {
        let params = CovenantParams::builder()
            .operator_threshold(self.config.signers.threshold)
            .monitor_threshold(self.config.covenant.monitor_threshold)
            .monitor_delay_blocks(self.config.covenant.monitor_delay_blocks)
            .miner_fee(self.config.covenant.miner_fee)
            .build();
        MultisigCovenant::new(params)
    }
}

/// Listens for the server shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the task
/// should shutdown.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Returns `true` if the shutdown signal has been received.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }
}
