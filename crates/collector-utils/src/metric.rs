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

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// A struct definition for collecting metrics in the collector.
///
/// Every instance owns its registry, so several collectors (or tests) can live
/// in the same process.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Polling cycles started.
    pub cycles_total: IntCounter,
    /// Cycles abandoned because the source chain could not be read.
    pub cycles_aborted_total: IntCounter,
    /// Transfers whose transaction was accepted (or already known) by the target chain.
    pub transfers_broadcast_total: IntCounter,
    /// Transfers that failed at any step of their pipeline.
    pub transfers_failed_total: IntCounter,
    /// Redeem transfers whose custody address matched no epoch.
    pub transfers_unresolvable_total: IntCounter,
    /// Transfers that did not reach the signature threshold.
    pub insufficient_quorum_total: IntCounter,
    /// Individual signer requests that failed or timed out.
    pub signer_failures_total: IntCounter,
    /// Transactions refused by the target chain.
    pub broadcast_rejected_total: IntCounter,
    /// Transfers reported pending by the source chain in the last cycle.
    pub pending_transfers: IntGauge,
}

impl Metrics {
    /// Instantiates the various metrics and their counters, also creates a registry for the counters and
    /// registers the counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let cycles_total =
            counter("cycles_total", "The total number of polling cycles started")?;
        let cycles_aborted_total = counter(
            "cycles_aborted_total",
            "Cycles abandoned because the source chain could not be read",
        )?;
        let transfers_broadcast_total = counter(
            "transfers_broadcast_total",
            "Transfers whose transaction reached the target chain",
        )?;
        let transfers_failed_total = counter(
            "transfers_failed_total",
            "Transfers that failed this cycle and will be retried next cycle",
        )?;
        let transfers_unresolvable_total = counter(
            "transfers_unresolvable_total",
            "Redeem transfers whose custody address matched no epoch",
        )?;
        let insufficient_quorum_total = counter(
            "insufficient_quorum_total",
            "Transfers that did not reach the signature threshold",
        )?;
        let signer_failures_total = counter(
            "signer_failures_total",
            "Signer requests that failed, errored or timed out",
        )?;
        let broadcast_rejected_total = counter(
            "broadcast_rejected_total",
            "Transactions rejected by the target chain",
        )?;
        let pending_transfers = IntGauge::new(
            "pending_transfers",
            "Transfers reported pending by the source chain in the last cycle",
        )?;
        registry.register(Box::new(pending_transfers.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            cycles_aborted_total,
            transfers_broadcast_total,
            transfers_failed_total,
            transfers_unresolvable_total,
            insufficient_quorum_total,
            signer_failures_total,
            broadcast_rejected_total,
            pending_transfers,
        })
    }

    /// Gathers the whole collector metrics in the prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, GatherMetricsError> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

/// Metrics error
#[derive(Debug, thiserror::Error)]
pub enum GatherMetricsError {
    /// Prometheus error
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// Metrics are not valid UTF-8
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_instances_can_coexist() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.cycles_total.inc();
        assert_eq!(a.cycles_total.get(), 1);
        assert_eq!(b.cycles_total.get(), 0);
    }

    #[test]
    fn gathered_text_contains_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.transfers_broadcast_total.inc_by(3);
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("transfers_broadcast_total 3"));
        assert!(text.contains("# TYPE pending_transfers gauge"));
    }
}
