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

use std::sync::Arc;
use std::time::Duration;

use typed_builder::TypedBuilder;

use cc_collector_context::Shutdown;
use cc_collector_covenant::Covenant;
use cc_collector_signing_backend::SignerClient;
use cc_collector_source_chain::ChainStateReader;
use cc_collector_tx_broadcaster::Broadcaster;
use cc_collector_types::{PendingTransfer, TransferKind};
use cc_collector_utils::metric::Metrics;
use cc_collector_utils::{probe, Error, Result};

use crate::epoch_resolver::ResolvedEpochs;
use crate::finalizer::{check_sign_hash, finalize_and_broadcast, TransferOutcome};
use crate::quorum::QuorumCollector;

/// The result of one transfer in one cycle.
#[derive(Debug)]
pub struct TransferReport {
    /// `txid:vout` of the custody output.
    pub outpoint: String,
    /// `redeem` or `convert`.
    pub kind: &'static str,
    /// What happened to it.
    pub result: Result<TransferOutcome>,
}

/// Outcomes of every transfer of one cycle, in processing order.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// One entry per pending transfer.
    pub transfers: Vec<TransferReport>,
}

impl CycleReport {
    /// Transfers that reached the target chain.
    pub fn settled(&self) -> usize {
        self.transfers.iter().filter(|t| t.result.is_ok()).count()
    }

    /// Transfers that will be retried next cycle.
    pub fn failed(&self) -> usize {
        self.transfers.len() - self.settled()
    }
}

/// Drives the polling cycle.
#[derive(TypedBuilder)]
pub struct Orchestrator<R, S, B, C> {
    reader: R,
    quorum: QuorumCollector<S>,
    broadcaster: B,
    covenant: C,
    /// Sleep between two cycles.
    #[builder(default = Duration::from_secs(60))]
    poll_interval: Duration,
    metrics: Arc<Metrics>,
}

impl<R, S, B, C> Orchestrator<R, S, B, C>
where
    R: ChainStateReader,
    S: SignerClient,
    B: Broadcaster,
    C: Covenant,
{
    /// Runs cycles until `shutdown` fires.
    ///
    /// A cycle is never interrupted: the signal is only honoured between two
    /// cycles, and the next cycle starts only once the previous one finished
    /// and the poll interval elapsed.
    pub async fn run(&self, mut shutdown: Shutdown) {
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            orchestrator = "started",
            poll_interval_ms = self.poll_interval.as_millis() as u64,
        );
        loop {
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    pending = report.transfers.len(),
                    settled = report.settled(),
                    failed = report.failed(),
                    "Cycle finished",
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    "Cycle aborted, retrying after the poll interval",
                ),
            }
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.recv() => break,
            }
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            orchestrator = "stopped",
        );
    }

    /// Runs a single cycle.
    ///
    /// Returns an error only when the source chain could not be read, in
    /// which case no transfer is touched. Transfer failures are reported in
    /// the [`CycleReport`].
    #[tracing::instrument(skip_all)]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.metrics.cycles_total.inc();
        let (epochs, redeems, conversions) = match self.read_chain_state().await {
            Ok(state) => state,
            Err(e) => {
                self.metrics.cycles_aborted_total.inc();
                return Err(e);
            }
        };
        let pending = redeems.len() + conversions.len();
        self.metrics.pending_transfers.set(pending as i64);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Cycle,
            started = true,
            redeems = redeems.len(),
            conversions = conversions.len(),
        );

        let mut report = CycleReport::default();
        for transfer in redeems.iter().chain(conversions.iter()) {
            let result = self.process_transfer(&epochs, transfer).await;
            self.record(transfer, &result);
            report.transfers.push(TransferReport {
                outpoint: transfer.outpoint(),
                kind: transfer.kind_label(),
                result,
            });
        }

        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Cycle,
            finished = true,
            settled = report.settled(),
            failed = report.failed(),
        );
        Ok(report)
    }

    async fn read_chain_state(
        &self,
    ) -> Result<(ResolvedEpochs, Vec<PendingTransfer>, Vec<PendingTransfer>)> {
        let descriptor = self.reader.custody_epoch_descriptor().await?;
        let epochs = ResolvedEpochs::resolve(&descriptor, &self.covenant);
        let redeems = self.reader.pending_redeems().await?;
        let conversions = self.reader.pending_conversions().await?;
        Ok((epochs, redeems, conversions))
    }

    #[tracing::instrument(
        skip_all,
        fields(outpoint = %transfer.outpoint(), kind = transfer.kind_label())
    )]
    async fn process_transfer(
        &self,
        epochs: &ResolvedEpochs,
        transfer: &PendingTransfer,
    ) -> Result<TransferOutcome> {
        let (epoch, template) = match transfer.kind {
            TransferKind::Redeem { destination } => {
                let epoch = epochs.bind_redeem(transfer)?;
                let template =
                    self.covenant.redeem_template(epoch, transfer, &destination)?;
                (epoch, template)
            }
            TransferKind::ConvertEpoch => {
                let (legacy, current) = epochs.bind_conversion();
                let template =
                    self.covenant.conversion_template(legacy, current, transfer)?;
                (legacy, template)
            }
        };
        tracing::debug!(epoch = %epoch.kind, hash = %template.sign_hash, "Built signing request");
        check_sign_hash(transfer, &template)?;

        let signatures = self
            .quorum
            .collect(&self.covenant, &template.sign_hash, &epoch.operators)
            .await?;
        finalize_and_broadcast(
            &self.covenant,
            &self.broadcaster,
            &template,
            &signatures,
        )
        .await
    }

    fn record(&self, transfer: &PendingTransfer, result: &Result<TransferOutcome>) {
        let outpoint = transfer.outpoint();
        let kind = transfer.kind_label();
        match result {
            Ok(TransferOutcome::Broadcast(txid)) => {
                self.metrics.transfers_broadcast_total.inc();
                tracing::info!(%outpoint, kind, %txid, "Transaction broadcast");
            }
            Ok(TransferOutcome::AlreadyKnown(txid)) => {
                self.metrics.transfers_broadcast_total.inc();
                tracing::warn!(%outpoint, kind, %txid, "Transaction was already known");
            }
            Err(e) => {
                self.metrics.transfers_failed_total.inc();
                match e {
                    Error::UnresolvableCustodyAddress { .. } => {
                        self.metrics.transfers_unresolvable_total.inc()
                    }
                    Error::InsufficientQuorum { .. } => {
                        self.metrics.insufficient_quorum_total.inc()
                    }
                    Error::BroadcastRejected { .. } => {
                        self.metrics.broadcast_rejected_total.inc()
                    }
                    _ => {}
                }
                tracing::warn!(%outpoint, kind, error = %e, "Transfer skipped this cycle");
            }
        }
    }
}
