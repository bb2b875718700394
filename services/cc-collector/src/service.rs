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

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;

use cc_collector_context::CollectorContext;
use cc_collector_orchestrator::{Orchestrator, QuorumCollector};
use cc_collector_utils::metric::Metrics;

/// Builds the collaborators of the orchestrator from the context and starts
/// the polling loop on a background task.
///
/// Fails, and starts nothing, when a client cannot be constructed.
pub fn ignite(ctx: &CollectorContext) -> crate::Result<JoinHandle<()>> {
    tracing::debug!("Collector configuration: {:?}", ctx.config);
    let reader = ctx.source_chain_reader()?;
    let signer = ctx.signer_client()?;
    let broadcaster = ctx.broadcaster()?;
    let covenant = ctx.covenant();

    let signers = &ctx.config.signers;
    let quorum = QuorumCollector::builder()
        .signer(signer)
        .threshold(signers.threshold)
        .request_timeout(signers.request_timeout())
        .max_concurrency(signers.max_concurrency)
        .metrics(ctx.metrics.clone())
        .build();
    let orchestrator = Orchestrator::builder()
        .reader(reader)
        .quorum(quorum)
        .broadcaster(broadcaster)
        .covenant(covenant)
        .poll_interval(ctx.config.poll_interval())
        .metrics(ctx.metrics.clone())
        .build();

    tracing::debug!(
        threshold = signers.threshold,
        poll_interval_ms = ctx.config.poll_interval,
        "Starting the orchestrator",
    );
    let shutdown = ctx.shutdown_signal();
    Ok(tokio::spawn(async move { orchestrator.run(shutdown).await }))
}

/// The router exposing `GET /metrics`.
pub fn metrics_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .with_state(metrics)
}

async fn handle_metrics(
    State(metrics): State<Arc<Metrics>>,
) -> Result<String, (StatusCode, String)> {
    metrics
        .gather_metrics()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Serves the prometheus metrics on `port` until shutdown.
pub async fn build_metrics_service(
    ctx: CollectorContext,
    port: u16,
) -> crate::Result<()> {
    let socket_addr = SocketAddr::new([0, 0, 0, 0].into(), port);
    let app = metrics_router(ctx.metrics.clone());
    let mut shutdown_signal = ctx.shutdown_signal();
    tracing::info!("Serving metrics on {}", socket_addr);
    axum::Server::bind(&socket_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move { shutdown_signal.recv().await })
        .await?;
    Ok(())
}
