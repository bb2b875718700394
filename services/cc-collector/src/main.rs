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

//! Covenant Collector Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use tokio::signal::unix;

use cc_collector::service;
use cc_collector_config::cli::{load_config, setup_logger, Opts};
use cc_collector_context::CollectorContext;

/// The main entry point for the collector.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose, "cc_collector")?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;
    config.verify()?;

    // The CollectorContext takes a configuration, and populates objects that are needed
    // throughout the lifetime of the collector.
    let ctx = CollectorContext::new(config)?;

    let metrics_handle = ctx.config.metrics_port.map(|port| {
        tokio::spawn(service::build_metrics_service(ctx.clone(), port))
    });

    // start the polling loop, failing here if a client cannot be built.
    let orchestrator_handle = service::ignite(&ctx)?;
    tracing::event!(
        target: cc_collector_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %cc_collector_utils::probe::Kind::Lifecycle,
        started = true
    );
    // watch for signals
    let mut ctrlc_signal = unix::signal(unix::SignalKind::interrupt())?;
    let mut termination_signal = unix::signal(unix::SignalKind::terminate())?;
    let mut quit_signal = unix::signal(unix::SignalKind::quit())?;
    let shutdown = || {
        tracing::event!(
            target: cc_collector_utils::probe::TARGET,
            tracing::Level::DEBUG,
            kind = %cc_collector_utils::probe::Kind::Lifecycle,
            shutdown = true
        );
        tracing::warn!("Shutting down...");
        // send shutdown signal to all of the application.
        ctx.shutdown();
    };
    tokio::select! {
        _ = ctrlc_signal.recv() => {
            tracing::warn!("Interrupted (Ctrl+C) ...");
            shutdown();
        },
        _ = termination_signal.recv() => {
            tracing::warn!("Got Terminate signal ...");
            shutdown();
        },
        _ = quit_signal.recv() => {
            tracing::warn!("Quitting ...");
            shutdown();
        },
    }
    // the in-flight cycle, if any, finishes before the loop exits.
    if let Err(e) = orchestrator_handle.await {
        tracing::error!("Orchestrator task failed: {}", e);
    }
    if let Some(handle) = metrics_handle {
        match handle.await {
            Ok(Err(e)) => tracing::error!("Metrics server failed: {}", e),
            Err(e) => tracing::error!("Metrics task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }
    tracing::info!("Clean Exit ..");
    Ok(())
}
