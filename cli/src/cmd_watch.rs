//! `chainwatch watch` — connect, subscribe, and report until the feed dies
//! or the operator presses Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use chainwatch_core::RpcTransport;
use chainwatch_evm::{EvmSenderRecovery, RpcEnrichmentClient};
use chainwatch_http::{HttpClientConfig, HttpRpcClient};
use chainwatch_pipeline::{Pipeline, PipelineMetrics, WriterReporter};
use chainwatch_ws::{WsClientConfig, WsRpcClient};

use crate::config::AppConfig;

pub async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    let ws = Arc::new(
        WsRpcClient::connect(
            config.rpc.ws_url.clone(),
            WsClientConfig {
                connect_timeout: config.rpc.connect_timeout(),
                request_timeout: config.rpc.request_timeout(),
            },
        )
        .await
        .with_context(|| format!("connect to '{}'", config.rpc.ws_url))?,
    );

    let lookups: Arc<dyn RpcTransport> = match &config.rpc.http_url {
        Some(url) => {
            info!(url = %url, "transaction lookups over HTTP");
            Arc::new(
                HttpRpcClient::new(
                    url.clone(),
                    HttpClientConfig {
                        request_timeout: config.rpc.request_timeout(),
                        pool_max_idle_per_host: config.pipeline.workers,
                    },
                )
                .context("build HTTP client")?,
            )
        }
        None => ws.clone(),
    };

    let pipeline = Pipeline::new(
        config.pipeline.clone(),
        ws.clone(),
        Arc::new(RpcEnrichmentClient::new(lookups)),
        Arc::new(EvmSenderRecovery::new(config.pipeline.chain_id)),
        Arc::new(WriterReporter::stdout(config.report.format)),
    )?;

    let stats = (config.stats_interval_secs > 0).then(|| {
        tokio::spawn(log_stats(
            pipeline.metrics(),
            Duration::from_secs(config.stats_interval_secs),
        ))
    });

    let result = pipeline.run(shutdown_signal()).await;

    if let Some(task) = stats {
        task.abort();
    }
    ws.close();

    match result {
        Ok(summary) => {
            info!(reported = summary.reported, "stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "fatal");
            Err(e.into())
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn log_stats(metrics: Arc<PipelineMetrics>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let s = metrics.snapshot();
        info!(
            received = s.received,
            admitted = s.admitted,
            dropped = s.dropped,
            missed = s.missed,
            filtered = s.filtered,
            reported = s.reported,
            derive_failures = s.derive_failures,
            "stats"
        );
    }
}
