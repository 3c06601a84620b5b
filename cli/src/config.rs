//! Application configuration: YAML file, then flags / environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use chainwatch_pipeline::{PipelineConfig, ReportFormat};

use crate::tracing_setup::LogConfig;

/// Node endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// WebSocket endpoint carrying the subscription, e.g. "wss://node.example/ws"
    #[serde(default)]
    pub ws_url: String,
    /// Optional HTTP endpoint for lookups; unset = reuse the WebSocket.
    /// A shared socket fails every lookup once the feed is lost, so
    /// identifiers still queued at that point are counted as missed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_request_timeout_ms() -> u64 { 10_000 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            ws_url: String::new(),
            http_url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RpcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Seconds between counter summaries; 0 disables them
    #[serde(default)]
    pub stats_interval_secs: u64,
}

/// Command-line / environment overrides. Unset fields keep the file value.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// YAML config file
    #[arg(short, long, env = "CHAINWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// WebSocket RPC endpoint
    #[arg(long, env = "CHAINWATCH_WS_URL")]
    pub ws_url: Option<String>,

    /// HTTP RPC endpoint for transaction lookups
    #[arg(long, env = "CHAINWATCH_HTTP_URL")]
    pub http_url: Option<String>,

    /// Report transfers strictly above this many ether
    #[arg(long, env = "CHAINWATCH_THRESHOLD_ETH")]
    pub threshold_eth: Option<String>,

    /// Number of lookup workers
    #[arg(long, env = "CHAINWATCH_WORKERS")]
    pub workers: Option<usize>,

    /// Ingress queue capacity
    #[arg(long, env = "CHAINWATCH_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Expected chain id of signed transactions
    #[arg(long, env = "CHAINWATCH_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Report format
    #[arg(long, value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Global log level
    #[arg(long, env = "CHAINWATCH_LOG")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Seconds between counter summaries (0 = off)
    #[arg(long)]
    pub stats_interval: Option<u64>,
}

impl AppConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parse config YAML")
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in '{}'", path.display()))
    }

    /// Load the file named by `overrides` (if any) and apply the overrides.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut config = match &overrides.config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, o: &Overrides) {
        if let Some(url) = &o.ws_url {
            self.rpc.ws_url = url.clone();
        }
        if let Some(url) = &o.http_url {
            self.rpc.http_url = Some(url.clone());
        }
        if let Some(t) = &o.threshold_eth {
            self.pipeline.threshold_eth = t.clone();
        }
        if let Some(w) = o.workers {
            self.pipeline.workers = w;
        }
        if let Some(c) = o.queue_capacity {
            self.pipeline.queue_capacity = c;
        }
        if let Some(id) = o.chain_id {
            self.pipeline.chain_id = id;
        }
        match o.format.as_deref() {
            Some("json") => self.report.format = ReportFormat::Json,
            Some("text") => self.report.format = ReportFormat::Text,
            _ => {}
        }
        if let Some(level) = &o.log_level {
            self.log.level = level.clone();
        }
        if o.json_logs {
            self.log.json = true;
        }
        if let Some(secs) = o.stats_interval {
            self.stats_interval_secs = secs;
        }
    }

    /// Checks that need the fully merged config.
    pub fn validate(&self) -> Result<()> {
        let ws = &self.rpc.ws_url;
        if ws.is_empty() {
            bail!("no WebSocket endpoint: set rpc.ws_url, --ws-url or CHAINWATCH_WS_URL");
        }
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            bail!("rpc.ws_url must be a ws:// or wss:// URL, got '{ws}'");
        }
        if let Some(http) = &self.rpc.http_url {
            if !(http.starts_with("http://") || http.starts_with("https://")) {
                bail!("rpc.http_url must be an http:// or https:// URL, got '{http}'");
            }
        }
        self.pipeline
            .validate()
            .context("pipeline section")?;
        Ok(())
    }
}
