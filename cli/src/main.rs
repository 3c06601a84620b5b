//! ChainWatch CLI — watch a node's mempool for large transfers.
//!
//! # Commands
//! ```text
//! chainwatch watch  [--config <file.yaml>] [--ws-url <url>] [--threshold-eth <n>] ...
//! chainwatch config [--config <file.yaml>] [...]      print the merged config
//! ```
//!
//! Reports go to stdout, logs to stderr. The process exits non-zero when the
//! feed fails, after in-flight work has drained.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd_watch;
mod config;
mod tracing_setup;

use config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "chainwatch",
    about = "Report large pending transfers from an EVM node's mempool",
    long_about = "
ChainWatch subscribes to a node's pending-transaction feed, looks up each
transaction and prints the ones whose value exceeds a threshold.

ENVIRONMENT VARIABLES:
  CHAINWATCH_CONFIG          YAML config file
  CHAINWATCH_WS_URL          WebSocket RPC endpoint (required)
  CHAINWATCH_HTTP_URL        HTTP RPC endpoint for lookups (optional; without
                             it lookups share the WebSocket, and identifiers
                             queued when the feed is lost end up missed)
  CHAINWATCH_THRESHOLD_ETH   Report transfers above this many ether
  CHAINWATCH_WORKERS         Number of lookup workers
  CHAINWATCH_QUEUE_CAPACITY  Ingress queue capacity
  CHAINWATCH_CHAIN_ID        Expected chain id
  CHAINWATCH_LOG             Log level (RUST_LOG takes precedence)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the mempool and report large transfers
    Watch {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the effective configuration as YAML
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { overrides } => {
            let config = AppConfig::load(&overrides)?;
            tracing_setup::init_tracing(&config.log);
            cmd_watch::run(config).await
        }

        Commands::Config { overrides } => {
            let config = AppConfig::load(&overrides)?;
            let yaml = serde_yaml::to_string(&config).context("render config")?;
            print!("{yaml}");
            Ok(())
        }
    }
}
