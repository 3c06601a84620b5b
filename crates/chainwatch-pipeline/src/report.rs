//! Report projection and line-oriented sinks.

use std::io::Write;
use std::sync::Mutex;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use chainwatch_core::{units, TransactionRecord, TxHash};

/// Display-only projection of a qualifying transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Value in ether, four decimal places.
    pub value_eth: String,
    /// Price per gas in gwei, two decimal places.
    pub gas_price_gwei: String,
}

impl Report {
    pub fn new(record: &TransactionRecord, sender: Address) -> Self {
        Self {
            hash: record.hash,
            from: sender,
            to: record.to,
            value_eth: units::format_ether(record.value),
            gas_price_gwei: units::format_gwei(record.price_per_gas()),
        }
    }

    /// Single-line human-readable rendering.
    pub fn to_text(&self) -> String {
        let mut line = format!("tx={} from={}", self.hash, self.from);
        if let Some(to) = &self.to {
            line.push_str(&format!(" to={to}"));
        }
        line.push_str(&format!(
            " value={} ETH gas_price={} gwei",
            self.value_eth, self.gas_price_gwei
        ));
        line
    }
}

/// Output rendering for [`WriterReporter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Sink for qualifying transactions. Called concurrently by every worker.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &Report);
}

/// Writes one report per line to any `Write`.
///
/// Each line is written under a lock in a single call, so output from
/// concurrent workers never interleaves.
pub struct WriterReporter<W> {
    out: Mutex<W>,
    format: ReportFormat,
}

impl WriterReporter<std::io::Stdout> {
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write + Send> WriterReporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out: Mutex::new(out),
            format,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    fn render(&self, report: &Report) -> String {
        match self.format {
            ReportFormat::Text => report.to_text(),
            ReportFormat::Json => match serde_json::to_string(report) {
                Ok(json) => json,
                Err(_) => report.to_text(),
            },
        }
    }
}

impl<W: Write + Send> Reporter for WriterReporter<W> {
    fn report(&self, report: &Report) {
        let mut line = self.render(report);
        line.push('\n');

        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, hash = %report.hash, "failed to write report");
        }
    }
}
