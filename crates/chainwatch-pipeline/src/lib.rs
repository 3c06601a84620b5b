//! chainwatch-pipeline — ingestion-to-enrichment pipeline.
//!
//! ```text
//! EventSource ─▶ Dispatcher ─try_push─▶ IngressQueue ─pop─▶ Worker × W
//!                                                            │
//!                          EnrichmentClient ◀─fetch_detail───┤
//!                                                            ▼
//!                                           value > threshold? ─▶ Reporter
//! ```
//!
//! The dispatcher never blocks on the queue: when it is full the newest
//! identifier is dropped. A fatal feed error (or an operator shutdown) closes
//! the queue; workers drain whatever is already queued and then exit.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod worker;

pub use config::{PipelineConfig, MAX_QUEUE_CAPACITY};
pub use error::PipelineError;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::Pipeline;
pub use queue::{IngressReceiver, IngressSender, PushError};
pub use report::{Report, ReportFormat, Reporter, WriterReporter};
pub use worker::{Outcome, Worker};
