//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stderr log sink installed by the CLI
//!     → any metrics recorder installed by the embedding application
//! ```
//!
//! # Design Decisions
//! - Structured logging with key/value fields
//! - Private keys never reach a log event; only public keys are logged
//! - Metrics are cheap no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
