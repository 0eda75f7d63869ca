//! Observability module providing logging and metrics.
//!
//! - Structured logging with configurable formats (pretty, compact, JSON)
//! - Prometheus counters for reconciliation outcomes (feature `prometheus`)

pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
