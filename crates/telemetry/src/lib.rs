// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Aegis Telemetry
//!
//! Observability infrastructure for the guardian node: structured logging
//! initialization, a Prometheus metrics endpoint, and abstract sinks that
//! decouple metric instrumentation from the backend.

/// A lightweight HTTP server for exposing `/metrics`, `/healthz`, and `/readyz` endpoints.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;

// Re-export the public helper functions for easy access to the global sinks.
pub use sinks::{error_metrics, gossip_metrics, governor_metrics, processor_metrics, store_metrics};
