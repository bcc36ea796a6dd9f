// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured processor metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn processor_metrics() -> &'static dyn ProcessorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured governor metrics sink.
pub fn governor_metrics() -> &'static dyn GovernorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured store metrics sink.
pub fn store_metrics() -> &'static dyn StoreMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured gossip metrics sink.
pub fn gossip_metrics() -> &'static dyn GossipMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics from the observation-aggregation processor.
pub trait ProcessorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for locally observed message publications, labeled by source.
    fn inc_messages_observed(&self, source: &str);
    /// Increments the counter for signed observations received from peers.
    fn inc_observations_received(&self);
    /// Increments the counter for observations dropped because the signer is in no valid set.
    fn inc_observations_unknown_signer(&self);
    /// Increments the counter for VAAs assembled after reaching quorum.
    fn inc_vaas_submitted(&self);
    /// Increments the counter for observations that settled without quorum.
    fn inc_quorum_misses(&self);
    /// Increments the counter for re-observation requests broadcast.
    fn inc_reobservation_requests(&self);
    /// Sets the gauge for in-flight observation states.
    fn set_inflight_observations(&self, count: u64);
    /// Observes the time from first signature to quorum for one digest.
    fn observe_quorum_latency(&self, duration_secs: f64);
}
impl ProcessorMetricsSink for NopSink {
    fn inc_messages_observed(&self, _source: &str) {}
    fn inc_observations_received(&self) {}
    fn inc_observations_unknown_signer(&self) {}
    fn inc_vaas_submitted(&self) {}
    fn inc_quorum_misses(&self) {}
    fn inc_reobservation_requests(&self) {}
    fn set_inflight_observations(&self, _count: u64) {}
    fn observe_quorum_latency(&self, _duration_secs: f64) {}
}

/// A sink for metrics from the chain governor.
pub trait GovernorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for messages enqueued as pending, labeled by reason.
    fn inc_enqueued(&self, reason: &str);
    /// Increments the counter for pending messages released.
    fn inc_released(&self);
    /// Increments the counter for pending messages dropped by an operator.
    fn inc_dropped(&self);
    /// Sets the gauge for currently pending messages.
    fn set_pending(&self, count: u64);
    /// Sets the gauge for 24-hour window usage in USD cents, labeled by chain.
    fn set_window_usage_cents(&self, chain: &str, cents: u64);
}
impl GovernorMetricsSink for NopSink {
    fn inc_enqueued(&self, _reason: &str) {}
    fn inc_released(&self) {}
    fn inc_dropped(&self) {}
    fn set_pending(&self, _count: u64) {}
    fn set_window_usage_cents(&self, _chain: &str, _cents: u64) {}
}

/// A sink for metrics from the signed-VAA store.
pub trait StoreMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for VAAs written.
    fn inc_vaas_stored(&self);
    /// Increments the counter for VAAs deleted by purges.
    fn inc_vaas_purged(&self, count: u64);
}
impl StoreMetricsSink for NopSink {
    fn inc_vaas_stored(&self) {}
    fn inc_vaas_purged(&self, _count: u64) {}
}

/// A sink for metrics about gossip envelope traffic.
pub trait GossipMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for envelopes published, labeled by kind.
    fn inc_published(&self, kind: &str);
    /// Increments a counter for publishes dropped because the outbound channel was full.
    fn inc_publish_dropped(&self, kind: &str);
}
impl GossipMetricsSink for NopSink {
    fn inc_published(&self, _kind: &str) {}
    fn inc_publish_dropped(&self, _kind: &str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    ProcessorMetricsSink + GovernorMetricsSink + StoreMetricsSink + GossipMetricsSink + ErrorMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: ProcessorMetricsSink
        + GovernorMetricsSink
        + StoreMetricsSink
        + GossipMetricsSink
        + ErrorMetricsSink
{
}
