// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_gauge_vec, register_histogram,
    register_int_counter, register_int_counter_vec, Gauge, GaugeVec, Histogram, IntCounter,
    IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static PROC_MESSAGES_OBSERVED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static PROC_OBSERVATIONS_RECEIVED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROC_OBSERVATIONS_UNKNOWN_SIGNER_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROC_VAAS_SUBMITTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROC_QUORUM_MISSES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROC_REOBSERVATION_REQUESTS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROC_INFLIGHT_OBSERVATIONS: OnceCell<Gauge> = OnceCell::new();
static PROC_QUORUM_LATENCY_SECONDS: OnceCell<Histogram> = OnceCell::new();

static GOV_ENQUEUED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static GOV_RELEASED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GOV_DROPPED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GOV_PENDING: OnceCell<Gauge> = OnceCell::new();
static GOV_WINDOW_USAGE_CENTS: OnceCell<GaugeVec> = OnceCell::new();

static STORE_VAAS_STORED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORE_VAAS_PURGED_TOTAL: OnceCell<IntCounter> = OnceCell::new();

static GOSSIP_PUBLISHED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static GOSSIP_PUBLISH_DROPPED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl ProcessorMetricsSink for PrometheusSink {
    fn inc_messages_observed(&self, source: &str) {
        get_metric!(PROC_MESSAGES_OBSERVED_TOTAL)
            .with_label_values(&[source])
            .inc();
    }
    fn inc_observations_received(&self) {
        get_metric!(PROC_OBSERVATIONS_RECEIVED_TOTAL).inc();
    }
    fn inc_observations_unknown_signer(&self) {
        get_metric!(PROC_OBSERVATIONS_UNKNOWN_SIGNER_TOTAL).inc();
    }
    fn inc_vaas_submitted(&self) {
        get_metric!(PROC_VAAS_SUBMITTED_TOTAL).inc();
    }
    fn inc_quorum_misses(&self) {
        get_metric!(PROC_QUORUM_MISSES_TOTAL).inc();
    }
    fn inc_reobservation_requests(&self) {
        get_metric!(PROC_REOBSERVATION_REQUESTS_TOTAL).inc();
    }
    fn set_inflight_observations(&self, count: u64) {
        get_metric!(PROC_INFLIGHT_OBSERVATIONS).set(count as f64);
    }
    fn observe_quorum_latency(&self, duration_secs: f64) {
        get_metric!(PROC_QUORUM_LATENCY_SECONDS).observe(duration_secs);
    }
}

impl GovernorMetricsSink for PrometheusSink {
    fn inc_enqueued(&self, reason: &str) {
        get_metric!(GOV_ENQUEUED_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
    fn inc_released(&self) {
        get_metric!(GOV_RELEASED_TOTAL).inc();
    }
    fn inc_dropped(&self) {
        get_metric!(GOV_DROPPED_TOTAL).inc();
    }
    fn set_pending(&self, count: u64) {
        get_metric!(GOV_PENDING).set(count as f64);
    }
    fn set_window_usage_cents(&self, chain: &str, cents: u64) {
        get_metric!(GOV_WINDOW_USAGE_CENTS)
            .with_label_values(&[chain])
            .set(cents as f64);
    }
}

impl StoreMetricsSink for PrometheusSink {
    fn inc_vaas_stored(&self) {
        get_metric!(STORE_VAAS_STORED_TOTAL).inc();
    }
    fn inc_vaas_purged(&self, count: u64) {
        get_metric!(STORE_VAAS_PURGED_TOTAL).inc_by(count);
    }
}

impl GossipMetricsSink for PrometheusSink {
    fn inc_published(&self, kind: &str) {
        get_metric!(GOSSIP_PUBLISHED_TOTAL)
            .with_label_values(&[kind])
            .inc();
    }
    fn inc_publish_dropped(&self, kind: &str) {
        get_metric!(GOSSIP_PUBLISH_DROPPED_TOTAL)
            .with_label_values(&[kind])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

static SINK_INSTANCE: PrometheusSink = PrometheusSink;

/// Registers every collector with the default Prometheus registry and makes
/// `PrometheusSink` the global sink. Safe to call once per process.
///
/// Returns the sink so the caller can seed the per-crate `metrics::SINK`
/// cells; without that step those crates keep reporting into the no-op sink.
pub fn install() -> Result<&'static PrometheusSink, anyhow::Error> {
    let _ = PROC_MESSAGES_OBSERVED_TOTAL.set(register_int_counter_vec!(
        "aegis_processor_messages_observed_total",
        "Message publications entering the processor, by source.",
        &["source"]
    )?);
    let _ = PROC_OBSERVATIONS_RECEIVED_TOTAL.set(register_int_counter!(
        "aegis_processor_observations_received_total",
        "Signed observations received from peers."
    )?);
    let _ = PROC_OBSERVATIONS_UNKNOWN_SIGNER_TOTAL.set(register_int_counter!(
        "aegis_processor_observations_unknown_signer_total",
        "Signed observations dropped because the signer is in no valid guardian set."
    )?);
    let _ = PROC_VAAS_SUBMITTED_TOTAL.set(register_int_counter!(
        "aegis_processor_vaas_submitted_total",
        "VAAs assembled and broadcast after reaching quorum."
    )?);
    let _ = PROC_QUORUM_MISSES_TOTAL.set(register_int_counter!(
        "aegis_processor_quorum_misses_total",
        "Observation states settled without ever reaching quorum."
    )?);
    let _ = PROC_REOBSERVATION_REQUESTS_TOTAL.set(register_int_counter!(
        "aegis_processor_reobservation_requests_total",
        "Re-observation requests broadcast for digests we have not seen locally."
    )?);
    let _ = PROC_INFLIGHT_OBSERVATIONS.set(register_gauge!(
        "aegis_processor_inflight_observations",
        "Observation states currently tracked by the processor."
    )?);
    let _ = PROC_QUORUM_LATENCY_SECONDS.set(register_histogram!(
        "aegis_processor_quorum_latency_seconds",
        "Time from first signature to quorum for one digest.",
        exponential_buckets(0.05, 2.0, 12)?
    )?);

    let _ = GOV_ENQUEUED_TOTAL.set(register_int_counter_vec!(
        "aegis_governor_enqueued_total",
        "Messages held back by the governor, by reason.",
        &["reason"]
    )?);
    let _ = GOV_RELEASED_TOTAL.set(register_int_counter!(
        "aegis_governor_released_total",
        "Pending messages released by timer expiry or freed capacity."
    )?);
    let _ = GOV_DROPPED_TOTAL.set(register_int_counter!(
        "aegis_governor_dropped_total",
        "Pending messages dropped by operator action."
    )?);
    let _ = GOV_PENDING.set(register_gauge!(
        "aegis_governor_pending",
        "Messages currently held by the governor."
    )?);
    let _ = GOV_WINDOW_USAGE_CENTS.set(register_gauge_vec!(
        "aegis_governor_window_usage_cents",
        "Rolling 24-hour released notional in USD cents, by chain.",
        &["chain"]
    )?);

    let _ = STORE_VAAS_STORED_TOTAL.set(register_int_counter!(
        "aegis_store_vaas_stored_total",
        "Signed VAAs written to the store."
    )?);
    let _ = STORE_VAAS_PURGED_TOTAL.set(register_int_counter!(
        "aegis_store_vaas_purged_total",
        "Signed VAAs deleted by purge operations."
    )?);

    let _ = GOSSIP_PUBLISHED_TOTAL.set(register_int_counter_vec!(
        "aegis_gossip_published_total",
        "Envelopes handed to the gossip transport, by kind.",
        &["kind"]
    )?);
    let _ = GOSSIP_PUBLISH_DROPPED_TOTAL.set(register_int_counter_vec!(
        "aegis_gossip_publish_dropped_total",
        "Envelopes dropped because the outbound channel was full, by kind.",
        &["kind"]
    )?);

    let _ = ERRORS_TOTAL.set(register_int_counter_vec!(
        "aegis_errors_total",
        "Errors by kind and stable variant code.",
        &["kind", "variant"]
    )?);

    SINK
        .set(&SINK_INSTANCE)
        .map_err(|_| anyhow::anyhow!("metrics sink already installed"))?;
    Ok(&SINK_INSTANCE)
}
