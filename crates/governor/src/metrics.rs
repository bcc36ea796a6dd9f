// Path: crates/governor/src/metrics.rs
use aegis_telemetry::sinks::{GovernorMetricsSink, NopSink};
use once_cell::sync::OnceCell;

static NOP_SINK: NopSink = NopSink;
pub static SINK: OnceCell<&'static dyn GovernorMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn GovernorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}
