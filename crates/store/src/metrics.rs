// Path: crates/store/src/metrics.rs
use aegis_telemetry::sinks::{NopSink, StoreMetricsSink};
use once_cell::sync::OnceCell;

static NOP_SINK: NopSink = NopSink;
pub static SINK: OnceCell<&'static dyn StoreMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn StoreMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}
