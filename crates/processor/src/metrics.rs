// Path: crates/processor/src/metrics.rs
use aegis_telemetry::sinks::{GossipMetricsSink, NopSink, ProcessorMetricsSink};
use once_cell::sync::OnceCell;

static NOP_SINK: NopSink = NopSink;
pub static SINK: OnceCell<&'static dyn ProcessorMetricsSink> = OnceCell::new();
pub static GOSSIP_SINK: OnceCell<&'static dyn GossipMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn ProcessorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

pub fn gossip_metrics() -> &'static dyn GossipMetricsSink {
    GOSSIP_SINK.get().copied().unwrap_or(&NOP_SINK)
}
