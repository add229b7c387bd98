//! Observability: extraction counters and the sink they flow through.
//!
//! Extraction logic never touches counter state directly; it emits
//! `MetricsEvent`s through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventState};
pub use sink::{
    EndpointSource, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
