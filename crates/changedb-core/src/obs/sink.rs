//! Metrics sink boundary.
//!
//! This module is the only bridge between extraction logic and the global
//! metrics state.
use crate::{
    model::RelationshipShape,
    obs::metrics::{self, EventState, bump},
};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// EndpointSource
///
/// Where a relationship endpoint's class id was found.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointSource {
    Constraint,
    ChangeIndex,
    ChangedRow,
    LiveStore,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExtractStart,
    ExtractFinish {
        rows_visited: u64,
        instances: u64,
        values: u64,
        failed: bool,
    },
    RowSkipped,
    VacuousUpdateDropped,
    RelationshipRecorded {
        shape: RelationshipShape,
    },
    EndpointResolved {
        source: EndpointSource,
    },
    EndpointSkipped,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local counter state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| {
            let ops = &mut m.ops;
            match event {
                MetricsEvent::ExtractStart => bump(&mut ops.extractions, 1),
                MetricsEvent::ExtractFinish {
                    rows_visited,
                    instances,
                    values,
                    failed,
                } => {
                    bump(&mut ops.rows_visited, rows_visited);
                    bump(&mut ops.instances_recorded, instances);
                    bump(&mut ops.values_recorded, values);
                    if failed {
                        bump(&mut ops.extractions_failed, 1);
                    }
                }
                MetricsEvent::RowSkipped => bump(&mut ops.rows_skipped, 1),
                MetricsEvent::VacuousUpdateDropped => bump(&mut ops.vacuous_updates_dropped, 1),
                MetricsEvent::RelationshipRecorded { shape } => match shape {
                    RelationshipShape::LinkTable => bump(&mut ops.link_table_relationships, 1),
                    RelationshipShape::ForeignKeyOnSource
                    | RelationshipShape::ForeignKeyOnTarget => {
                        bump(&mut ops.foreign_key_relationships, 1);
                    }
                },
                MetricsEvent::EndpointResolved { source } => match source {
                    EndpointSource::Constraint => bump(&mut ops.endpoints_by_constraint, 1),
                    EndpointSource::ChangeIndex => bump(&mut ops.endpoints_by_change_index, 1),
                    EndpointSource::ChangedRow => bump(&mut ops.endpoints_by_changed_row, 1),
                    EndpointSource::LiveStore => bump(&mut ops.endpoints_by_live_store, 1),
                },
                MetricsEvent::EndpointSkipped => bump(&mut ops.endpoints_skipped, 1),
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY: the pointer is installed only by `with_metrics_sink`,
        // which keeps the referent alive for the whole scope and restores
        // the slot on every exit.
        unsafe { (*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> EventState {
    metrics::report()
}

/// Reset all counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` dereferences synchronously and never stores the pointer.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one extraction run.
/// Finish accounting happens on every exit; a span that was never marked
/// complete is reported as failed.

pub(crate) struct Span {
    rows_visited: u64,
    instances: u64,
    values: u64,
    completed: bool,
}

impl Span {
    #[must_use]
    pub(crate) fn new() -> Self {
        record(MetricsEvent::ExtractStart);

        Self {
            rows_visited: 0,
            instances: 0,
            values: 0,
            completed: false,
        }
    }

    pub(crate) const fn add_row(&mut self) {
        self.rows_visited = self.rows_visited.saturating_add(1);
    }

    pub(crate) const fn complete(&mut self, instances: u64, values: u64) {
        self.instances = instances;
        self.values = values;
        self.completed = true;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ExtractFinish {
            rows_visited: self.rows_visited,
            instances: self.instances,
            values: self.values,
            failed: !self.completed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        with_metrics_sink(&outer, || {
            record(MetricsEvent::RowSkipped);

            with_metrics_sink(&inner, || {
                record(MetricsEvent::RowSkipped);
            });

            record(MetricsEvent::VacuousUpdateDropped);
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::RowSkipped);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn span_reports_failure_unless_completed() {
        metrics_reset_all();

        {
            let mut span = Span::new();
            span.add_row();
        }
        {
            let mut span = Span::new();
            span.add_row();
            span.add_row();
            span.complete(3, 5);
        }

        let ops = metrics_report().ops;
        assert_eq!(ops.extractions, 2);
        assert_eq!(ops.extractions_failed, 1);
        assert_eq!(ops.rows_visited, 3);
        assert_eq!(ops.instances_recorded, 3);
        assert_eq!(ops.values_recorded, 5);
    }

    #[test]
    fn endpoint_and_relationship_events_accumulate() {
        metrics_reset_all();

        record(MetricsEvent::EndpointResolved {
            source: EndpointSource::LiveStore,
        });
        record(MetricsEvent::EndpointResolved {
            source: EndpointSource::ChangeIndex,
        });
        record(MetricsEvent::RelationshipRecorded {
            shape: RelationshipShape::ForeignKeyOnTarget,
        });

        let ops = metrics_report().ops;
        assert_eq!(ops.endpoints_by_live_store, 1);
        assert_eq!(ops.endpoints_by_change_index, 1);
        assert_eq!(ops.foreign_key_relationships, 1);
        assert_eq!(ops.link_table_relationships, 0);
    }
}
