use candid::CandidType;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// EventState
/// Ephemeral, in-memory counters for extraction runs.
///

#[derive(CandidType, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventState {
    pub ops: EventOps,
}

///
/// EventOps
///

#[derive(CandidType, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Extraction runs
    pub extractions: u64,
    pub extractions_failed: u64,

    // Rows and records
    pub rows_visited: u64,
    pub rows_skipped: u64,
    pub instances_recorded: u64,
    pub values_recorded: u64,
    pub vacuous_updates_dropped: u64,

    // Relationships by storage shape
    pub link_table_relationships: u64,
    pub foreign_key_relationships: u64,

    // Endpoint class resolution by source
    pub endpoints_by_constraint: u64,
    pub endpoints_by_change_index: u64,
    pub endpoints_by_changed_row: u64,
    pub endpoints_by_live_store: u64,
    pub endpoints_skipped: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot of the current counters.
pub(crate) fn report() -> EventState {
    with_state(Clone::clone)
}

pub(crate) const fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}
