use crate::{
    changeset::{MemoryChangeset, MemoryLiveStore, RowChange},
    error::{ExtractError, InternalError},
    extract::{
        ExtractOptions, ExtractStats, Extractor, SOURCE_CLASS_ID, SOURCE_INSTANCE_ID,
        TARGET_CLASS_ID, TARGET_INSTANCE_ID, derive_relationship_op,
    },
    index::{InstanceIndex, TransientIndex, ValueIndex},
    model::RelationshipShape,
    obs::{EndpointSource, MetricsEvent, MetricsSink, with_metrics_sink},
    test_fixtures::*,
    types::{InstanceKey, RowOp},
    value::ChangeValue,
};
use proptest::prelude::*;
use std::cell::RefCell;

///
/// CaptureSink
///

#[derive(Default)]
struct CaptureSink(RefCell<Vec<MetricsEvent>>);

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.0.borrow_mut().push(event);
    }
}

impl CaptureSink {
    fn count(&self, event: MetricsEvent) -> usize {
        self.0.borrow().iter().filter(|e| **e == event).count()
    }
}

fn extract_with(
    changeset: &MemoryChangeset,
    live: &MemoryLiveStore,
    options: ExtractOptions,
) -> Result<(TransientIndex, ExtractStats), InternalError> {
    let catalog = fixture_catalog();
    let mut index = TransientIndex::new();
    let stats = Extractor::new(&catalog, live, &mut index, options).run(changeset)?;

    Ok((index, stats))
}

fn extract(
    changeset: &MemoryChangeset,
    live: &MemoryLiveStore,
) -> Result<(TransientIndex, ExtractStats), InternalError> {
    extract_with(changeset, live, ExtractOptions::default())
}

fn extract_err(changeset: &MemoryChangeset, live: &MemoryLiveStore) -> ExtractError {
    let err = extract(changeset, live).unwrap_err();

    err.extract_detail().cloned().expect("extract error detail")
}

fn op_of(index: &TransientIndex, k: InstanceKey) -> Option<RowOp> {
    index.query(k).unwrap().map(|record| record.op)
}

fn pair(
    index: &TransientIndex,
    k: InstanceKey,
    path: &str,
) -> (Option<ChangeValue>, Option<ChangeValue>) {
    let record = index
        .query_value(k, path)
        .unwrap()
        .unwrap_or_else(|| panic!("missing value record {k} {path}"));

    (record.old, record.new)
}

fn some(value: impl Into<ChangeValue>) -> Option<ChangeValue> {
    Some(value.into())
}

//
// entity pass
//

#[test]
fn inserted_element_records_new_values_only() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::insert(ELEMENTS, ELEMENT, iid(1))
            .new_value("code", "E-1")
            .new_value("name", "Wall"),
    );

    let (index, stats) = extract(&changeset, &MemoryLiveStore::new()).unwrap();
    let k = key(ELEMENT, 1);

    assert_eq!(op_of(&index, k), Some(RowOp::Insert));
    assert_eq!(pair(&index, k, "Code"), (None, some("E-1")));
    assert_eq!(pair(&index, k, "Name"), (None, some("Wall")));
    assert_eq!(stats.rows_visited, 1);
}

#[test]
fn deleted_element_records_old_values_only() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::delete(ELEMENTS, PHYSICAL, iid(2))
            .old("code", "P-2")
            .old("height", 3.5),
    );

    let (index, _) = extract(&changeset, &MemoryLiveStore::new()).unwrap();
    let k = key(PHYSICAL, 2);

    assert_eq!(op_of(&index, k), Some(RowOp::Delete));
    assert_eq!(pair(&index, k, "Code"), (some("P-2"), None));
    assert_eq!(pair(&index, k, "Height"), (some(3.5), None));
    assert_eq!(index.query_value(k, "Name").unwrap(), None);
}

#[test]
fn updated_element_keeps_changed_columns() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENTS, ELEMENT, iid(3))
            .set("code", "A", "B")
            .set("name", "same", "same"),
    );
    let live = MemoryLiveStore::new().with_row(ELEMENTS, iid(3));

    let (index, _) = extract(&changeset, &live).unwrap();
    let k = key(ELEMENT, 3);

    assert_eq!(op_of(&index, k), Some(RowOp::Update));
    assert_eq!(pair(&index, k, "Code"), (some("A"), some("B")));
    assert_eq!(index.query_value(k, "Name").unwrap(), None);
}

#[test]
fn vacuous_update_leaves_no_trace() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENTS, ELEMENT, iid(4))
            .set("code", "A", "A")
            .set("name", ChangeValue::Null, ChangeValue::Null),
    );
    let live = MemoryLiveStore::new().with_row(ELEMENTS, iid(4));
    let sink = CaptureSink::default();

    let (index, stats) = with_metrics_sink(&sink, || extract(&changeset, &live)).unwrap();

    assert_eq!(index.instance_count(), 0);
    assert_eq!(index.value_count(), 0);
    assert_eq!(stats.vacuous_updates_dropped, 1);
    assert_eq!(sink.count(MetricsEvent::VacuousUpdateDropped), 1);
}

#[test]
fn update_after_insert_stays_insert() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(5)).new_value("code", "A"))
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(5)).set("code", "A", "A"));
    let live = MemoryLiveStore::new().with_row(ELEMENTS, iid(5));

    let (index, stats) = extract(&changeset, &live).unwrap();
    let k = key(ELEMENT, 5);

    // the vacuous update is not a first touch, so nothing is rolled back
    assert_eq!(op_of(&index, k), Some(RowOp::Insert));
    assert_eq!(pair(&index, k, "Code"), (None, some("A")));
    assert_eq!(stats.vacuous_updates_dropped, 0);
}

#[test]
fn delete_after_update_is_delete() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(6)).set("code", "A", "B"))
        .with_row(RowChange::delete(ELEMENTS, ELEMENT, iid(6)).old("code", "B"));
    let live = MemoryLiveStore::new().with_row(ELEMENTS, iid(6));

    let (index, _) = extract(&changeset, &live).unwrap();

    assert_eq!(op_of(&index, key(ELEMENT, 6)), Some(RowOp::Delete));
}

#[test]
fn indirect_flag_reaches_the_record() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::delete(MODELS, MODEL, iid(7)).old("name", "M").indirect());

    let (index, _) = extract(&changeset, &MemoryLiveStore::new()).unwrap();
    let record = index.query(key(MODEL, 7)).unwrap().unwrap();

    assert!(record.indirect);
    assert_eq!(record.table, MODELS);
}

#[test]
fn unmapped_rows_are_skipped_once() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::unmapped("sqlite_stat1", RowOp::Update))
        .with_row(RowChange::insert(MODELS, MODEL, iid(1)).new_value("name", "M"));
    let sink = CaptureSink::default();

    let (index, stats) =
        with_metrics_sink(&sink, || extract(&changeset, &MemoryLiveStore::new())).unwrap();

    assert_eq!(index.instance_count(), 1);
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(sink.count(MetricsEvent::RowSkipped), 1);
}

#[test]
fn schema_table_changes_are_rejected() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(1)))
        .with_row(RowChange::unmapped(SCHEMA_TABLE, RowOp::Update));

    assert_eq!(
        extract_err(&changeset, &MemoryLiveStore::new()),
        ExtractError::SchemaTableChanged {
            table: SCHEMA_TABLE.to_string()
        }
    );
}

#[test]
fn unattributed_row_fails() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(1)).unattributed());

    assert_eq!(
        extract_err(&changeset, &MemoryLiveStore::new()),
        ExtractError::UnresolvablePrimaryInstance {
            table: ELEMENTS.to_string()
        }
    );
}

#[test]
fn update_of_vanished_row_fails_unless_relaxed() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(8)).set("code", "A", "B"));
    let live = MemoryLiveStore::new();

    assert_eq!(
        extract_err(&changeset, &live),
        ExtractError::MissingLiveRow {
            table: ELEMENTS.to_string(),
            instance_id: iid(8),
        }
    );

    let relaxed = ExtractOptions {
        require_live_rows: false,
        ..ExtractOptions::default()
    };
    let (index, _) = extract_with(&changeset, &live, relaxed).unwrap();
    assert_eq!(op_of(&index, key(ELEMENT, 8)), Some(RowOp::Update));
}

#[test]
fn failed_run_is_reported_to_metrics() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(1)).unattributed());
    let sink = CaptureSink::default();

    let result = with_metrics_sink(&sink, || extract(&changeset, &MemoryLiveStore::new()));

    assert!(result.is_err());
    let events = sink.0.borrow();
    assert_eq!(events.first(), Some(&MetricsEvent::ExtractStart));
    assert!(matches!(
        events.last(),
        Some(MetricsEvent::ExtractFinish { failed: true, .. })
    ));
}

//
// link tables
//

fn refers_insert(row: u64, source: u64, target: u64) -> RowChange {
    RowChange::insert(ELEMENT_REFS, ELEMENT_REFERS, iid(row))
        .new_value("SourceId", iid(source))
        .new_value("TargetId", iid(target))
        .new_value("TargetClassId", PHYSICAL)
        .new_value("priority", 5_i64)
}

#[test]
fn inserted_link_resolves_endpoints_from_index_and_row() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(1)).new_value("code", "A"))
        .with_row(refers_insert(100, 1, 2));
    let sink = CaptureSink::default();

    let (index, stats) =
        with_metrics_sink(&sink, || extract(&changeset, &MemoryLiveStore::new())).unwrap();
    let k = key(ELEMENT_REFERS, 100);

    assert_eq!(op_of(&index, k), Some(RowOp::Insert));
    assert_eq!(
        pair(&index, k, SOURCE_CLASS_ID),
        (None, some(ChangeValue::ClassId(ELEMENT)))
    );
    assert_eq!(
        pair(&index, k, SOURCE_INSTANCE_ID),
        (None, some(ChangeValue::InstanceId(iid(1))))
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (None, some(ChangeValue::ClassId(PHYSICAL)))
    );
    assert_eq!(
        pair(&index, k, TARGET_INSTANCE_ID),
        (None, some(ChangeValue::InstanceId(iid(2))))
    );
    assert_eq!(pair(&index, k, "Priority"), (None, some(5_i64)));

    assert_eq!(stats.relationships_recorded, 1);
    assert_eq!(
        sink.count(MetricsEvent::EndpointResolved {
            source: EndpointSource::ChangeIndex
        }),
        1
    );
    assert_eq!(
        sink.count(MetricsEvent::EndpointResolved {
            source: EndpointSource::ChangedRow
        }),
        1
    );
    assert_eq!(
        sink.count(MetricsEvent::RelationshipRecorded {
            shape: RelationshipShape::LinkTable
        }),
        1
    );
}

#[test]
fn relationship_rows_never_become_entities() {
    let changeset = MemoryChangeset::new().with_row(refers_insert(100, 1, 2));
    let live = MemoryLiveStore::new().with_value(ELEMENTS, iid(1), "ClassId", ELEMENT);

    let (index, _) = extract(&changeset, &live).unwrap();
    let keys: Vec<_> = index
        .records()
        .map(|record| record.unwrap().key)
        .collect();

    assert_eq!(keys, vec![key(ELEMENT_REFERS, 100)]);
}

#[test]
fn deleted_link_reads_unchanged_endpoint_class_from_live() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::delete(ELEMENT_REFS, ELEMENT_REFERS, iid(101))
            .old("SourceId", iid(1))
            .old("TargetId", iid(2))
            .old("TargetClassId", ELEMENT),
    );
    let live = MemoryLiveStore::new().with_value(ELEMENTS, iid(1), "ClassId", PHYSICAL);
    let sink = CaptureSink::default();

    let (index, _) = with_metrics_sink(&sink, || extract(&changeset, &live)).unwrap();
    let k = key(ELEMENT_REFERS, 101);

    assert_eq!(op_of(&index, k), Some(RowOp::Delete));
    assert_eq!(
        pair(&index, k, SOURCE_CLASS_ID),
        (some(ChangeValue::ClassId(PHYSICAL)), None)
    );
    assert_eq!(
        pair(&index, k, TARGET_INSTANCE_ID),
        (some(ChangeValue::InstanceId(iid(2))), None)
    );
    assert_eq!(
        sink.count(MetricsEvent::EndpointResolved {
            source: EndpointSource::LiveStore
        }),
        1
    );
}

#[test]
fn updated_link_reports_untouched_endpoints_as_unchanged() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENT_REFS, ELEMENT_REFERS, iid(102)).set("priority", 1_i64, 2_i64),
    );
    let live = MemoryLiveStore::new()
        .with_value(ELEMENT_REFS, iid(102), "SourceId", iid(1))
        .with_value(ELEMENT_REFS, iid(102), "TargetId", iid(2))
        .with_value(ELEMENT_REFS, iid(102), "TargetClassId", PHYSICAL)
        .with_value(ELEMENTS, iid(1), "ClassId", ELEMENT);

    let (index, _) = extract(&changeset, &live).unwrap();
    let k = key(ELEMENT_REFERS, 102);

    assert_eq!(op_of(&index, k), Some(RowOp::Update));
    assert_eq!(
        pair(&index, k, SOURCE_INSTANCE_ID),
        (
            some(ChangeValue::InstanceId(iid(1))),
            some(ChangeValue::InstanceId(iid(1)))
        )
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (
            some(ChangeValue::ClassId(PHYSICAL)),
            some(ChangeValue::ClassId(PHYSICAL))
        )
    );
    assert_eq!(pair(&index, k, "Priority"), (some(1_i64), some(2_i64)));
}

#[test]
fn retargeted_link_is_an_update_without_property_changes() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENT_REFS, ELEMENT_REFERS, iid(103))
            .set("TargetId", iid(2), iid(3))
            .set("TargetClassId", ELEMENT, PHYSICAL),
    );
    let live = MemoryLiveStore::new()
        .with_value(ELEMENT_REFS, iid(103), "SourceId", iid(1))
        .with_value(ELEMENTS, iid(1), "ClassId", ELEMENT);

    let (index, _) = extract(&changeset, &live).unwrap();
    let k = key(ELEMENT_REFERS, 103);

    assert_eq!(op_of(&index, k), Some(RowOp::Update));
    assert_eq!(
        pair(&index, k, TARGET_INSTANCE_ID),
        (
            some(ChangeValue::InstanceId(iid(2))),
            some(ChangeValue::InstanceId(iid(3)))
        )
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (
            some(ChangeValue::ClassId(ELEMENT)),
            some(ChangeValue::ClassId(PHYSICAL))
        )
    );
}

#[test]
fn virtual_endpoints_come_from_the_constraint() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::insert(MODEL_ASPECTS, MODEL_HAS_ASPECTS, iid(200))
            .new_value("ModelId", iid(7))
            .new_value("AspectId", iid(8)),
    );
    let sink = CaptureSink::default();

    let (index, _) =
        with_metrics_sink(&sink, || extract(&changeset, &MemoryLiveStore::new())).unwrap();
    let k = key(MODEL_HAS_ASPECTS, 200);

    assert_eq!(
        pair(&index, k, SOURCE_CLASS_ID),
        (None, some(ChangeValue::ClassId(MODEL)))
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (None, some(ChangeValue::ClassId(ASPECT)))
    );
    assert_eq!(
        sink.count(MetricsEvent::EndpointResolved {
            source: EndpointSource::Constraint
        }),
        2
    );
}

#[test]
fn ambiguous_virtual_endpoint_fails() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::insert(AMBIGUOUS_LINKS, AMBIGUOUS_LINK, iid(300))
            .new_value("SourceId", iid(1))
            .new_value("TargetId", iid(2)),
    );

    assert_eq!(
        extract_err(&changeset, &MemoryLiveStore::new()),
        ExtractError::AmbiguousEndpointClass {
            relationship: AMBIGUOUS_LINK,
            end: crate::types::RelationshipEnd::Source,
            candidates: 2,
        }
    );
}

#[test]
fn unresolvable_link_endpoint_fails_even_when_lenient() {
    let changeset = MemoryChangeset::new().with_row(refers_insert(104, 1, 2));
    let lenient = ExtractOptions {
        strict_endpoints: false,
        ..ExtractOptions::default()
    };

    let err = extract_with(&changeset, &MemoryLiveStore::new(), lenient).unwrap_err();

    assert!(matches!(
        err.extract_detail(),
        Some(ExtractError::UnresolvableEndpointClass { relationship, .. })
            if *relationship == ELEMENT_REFERS
    ));
}

#[test]
fn relationships_can_be_left_out() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(1)).new_value("code", "A"))
        .with_row(refers_insert(100, 1, 2));
    let options = ExtractOptions {
        include_relationships: false,
        ..ExtractOptions::default()
    };

    let (index, stats) = extract_with(&changeset, &MemoryLiveStore::new(), options).unwrap();

    assert_eq!(index.instance_count(), 1);
    assert_eq!(stats.relationships_recorded, 0);
}

//
// foreign keys
//

#[test]
fn inserted_element_with_model_key_inserts_relationship() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::insert(ELEMENTS, ELEMENT, iid(10))
            .new_value("code", "A")
            .new_value("ModelId", iid(7))
            .new_value("member_priority", 4_i64),
    );
    let live = MemoryLiveStore::new().with_value(MODELS, iid(7), "ClassId", MODEL);

    let (index, stats) = extract(&changeset, &live).unwrap();
    let k = key(MODEL_CONTAINS_ELEMENTS, 10);

    assert_eq!(op_of(&index, key(ELEMENT, 10)), Some(RowOp::Insert));
    assert_eq!(op_of(&index, k), Some(RowOp::Insert));
    assert_eq!(
        pair(&index, k, SOURCE_CLASS_ID),
        (None, some(ChangeValue::ClassId(MODEL)))
    );
    assert_eq!(
        pair(&index, k, SOURCE_INSTANCE_ID),
        (None, some(ChangeValue::InstanceId(iid(7))))
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (None, some(ChangeValue::ClassId(ELEMENT)))
    );
    assert_eq!(
        pair(&index, k, TARGET_INSTANCE_ID),
        (None, some(ChangeValue::InstanceId(iid(10))))
    );
    assert_eq!(pair(&index, k, "MemberPriority"), (None, some(4_i64)));
    assert_eq!(stats.relationships_recorded, 1);
}

#[test]
fn model_changed_in_same_changeset_resolves_from_index() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::insert(MODELS, MODEL, iid(7)).new_value("name", "M"))
        .with_row(RowChange::insert(ELEMENTS, ELEMENT, iid(10)).new_value("ModelId", iid(7)));
    let sink = CaptureSink::default();

    let (index, _) =
        with_metrics_sink(&sink, || extract(&changeset, &MemoryLiveStore::new())).unwrap();

    assert_eq!(
        op_of(&index, key(MODEL_CONTAINS_ELEMENTS, 10)),
        Some(RowOp::Insert)
    );
    assert_eq!(
        sink.count(MetricsEvent::EndpointResolved {
            source: EndpointSource::ChangeIndex
        }),
        1
    );
}

#[test]
fn cleared_model_key_deletes_relationship_with_backfilled_values() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENTS, ELEMENT, iid(11)).set("ModelId", iid(7), ChangeValue::Null),
    );
    let live = MemoryLiveStore::new()
        .with_value(ELEMENTS, iid(11), "member_priority", 3_i64)
        .with_value(MODELS, iid(7), "ClassId", MODEL);

    let (index, _) = extract(&changeset, &live).unwrap();
    let k = key(MODEL_CONTAINS_ELEMENTS, 11);

    assert_eq!(op_of(&index, k), Some(RowOp::Delete));
    assert_eq!(
        pair(&index, k, SOURCE_INSTANCE_ID),
        (some(ChangeValue::InstanceId(iid(7))), None)
    );
    assert_eq!(
        pair(&index, k, TARGET_INSTANCE_ID),
        (some(ChangeValue::InstanceId(iid(11))), None)
    );
    assert_eq!(pair(&index, k, "MemberPriority"), (some(3_i64), None));

    // the element reports the cleared key through its navigation property
    let element = key(ELEMENT, 11);
    assert_eq!(op_of(&index, element), Some(RowOp::Update));
    assert_eq!(
        pair(&index, element, "Model.Id"),
        (some(ChangeValue::InstanceId(iid(7))), None)
    );
}

#[test]
fn moved_model_key_updates_relationship() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::update(ELEMENTS, PHYSICAL, iid(12)).set("ModelId", iid(7), iid(8)),
    );
    let live = MemoryLiveStore::new()
        .with_row(ELEMENTS, iid(12))
        .with_value(MODELS, iid(7), "ClassId", MODEL)
        .with_value(MODELS, iid(8), "ClassId", MODEL);

    let (index, _) = extract(&changeset, &live).unwrap();
    let k = key(MODEL_CONTAINS_ELEMENTS, 12);

    assert_eq!(op_of(&index, k), Some(RowOp::Update));
    assert_eq!(
        pair(&index, k, SOURCE_INSTANCE_ID),
        (
            some(ChangeValue::InstanceId(iid(7))),
            some(ChangeValue::InstanceId(iid(8)))
        )
    );
    assert_eq!(
        pair(&index, k, TARGET_CLASS_ID),
        (
            some(ChangeValue::ClassId(PHYSICAL)),
            some(ChangeValue::ClassId(PHYSICAL))
        )
    );

    let element = key(PHYSICAL, 12);
    assert_eq!(op_of(&index, element), Some(RowOp::Update));
    assert_eq!(
        pair(&index, element, "Model.Id"),
        (
            some(ChangeValue::InstanceId(iid(7))),
            some(ChangeValue::InstanceId(iid(8)))
        )
    );
    assert_eq!(index.values(element).count(), 1);
}

#[test]
fn kept_entity_updates_always_carry_a_value() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(13)).set("ModelId", iid(7), iid(8)))
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(14)).set("ModelId", iid(7), iid(7)));
    let options = ExtractOptions {
        include_relationships: false,
        ..ExtractOptions::default()
    };

    let live = MemoryLiveStore::new()
        .with_row(ELEMENTS, iid(13))
        .with_row(ELEMENTS, iid(14));

    let (index, stats) = extract_with(&changeset, &live, options).unwrap();

    assert_eq!(op_of(&index, key(ELEMENT, 13)), Some(RowOp::Update));
    assert_eq!(index.values(key(ELEMENT, 13)).count(), 1);
    assert!(!index.contains(key(ELEMENT, 14)).unwrap());
    assert_eq!(stats.vacuous_updates_dropped, 1);

    for record in index.records() {
        let record = record.unwrap();
        if record.op == RowOp::Update {
            assert!(index.values(record.key).next().is_some());
        }
    }
}

#[test]
fn parent_outside_constraint_is_not_a_relationship() {
    let changeset = MemoryChangeset::new()
        .with_row(
            RowChange::insert(ELEMENTS, ELEMENT, iid(20))
                .new_value("ParentId", iid(1))
                .new_value("ParentClassId", ELEMENT),
        )
        .with_row(
            RowChange::insert(ELEMENTS, ELEMENT, iid(21))
                .new_value("ParentId", iid(2))
                .new_value("ParentClassId", PHYSICAL),
        );

    let (index, _) = extract(&changeset, &MemoryLiveStore::new()).unwrap();

    assert!(!index.contains(key(ELEMENT_OWNS_CHILDREN, 20)).unwrap());
    assert_eq!(
        op_of(&index, key(ELEMENT_OWNS_CHILDREN, 21)),
        Some(RowOp::Insert)
    );
    assert_eq!(
        pair(&index, key(ELEMENT_OWNS_CHILDREN, 21), SOURCE_CLASS_ID),
        (None, some(ChangeValue::ClassId(PHYSICAL)))
    );
}

#[test]
fn unresolvable_model_fails_strict_and_skips_lenient() {
    let changeset = MemoryChangeset::new().with_row(
        RowChange::insert(ELEMENTS, ELEMENT, iid(30))
            .new_value("code", "A")
            .new_value("ModelId", iid(9)),
    );
    let live = MemoryLiveStore::new();

    assert!(matches!(
        extract_err(&changeset, &live),
        ExtractError::UnresolvableEndpointClass { relationship, .. }
            if relationship == MODEL_CONTAINS_ELEMENTS
    ));

    let lenient = ExtractOptions {
        strict_endpoints: false,
        ..ExtractOptions::default()
    };
    let sink = CaptureSink::default();
    let (index, stats) =
        with_metrics_sink(&sink, || extract_with(&changeset, &live, lenient)).unwrap();

    assert_eq!(op_of(&index, key(ELEMENT, 30)), Some(RowOp::Insert));
    assert!(!index.contains(key(MODEL_CONTAINS_ELEMENTS, 30)).unwrap());
    assert_eq!(stats.endpoints_skipped, 1);
    assert_eq!(sink.count(MetricsEvent::EndpointSkipped), 1);
}

#[test]
fn untouched_foreign_keys_record_nothing() {
    let changeset = MemoryChangeset::new()
        .with_row(RowChange::update(ELEMENTS, ELEMENT, iid(40)).set("code", "A", "B"));
    let live = MemoryLiveStore::new()
        .with_row(ELEMENTS, iid(40))
        .with_value(ELEMENTS, iid(40), "ModelId", iid(7));

    let (index, stats) = extract(&changeset, &live).unwrap();

    assert_eq!(index.instance_count(), 1);
    assert_eq!(stats.relationships_recorded, 0);
}

#[test]
fn derive_relationship_op_table() {
    assert_eq!(derive_relationship_op(false, true), Some(RowOp::Insert));
    assert_eq!(derive_relationship_op(true, false), Some(RowOp::Delete));
    assert_eq!(derive_relationship_op(true, true), Some(RowOp::Update));
    assert_eq!(derive_relationship_op(false, false), None);
}

proptest! {
    #[test]
    fn derived_op_matches_observable_sides(old_valid in any::<bool>(), new_valid in any::<bool>()) {
        match derive_relationship_op(old_valid, new_valid) {
            Some(op) => {
                prop_assert_eq!(op.has_old(), old_valid);
                prop_assert_eq!(op.has_new(), new_valid);
            }
            None => prop_assert!(!old_valid && !new_valid),
        }
    }
}
