//! Instance and value indices. The extractor depends only on the traits in
//! this module; the transient and durable backends share every algorithm.

mod backend;
mod durable;
mod record;
mod transient;


use crate::{
    error::InternalError,
    types::{ClassId, InstanceId, InstanceKey, RowOp},
};

pub use backend::{DurableMemories, SummaryIndex};
pub use durable::{DurableIndex, MAX_ACCESS_PATH_BYTES, MAX_TABLE_NAME_BYTES};
pub use record::{InstanceRecord, UpsertOutcome, ValueRecord, consolidate};
pub use transient::TransientIndex;

/// Lazy, fallible traversal over index records.
pub type RecordIter<'a, T> = Box<dyn Iterator<Item = Result<T, InternalError>> + 'a>;

///
/// InstanceIndex
///
/// One record per instance key: net operation, indirect flag, owning table.
///

pub trait InstanceIndex {
    fn query(&self, key: InstanceKey) -> Result<Option<InstanceRecord>, InternalError>;

    fn contains(&self, key: InstanceKey) -> Result<bool, InternalError> {
        Ok(self.query(key)?.is_some())
    }

    /// Insert a record for a key that is not yet present.
    fn insert(&mut self, record: InstanceRecord) -> Result<(), InternalError>;

    /// Overwrite the operation and indirect flag of an existing record.
    /// The owning table is never changed.
    fn update_operation(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        indirect: bool,
    ) -> Result<(), InternalError>;

    /// Remove a record together with its value records.
    fn delete(&mut self, key: InstanceKey) -> Result<(), InternalError>;

    /// Classes of already-recorded instances owned by `table` with the
    /// given instance id, in class order.
    fn class_ids_by_table_and_instance(
        &self,
        table: &str,
        instance_id: InstanceId,
    ) -> Result<Vec<ClassId>, InternalError>;

    /// All records in key order.
    fn records(&self) -> RecordIter<'_, InstanceRecord>;

    /// Records of exactly one class, in instance order.
    fn class_records(&self, class_id: ClassId) -> RecordIter<'_, InstanceRecord>;

    fn instance_count(&self) -> u64;

    /// Apply the consolidation rule for one observed row operation.
    fn upsert(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        indirect: bool,
        table: &str,
    ) -> Result<UpsertOutcome, InternalError> {
        let Some(existing) = self.query(key)? else {
            self.insert(InstanceRecord::new(key, op, indirect, table))?;
            return Ok(UpsertOutcome::Inserted);
        };

        let next = consolidate(Some(existing.op), op);
        if next == existing.op {
            return Ok(UpsertOutcome::Unchanged);
        }

        self.update_operation(key, next, indirect)?;

        Ok(UpsertOutcome::Promoted)
    }
}

///
/// ValueIndex
///
/// At most one old/new pair per (instance key, access path).
///

pub trait ValueIndex {
    /// Store a value record, replacing any record at the same path.
    /// Callers suppress empty diffs before calling.
    fn insert_value(&mut self, record: ValueRecord) -> Result<(), InternalError>;

    fn query_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ValueRecord>, InternalError>;

    /// Value records of one instance in access-path order.
    fn values(&self, key: InstanceKey) -> RecordIter<'_, ValueRecord>;

    fn value_count(&self) -> u64;
}

///
/// ChangeIndex
///
/// Instance and value index living in the same store, so deletes cascade.
///

pub trait ChangeIndex: InstanceIndex + ValueIndex {}

impl<T: InstanceIndex + ValueIndex> ChangeIndex for T {}
