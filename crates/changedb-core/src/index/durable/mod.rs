mod key;
mod row;


pub use key::{MAX_ACCESS_PATH_BYTES, MAX_TABLE_NAME_BYTES};

use crate::{
    error::InternalError,
    index::{InstanceIndex, InstanceRecord, RecordIter, ValueIndex, ValueRecord},
    types::{ClassId, InstanceId, InstanceKey, RowOp},
};
use canic_cdk::structures::{BTreeMap, DefaultMemoryImpl, memory::VirtualMemory};
use derive_more::{Deref, DerefMut};
use key::{RawInstanceKey, RawTableKey, RawValueKey};
use row::{InstanceRow, RawRow, ValueRow};

///
/// InstanceStore
///

#[derive(Deref, DerefMut)]
pub(crate) struct InstanceStore(BTreeMap<RawInstanceKey, RawRow, VirtualMemory<DefaultMemoryImpl>>);

impl InstanceStore {
    #[must_use]
    pub(crate) fn init(memory: VirtualMemory<DefaultMemoryImpl>) -> Self {
        Self(BTreeMap::init(memory))
    }
}

///
/// ValueStore
///

#[derive(Deref, DerefMut)]
pub(crate) struct ValueStore(BTreeMap<RawValueKey, RawRow, VirtualMemory<DefaultMemoryImpl>>);

impl ValueStore {
    #[must_use]
    pub(crate) fn init(memory: VirtualMemory<DefaultMemoryImpl>) -> Self {
        Self(BTreeMap::init(memory))
    }
}

///
/// TableStore
///
/// Secondary lookup from (table, instance id) to recorded class ids.
///

#[derive(Deref, DerefMut)]
pub(crate) struct TableStore(BTreeMap<RawTableKey, (), VirtualMemory<DefaultMemoryImpl>>);

impl TableStore {
    #[must_use]
    pub(crate) fn init(memory: VirtualMemory<DefaultMemoryImpl>) -> Self {
        Self(BTreeMap::init(memory))
    }
}

///
/// DurableIndex
///
/// Change cache persisted as ordinary rows in stable memory. Each of the
/// three maps needs its own virtual memory.
///

pub struct DurableIndex {
    instances: InstanceStore,
    values: ValueStore,
    tables: TableStore,
}

impl DurableIndex {
    #[must_use]
    pub fn init(
        instances: VirtualMemory<DefaultMemoryImpl>,
        values: VirtualMemory<DefaultMemoryImpl>,
        tables: VirtualMemory<DefaultMemoryImpl>,
    ) -> Self {
        Self {
            instances: InstanceStore::init(instances),
            values: ValueStore::init(values),
            tables: TableStore::init(tables),
        }
    }

    /// Drop every record; a cache is rebuilt from scratch per changeset.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.values.clear();
        self.tables.clear();
    }

    fn decode_instance(raw: RawInstanceKey, row: &RawRow) -> Result<InstanceRecord, InternalError> {
        let row: InstanceRow = row.decode()?;

        Ok(InstanceRecord::new(raw.key(), row.op, row.indirect, row.table))
    }

    fn decode_value(raw: &RawValueKey, row: &RawRow) -> Result<ValueRecord, InternalError> {
        let (key, path) = raw.decode()?;
        let row: ValueRow = row.decode()?;

        Ok(ValueRecord::new(key, path, row.old, row.new))
    }
}

impl InstanceIndex for DurableIndex {
    fn query(&self, key: InstanceKey) -> Result<Option<InstanceRecord>, InternalError> {
        let raw = RawInstanceKey::new(key);

        self.instances
            .get(&raw)
            .map(|row| Self::decode_instance(raw, &row))
            .transpose()
    }

    fn insert(&mut self, record: InstanceRecord) -> Result<(), InternalError> {
        let raw = RawInstanceKey::new(record.key);
        if self.instances.contains_key(&raw) {
            return Err(InternalError::index_invariant(format!(
                "instance {} already recorded",
                record.key
            )));
        }

        let table_key = RawTableKey::try_new(&record.table, record.instance_id(), record.class_id())?;
        let row = RawRow::encode(&InstanceRow {
            op: record.op,
            indirect: record.indirect,
            table: record.table,
        })?;

        self.instances.insert(raw, row);
        self.tables.insert(table_key, ());

        Ok(())
    }

    fn update_operation(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        indirect: bool,
    ) -> Result<(), InternalError> {
        let raw = RawInstanceKey::new(key);
        let Some(row) = self.instances.get(&raw) else {
            return Err(InternalError::index_invariant(format!(
                "instance {key} is not recorded"
            )));
        };

        let mut row: InstanceRow = row.decode()?;
        row.op = op;
        row.indirect = indirect;
        self.instances.insert(raw, RawRow::encode(&row)?);

        Ok(())
    }

    fn delete(&mut self, key: InstanceKey) -> Result<(), InternalError> {
        let raw = RawInstanceKey::new(key);
        let Some(row) = self.instances.remove(&raw) else {
            return Ok(());
        };
        let row: InstanceRow = row.decode()?;

        self.tables
            .remove(&RawTableKey::try_new(&row.table, key.instance_id, key.class_id)?);

        let (start, end) = RawValueKey::instance_range(key);
        let doomed: Vec<RawValueKey> = self
            .values
            .range(start..end)
            .map(|entry| entry.key().clone())
            .collect();
        for value_key in doomed {
            self.values.remove(&value_key);
        }

        Ok(())
    }

    fn class_ids_by_table_and_instance(
        &self,
        table: &str,
        instance_id: InstanceId,
    ) -> Result<Vec<ClassId>, InternalError> {
        let (start, end) = RawTableKey::instance_range(table, instance_id)?;

        Ok(self
            .tables
            .range(start..=end)
            .map(|entry| entry.key().class_id())
            .collect())
    }

    fn records(&self) -> RecordIter<'_, InstanceRecord> {
        Box::new(
            self.instances
                .iter()
                .map(|entry| Self::decode_instance(*entry.key(), &entry.value())),
        )
    }

    fn class_records(&self, class_id: ClassId) -> RecordIter<'_, InstanceRecord> {
        let start = RawInstanceKey::new(InstanceKey::new(class_id, InstanceId::new(0)));
        let end = RawInstanceKey::new(InstanceKey::new(class_id, InstanceId::new(u64::MAX)));

        Box::new(
            self.instances
                .range(start..=end)
                .map(|entry| Self::decode_instance(*entry.key(), &entry.value())),
        )
    }

    fn instance_count(&self) -> u64 {
        self.instances.len()
    }
}

impl ValueIndex for DurableIndex {
    fn insert_value(&mut self, record: ValueRecord) -> Result<(), InternalError> {
        let key = RawValueKey::try_new(record.key, &record.access_path)?;
        let row = RawRow::encode(&ValueRow {
            old: record.old,
            new: record.new,
        })?;
        self.values.insert(key, row);

        Ok(())
    }

    fn query_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ValueRecord>, InternalError> {
        let raw = RawValueKey::try_new(key, access_path)?;

        self.values
            .get(&raw)
            .map(|row| Self::decode_value(&raw, &row))
            .transpose()
    }

    fn values(&self, key: InstanceKey) -> RecordIter<'_, ValueRecord> {
        let (start, end) = RawValueKey::instance_range(key);

        Box::new(
            self.values
                .range(start..end)
                .map(|entry| Self::decode_value(entry.key(), &entry.value())),
        )
    }

    fn value_count(&self) -> u64 {
        self.values.len()
    }
}
