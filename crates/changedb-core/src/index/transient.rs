use crate::{
    error::InternalError,
    index::{InstanceIndex, InstanceRecord, RecordIter, ValueIndex, ValueRecord},
    types::{ClassId, InstanceId, InstanceKey, RowOp},
    value::ChangeValue,
};
use std::collections::{BTreeMap, BTreeSet};

type ValuePair = (Option<ChangeValue>, Option<ChangeValue>);

///
/// TransientIndex
///
/// Session-scoped indices held in process memory.
///

#[derive(Clone, Debug, Default)]
pub struct TransientIndex {
    instances: BTreeMap<InstanceKey, InstanceRecord>,
    values: BTreeMap<(InstanceKey, String), ValuePair>,
    by_table: BTreeSet<(String, InstanceId, ClassId)>,
}

impl TransientIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn value_keys(&self, key: InstanceKey) -> impl Iterator<Item = &(InstanceKey, String)> {
        self.values
            .range((key, String::new())..)
            .map(|(k, _)| k)
            .take_while(move |(k, _)| *k == key)
    }
}

impl InstanceIndex for TransientIndex {
    fn query(&self, key: InstanceKey) -> Result<Option<InstanceRecord>, InternalError> {
        Ok(self.instances.get(&key).cloned())
    }

    fn insert(&mut self, record: InstanceRecord) -> Result<(), InternalError> {
        if self.instances.contains_key(&record.key) {
            return Err(InternalError::index_invariant(format!(
                "instance {} already recorded",
                record.key
            )));
        }

        self.by_table.insert((
            record.table.clone(),
            record.instance_id(),
            record.class_id(),
        ));
        self.instances.insert(record.key, record);

        Ok(())
    }

    fn update_operation(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        indirect: bool,
    ) -> Result<(), InternalError> {
        let record = self.instances.get_mut(&key).ok_or_else(|| {
            InternalError::index_invariant(format!("instance {key} is not recorded"))
        })?;
        record.op = op;
        record.indirect = indirect;

        Ok(())
    }

    fn delete(&mut self, key: InstanceKey) -> Result<(), InternalError> {
        let Some(record) = self.instances.remove(&key) else {
            return Ok(());
        };

        self.by_table
            .remove(&(record.table, key.instance_id, key.class_id));

        let doomed: Vec<_> = self.value_keys(key).cloned().collect();
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
        let start = (table.to_string(), instance_id, ClassId::new(0));
        let end = (table.to_string(), instance_id, ClassId::new(u64::MAX));

        Ok(self
            .by_table
            .range(start..=end)
            .map(|(_, _, class_id)| *class_id)
            .collect())
    }

    fn records(&self) -> RecordIter<'_, InstanceRecord> {
        Box::new(self.instances.values().cloned().map(Ok))
    }

    fn class_records(&self, class_id: ClassId) -> RecordIter<'_, InstanceRecord> {
        let start = InstanceKey::new(class_id, InstanceId::new(0));
        let end = InstanceKey::new(class_id, InstanceId::new(u64::MAX));

        Box::new(self.instances.range(start..=end).map(|(_, r)| Ok(r.clone())))
    }

    fn instance_count(&self) -> u64 {
        self.instances.len() as u64
    }
}

impl ValueIndex for TransientIndex {
    fn insert_value(&mut self, record: ValueRecord) -> Result<(), InternalError> {
        self.values
            .insert((record.key, record.access_path), (record.old, record.new));

        Ok(())
    }

    fn query_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ValueRecord>, InternalError> {
        Ok(self
            .values
            .get(&(key, access_path.to_string()))
            .map(|(old, new)| ValueRecord::new(key, access_path, old.clone(), new.clone())))
    }

    fn values(&self, key: InstanceKey) -> RecordIter<'_, ValueRecord> {
        Box::new(
            self.values
                .range((key, String::new())..)
                .take_while(move |((k, _), _)| *k == key)
                .map(|((k, path), (old, new))| {
                    Ok(ValueRecord::new(*k, path.clone(), old.clone(), new.clone()))
                }),
        )
    }

    fn value_count(&self) -> u64 {
        self.values.len() as u64
    }
}
