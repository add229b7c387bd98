use crate::{
    changeset::LiveStore,
    error::InternalError,
    types::InstanceId,
    value::ChangeValue,
};
use std::collections::BTreeMap;

type Row = BTreeMap<String, ChangeValue>;

///
/// MemoryLiveStore
///
/// table → instance id → column → value
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryLiveStore {
    tables: BTreeMap<String, BTreeMap<InstanceId, Row>>,
}

impl MemoryLiveStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a row exists, with no column values.
    #[must_use]
    pub fn with_row(mut self, table: impl Into<String>, instance_id: InstanceId) -> Self {
        self.tables
            .entry(table.into())
            .or_default()
            .entry(instance_id)
            .or_default();
        self
    }

    #[must_use]
    pub fn with_value(
        mut self,
        table: impl Into<String>,
        instance_id: InstanceId,
        column: impl Into<String>,
        value: impl Into<ChangeValue>,
    ) -> Self {
        self.set(table, instance_id, column, value);
        self
    }

    pub fn set(
        &mut self,
        table: impl Into<String>,
        instance_id: InstanceId,
        column: impl Into<String>,
        value: impl Into<ChangeValue>,
    ) {
        self.tables
            .entry(table.into())
            .or_default()
            .entry(instance_id)
            .or_default()
            .insert(column.into(), value.into());
    }

    pub fn remove_row(&mut self, table: &str, instance_id: InstanceId) {
        if let Some(rows) = self.tables.get_mut(table) {
            rows.remove(&instance_id);
        }
    }
}

impl LiveStore for MemoryLiveStore {
    fn read_value(
        &self,
        table: &str,
        column: &str,
        instance_id: InstanceId,
    ) -> Result<Option<ChangeValue>, InternalError> {
        Ok(self
            .tables
            .get(table)
            .and_then(|rows| rows.get(&instance_id))
            .and_then(|row| row.get(column))
            .cloned())
    }

    fn row_exists(&self, table: &str, instance_id: InstanceId) -> Result<bool, InternalError> {
        Ok(self
            .tables
            .get(table)
            .is_some_and(|rows| rows.contains_key(&instance_id)))
    }
}
