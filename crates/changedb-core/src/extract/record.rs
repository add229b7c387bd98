use crate::{
    changeset::{ChangeRow, LiveStore},
    error::InternalError,
    extract::{Extractor, endpoint_access_paths, relation::read_instance_id},
    index::{ChangeIndex, ValueRecord},
    model::PropertyColumn,
    types::{InstanceKey, RelationshipEnd, RowOp, Stage},
    value::ChangeValue,
};

///
/// EndpointPair
///
/// Old and new key of one relationship end; invalid keys mean
/// "no object at this end".
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct EndpointPair {
    pub(super) old: InstanceKey,
    pub(super) new: InstanceKey,
}

impl<I, L> Extractor<'_, I, L>
where
    I: ChangeIndex,
    L: LiveStore + ?Sized,
{
    /// Record every changed property of `key` carried by `row`.
    ///
    /// `op` is the instance's own operation, which for foreign-key
    /// relationships can differ from the row's. In that case the side the
    /// row does not carry is read from live storage.
    pub(super) fn record_properties<R: ChangeRow>(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        row: &R,
    ) -> Result<bool, InternalError> {
        let row_op = row.operation();
        let mut changed = false;

        for PropertyColumn {
            access_path,
            column,
        } in self.catalog.property_columns(key.class_id, row.table_name())
        {
            let mut old = if op.has_old() {
                row.value(&column, Stage::Old)
            } else {
                None
            };
            let mut new = if op.has_new() {
                row.value(&column, Stage::New)
            } else {
                None
            };

            if op != row_op {
                match op {
                    RowOp::Insert if new.as_ref().is_none_or(ChangeValue::is_null) => {
                        new = self.live.read_value(row.table_name(), &column, key.instance_id)?;
                    }
                    RowOp::Delete if old.as_ref().is_none_or(ChangeValue::is_null) => {
                        old = self.live.read_value(row.table_name(), &column, key.instance_id)?;
                    }
                    _ => {}
                }
            }

            changed |= self.record_value(key, access_path, old, new)?;
        }

        Ok(changed)
    }

    /// Record the foreign keys an entity row holds as values of its
    /// navigation properties. Columns outside the delta are skipped.
    pub(super) fn record_foreign_keys<R: ChangeRow>(
        &mut self,
        key: InstanceKey,
        row: &R,
    ) -> Result<bool, InternalError> {
        let mut changed = false;

        for (relationship, column) in self.held_foreign_keys(key, row.table_name()) {
            if !row.contains_column(&column) {
                continue;
            }
            let access_path = self
                .catalog
                .navigation_access_path(relationship)
                .unwrap_or_else(|| column.clone());
            let old = read_instance_id(row, &column, Stage::Old).map(ChangeValue::InstanceId);
            let new = read_instance_id(row, &column, Stage::New).map(ChangeValue::InstanceId);

            changed |= self.record_value(key, access_path, old, new)?;
        }

        Ok(changed)
    }

    /// Store a property diff; identical or empty diffs are dropped.
    fn record_value(
        &mut self,
        key: InstanceKey,
        access_path: String,
        old: Option<ChangeValue>,
        new: Option<ChangeValue>,
    ) -> Result<bool, InternalError> {
        let record = ValueRecord::new(key, access_path, old, new);
        if record.is_empty() || record.old == record.new {
            return Ok(false);
        }
        self.index.insert_value(record)?;

        Ok(true)
    }

    /// Store the four synthetic endpoint records of a relationship.
    /// Unchanged endpoints are kept; only empty records are dropped.
    pub(super) fn record_endpoints(
        &mut self,
        key: InstanceKey,
        source: EndpointPair,
        target: EndpointPair,
    ) -> Result<(), InternalError> {
        for (end, pair) in [
            (RelationshipEnd::Source, source),
            (RelationshipEnd::Target, target),
        ] {
            let (class_path, instance_path) = endpoint_access_paths(end);
            let old = pair.old.valid();
            let new = pair.new.valid();

            self.record_synthetic(
                key,
                class_path,
                old.map(|k| ChangeValue::ClassId(k.class_id)),
                new.map(|k| ChangeValue::ClassId(k.class_id)),
            )?;
            self.record_synthetic(
                key,
                instance_path,
                old.map(|k| ChangeValue::InstanceId(k.instance_id)),
                new.map(|k| ChangeValue::InstanceId(k.instance_id)),
            )?;
        }

        Ok(())
    }

    fn record_synthetic(
        &mut self,
        key: InstanceKey,
        access_path: &str,
        old: Option<ChangeValue>,
        new: Option<ChangeValue>,
    ) -> Result<(), InternalError> {
        let record = ValueRecord::new(key, access_path, old, new);
        if !record.is_empty() {
            self.index.insert_value(record)?;
        }

        Ok(())
    }
}
