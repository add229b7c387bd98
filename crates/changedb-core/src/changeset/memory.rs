use crate::{
    changeset::{ChangeRow, Changeset},
    types::{ClassId, InstanceId, RowOp, Stage},
    value::ChangeValue,
};
use std::collections::BTreeMap;

///
/// RowChange
///
/// Owned row delta. Old and new images only hold the columns that are part
/// of the delta.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RowChange {
    table: String,
    op: RowOp,
    indirect: bool,
    mapped: bool,
    class_id: Option<ClassId>,
    instance_id: Option<InstanceId>,
    old: BTreeMap<String, ChangeValue>,
    new: BTreeMap<String, ChangeValue>,
}

impl RowChange {
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        op: RowOp,
        class_id: ClassId,
        instance_id: InstanceId,
    ) -> Self {
        Self {
            table: table.into(),
            op,
            indirect: false,
            mapped: true,
            class_id: Some(class_id),
            instance_id: Some(instance_id),
            old: BTreeMap::new(),
            new: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn insert(table: impl Into<String>, class_id: ClassId, instance_id: InstanceId) -> Self {
        Self::new(table, RowOp::Insert, class_id, instance_id)
    }

    #[must_use]
    pub fn update(table: impl Into<String>, class_id: ClassId, instance_id: InstanceId) -> Self {
        Self::new(table, RowOp::Update, class_id, instance_id)
    }

    #[must_use]
    pub fn delete(table: impl Into<String>, class_id: ClassId, instance_id: InstanceId) -> Self {
        Self::new(table, RowOp::Delete, class_id, instance_id)
    }

    /// Row of a table the mapping layer does not know about.
    #[must_use]
    pub fn unmapped(table: impl Into<String>, op: RowOp) -> Self {
        Self {
            table: table.into(),
            op,
            indirect: false,
            mapped: false,
            class_id: None,
            instance_id: None,
            old: BTreeMap::new(),
            new: BTreeMap::new(),
        }
    }

    /// Drop the class attribution, as a cursor does when the class-id
    /// column cannot be read.
    #[must_use]
    pub const fn unattributed(mut self) -> Self {
        self.class_id = None;
        self
    }

    #[must_use]
    pub const fn indirect(mut self) -> Self {
        self.indirect = true;
        self
    }

    #[must_use]
    pub fn old(mut self, column: impl Into<String>, value: impl Into<ChangeValue>) -> Self {
        self.old.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn new_value(mut self, column: impl Into<String>, value: impl Into<ChangeValue>) -> Self {
        self.new.insert(column.into(), value.into());
        self
    }

    /// Record both images of one column.
    #[must_use]
    pub fn set(
        self,
        column: impl Into<String>,
        old: impl Into<ChangeValue>,
        new: impl Into<ChangeValue>,
    ) -> Self {
        let column = column.into();
        self.old(column.clone(), old).new_value(column, new)
    }

    fn sort_key(&self) -> (&str, Option<InstanceId>) {
        (&self.table, self.instance_id)
    }
}

impl ChangeRow for RowChange {
    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn operation(&self) -> RowOp {
        self.op
    }

    fn is_indirect(&self) -> bool {
        self.indirect
    }

    fn primary_class(&self) -> Option<ClassId> {
        self.class_id
    }

    fn primary_instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    fn value(&self, column: &str, stage: Stage) -> Option<ChangeValue> {
        let image = match stage {
            Stage::Old => &self.old,
            Stage::New => &self.new,
        };

        image.get(column).cloned()
    }
}

///
/// MemoryChangeset
///
/// Changeset held in memory, kept ordered by table then by row.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryChangeset {
    rows: Vec<RowChange>,
}

impl MemoryChangeset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_row(mut self, row: RowChange) -> Self {
        self.push(row);
        self
    }

    /// Insert a row at its ordered position; rows with equal keys keep
    /// their arrival order.
    pub fn push(&mut self, row: RowChange) {
        let at = self
            .rows
            .partition_point(|existing| existing.sort_key() <= row.sort_key());
        self.rows.insert(at, row);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Changeset for MemoryChangeset {
    type Row = RowChange;

    fn rows(&self) -> impl Iterator<Item = &Self::Row> {
        self.rows.iter()
    }
}

impl FromIterator<RowChange> for MemoryChangeset {
    fn from_iter<T: IntoIterator<Item = RowChange>>(iter: T) -> Self {
        let mut changeset = Self::new();
        for row in iter {
            changeset.push(row);
        }
        changeset
    }
}
