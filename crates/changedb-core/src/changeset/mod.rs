//! Consumed collaborators on the input side: the row cursor over a changeset
//! and read access to live storage.

mod live;
mod memory;


use crate::{
    error::InternalError,
    types::{ClassId, InstanceId, RowOp, Stage},
    value::ChangeValue,
};

pub use live::MemoryLiveStore;
pub use memory::{MemoryChangeset, RowChange};

///
/// ChangeRow
///
/// One physical row delta as exposed by the row cursor.
///

pub trait ChangeRow {
    /// False when the row's table has no class mapping.
    fn is_mapped(&self) -> bool;

    fn table_name(&self) -> &str;

    fn operation(&self) -> RowOp;

    fn is_indirect(&self) -> bool;

    /// Class owning the row, if it could be determined.
    fn primary_class(&self) -> Option<ClassId>;

    /// Instance id held in the row's primary key column.
    fn primary_instance_id(&self) -> Option<InstanceId>;

    /// Value of `column` at `stage`, or `None` when the column is not part
    /// of the row delta at that stage.
    fn value(&self, column: &str, stage: Stage) -> Option<ChangeValue>;

    /// Whether `column` appears in the delta at either stage.
    fn contains_column(&self, column: &str) -> bool {
        self.value(column, Stage::Old).is_some() || self.value(column, Stage::New).is_some()
    }
}

///
/// Changeset
///
/// Restartable, table-then-row ordered traversal of a changeset.
///

pub trait Changeset {
    type Row: ChangeRow;

    fn rows(&self) -> impl Iterator<Item = &Self::Row>;
}

///
/// LiveStore
///
/// Current (post-changeset) contents of the physical tables.
///

pub trait LiveStore {
    /// Current value of one column, `None` when the row or column is absent.
    fn read_value(
        &self,
        table: &str,
        column: &str,
        instance_id: InstanceId,
    ) -> Result<Option<ChangeValue>, InternalError>;

    fn row_exists(&self, table: &str, instance_id: InstanceId) -> Result<bool, InternalError>;

    /// Class id stored for `instance_id` in a table's class-id column.
    fn class_for_table(
        &self,
        table: &str,
        class_id_column: &str,
        instance_id: InstanceId,
    ) -> Result<Option<ClassId>, InternalError> {
        Ok(self
            .read_value(table, class_id_column, instance_id)?
            .and_then(|value| value.as_class_id()))
    }
}
