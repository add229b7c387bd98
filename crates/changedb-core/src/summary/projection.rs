use crate::{
    error::InternalError,
    index::ChangeIndex,
    summary::ChangeSummary,
    types::{ClassId, InstanceId, RowOp},
    value::ChangeValue,
};
use candid::CandidType;
use serde::{Deserialize, Serialize};

///
/// InstanceChangeRow
///
/// One row per changed instance.
///

#[derive(CandidType, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceChangeRow {
    pub class_id: ClassId,
    pub instance_id: InstanceId,
    pub op: RowOp,
    pub indirect: bool,
    pub table: String,
}

///
/// ValueChangeRow
///
/// One row per changed value.
///

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValueChangeRow {
    pub class_id: ClassId,
    pub instance_id: InstanceId,
    pub access_path: String,
    pub old: Option<ChangeValue>,
    pub new: Option<ChangeValue>,
}

impl<I: ChangeIndex> ChangeSummary<'_, I> {
    /// Table-like projection of every changed instance.
    pub fn instance_rows(&self) -> Result<Vec<InstanceChangeRow>, InternalError> {
        self.index
            .records()
            .map(|record| {
                record.map(|r| InstanceChangeRow {
                    class_id: r.class_id(),
                    instance_id: r.instance_id(),
                    op: r.op,
                    indirect: r.indirect,
                    table: r.table,
                })
            })
            .collect()
    }

    /// Table-like projection of every changed value, grouped by instance.
    pub fn value_rows(&self) -> Result<Vec<ValueChangeRow>, InternalError> {
        let mut rows = Vec::new();

        for record in self.index.records() {
            let key = record?.key;
            for value in self.index.values(key) {
                let value = value?;
                rows.push(ValueChangeRow {
                    class_id: key.class_id,
                    instance_id: key.instance_id,
                    access_path: value.access_path,
                    old: value.old,
                    new: value.new,
                });
            }
        }

        Ok(rows)
    }
}
