use crate::{
    types::{ClassId, InstanceId, InstanceKey, RowOp},
    value::ChangeValue,
};
use candid::CandidType;
use serde::{Deserialize, Serialize};

///
/// InstanceRecord
///

#[derive(CandidType, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceRecord {
    pub key: InstanceKey,
    pub op: RowOp,
    pub indirect: bool,
    pub table: String,
}

impl InstanceRecord {
    #[must_use]
    pub fn new(key: InstanceKey, op: RowOp, indirect: bool, table: impl Into<String>) -> Self {
        Self {
            key,
            op,
            indirect,
            table: table.into(),
        }
    }

    #[must_use]
    pub const fn class_id(&self) -> ClassId {
        self.key.class_id
    }

    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.key.instance_id
    }
}

///
/// ValueRecord
///
/// Old/new pair of one property. `None` stands for absent or null; an
/// empty record (both `None`) carries no information.
///

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValueRecord {
    pub key: InstanceKey,
    pub access_path: String,
    pub old: Option<ChangeValue>,
    pub new: Option<ChangeValue>,
}

impl ValueRecord {
    /// Build a record, folding explicit nulls into absence.
    #[must_use]
    pub fn new(
        key: InstanceKey,
        access_path: impl Into<String>,
        old: Option<ChangeValue>,
        new: Option<ChangeValue>,
    ) -> Self {
        Self {
            key,
            access_path: access_path.into(),
            old: ChangeValue::non_null(old),
            new: ChangeValue::non_null(new),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.old.is_none() && self.new.is_none()
    }
}

///
/// UpsertOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
    /// No record existed; one was created.
    Inserted,
    /// An Update record was overwritten by Insert or Delete.
    Promoted,
    /// The existing record already reflects the net operation.
    Unchanged,
}

/// Net operation after observing `incoming` on top of `existing`.
///
/// Insert and Delete are sticky; an Update only survives on its own.
#[must_use]
pub const fn consolidate(existing: Option<RowOp>, incoming: RowOp) -> RowOp {
    match existing {
        None | Some(RowOp::Update) => incoming,
        Some(op) => op,
    }
}
