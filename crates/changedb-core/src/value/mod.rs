mod render;


use crate::types::{ClassId, InstanceId};
use candid::CandidType;
use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use render::{ValueRenderKind, render_value};

///
/// ChangeValue
///
/// Typed old/new value carried by a changed column.
/// Values keep their storage representation; nothing is coerced on the way
/// into an index.
///

#[derive(CandidType, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum ChangeValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
    Bool(bool),
    ClassId(ClassId),
    InstanceId(InstanceId),
}

impl ChangeValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Lift an optional value, mapping `None` onto `Null`.
    #[must_use]
    pub fn from_option(value: Option<Self>) -> Self {
        value.unwrap_or_default()
    }

    /// Return the value only if it carries information.
    #[must_use]
    pub fn non_null(value: Option<Self>) -> Option<Self> {
        value.filter(|v| !v.is_null())
    }

    /// Interpret the value as an instance id.
    /// Integers are accepted because id columns are stored as plain integers;
    /// zero and negative integers are "no object".
    #[must_use]
    pub fn as_instance_id(&self) -> Option<InstanceId> {
        let id = match self {
            Self::InstanceId(id) => *id,
            Self::Integer(raw) => InstanceId::new(u64::try_from(*raw).ok()?),
            _ => return None,
        };

        id.is_valid().then_some(id)
    }

    /// Interpret the value as a class id, under the same rules as instance ids.
    #[must_use]
    pub fn as_class_id(&self) -> Option<ClassId> {
        let id = match self {
            Self::ClassId(id) => *id,
            Self::Integer(raw) => ClassId::new(u64::try_from(*raw).ok()?),
            _ => return None,
        };

        id.is_valid().then_some(id)
    }

    /// Build an instance-id value, mapping invalid ids onto `Null`.
    #[must_use]
    pub const fn from_instance_id(id: InstanceId) -> Self {
        if id.is_valid() {
            Self::InstanceId(id)
        } else {
            Self::Null
        }
    }

    /// Build a class-id value, mapping invalid ids onto `Null`.
    #[must_use]
    pub const fn from_class_id(id: ClassId) -> Self {
        if id.is_valid() {
            Self::ClassId(id)
        } else {
            Self::Null
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::ClassId(_) => "class_id",
            Self::InstanceId(_) => "instance_id",
        }
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Blob(v) => {
                f.write_str("x'")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
            Self::Bool(v) => write!(f, "{v}"),
            Self::ClassId(v) => write!(f, "{v}"),
            Self::InstanceId(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ChangeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ChangeValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for ChangeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ChangeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ChangeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for ChangeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<ClassId> for ChangeValue {
    fn from(v: ClassId) -> Self {
        Self::from_class_id(v)
    }
}

impl From<InstanceId> for ChangeValue {
    fn from(v: InstanceId) -> Self {
        Self::from_instance_id(v)
    }
}
