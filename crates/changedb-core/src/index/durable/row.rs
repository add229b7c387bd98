use crate::{
    error::InternalError,
    serialize::{MAX_PAYLOAD_BYTES, deserialize, serialize},
    types::RowOp,
    value::ChangeValue,
};
use canic_cdk::structures::{Storable, storable::Bound};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::borrow::Cow;

///
/// RawRow
///
/// Bounded CBOR payload stored as a map value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RawRow(Vec<u8>);

impl RawRow {
    pub(crate) fn encode<T: Serialize>(payload: &T) -> Result<Self, InternalError> {
        let bytes = serialize(payload)?;
        if bytes.len() > MAX_PAYLOAD_BYTES as usize {
            return Err(InternalError::store_unsupported(format!(
                "row exceeds max size: {} bytes (limit {MAX_PAYLOAD_BYTES})",
                bytes.len()
            )));
        }

        Ok(Self(bytes))
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T, InternalError> {
        deserialize(&self.0).map_err(|err| {
            InternalError::store_corruption(format!("index row failed to decode: {err}"))
        })
    }
}

impl Storable for RawRow {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        Self(bytes.into_owned())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: MAX_PAYLOAD_BYTES,
        is_fixed_size: false,
    };
}

///
/// InstanceRow
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct InstanceRow {
    pub(crate) op: RowOp,
    pub(crate) indirect: bool,
    pub(crate) table: String,
}

///
/// ValueRow
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct ValueRow {
    pub(crate) old: Option<ChangeValue>,
    pub(crate) new: Option<ChangeValue>,
}
