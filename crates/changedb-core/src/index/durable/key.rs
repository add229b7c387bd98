use crate::{
    error::InternalError,
    types::{ClassId, InstanceId, InstanceKey},
};
use canic_cdk::structures::{Storable, storable::Bound};
use std::borrow::Cow;

/// Longest access path the durable value store accepts.
pub const MAX_ACCESS_PATH_BYTES: u32 = 512;

/// Longest table name the durable table lookup accepts.
pub const MAX_TABLE_NAME_BYTES: u32 = 256;

const KEY_BYTES: usize = 16;
const ID_BYTES: usize = 8;

// Access paths are UTF-8 and can never contain this byte.
const PATH_UPPER_SENTINEL: u8 = 0xFF;
const TABLE_TERMINATOR: u8 = 0x00;

///
/// RawInstanceKey
///
/// class id (BE) ‖ instance id (BE); byte order equals key order.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct RawInstanceKey([u8; KEY_BYTES]);

impl RawInstanceKey {
    #[must_use]
    pub(crate) fn new(key: InstanceKey) -> Self {
        let mut buf = [0u8; KEY_BYTES];
        buf[..ID_BYTES].copy_from_slice(&key.class_id.get().to_be_bytes());
        buf[ID_BYTES..].copy_from_slice(&key.instance_id.get().to_be_bytes());

        Self(buf)
    }

    #[must_use]
    pub(crate) fn key(&self) -> InstanceKey {
        let (class, instance) = self.0.split_at(ID_BYTES);

        InstanceKey::new(
            ClassId::new(read_u64(class)),
            InstanceId::new(read_u64(instance)),
        )
    }

    #[must_use]
    pub(crate) const fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

impl Storable for RawInstanceKey {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        let mut out = [0u8; KEY_BYTES];
        if bytes.len() == out.len() {
            out.copy_from_slice(bytes.as_ref());
        }
        Self(out)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0.to_vec()
    }

    #[allow(clippy::cast_possible_truncation)]
    const BOUND: Bound = Bound::Bounded {
        max_size: KEY_BYTES as u32,
        is_fixed_size: true,
    };
}

///
/// RawValueKey
///
/// instance key ‖ access path (UTF-8)
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct RawValueKey(Vec<u8>);

impl RawValueKey {
    pub(crate) fn try_new(key: InstanceKey, access_path: &str) -> Result<Self, InternalError> {
        if access_path.len() > MAX_ACCESS_PATH_BYTES as usize {
            return Err(InternalError::store_unsupported(format!(
                "access path exceeds {MAX_ACCESS_PATH_BYTES} bytes: {} bytes",
                access_path.len()
            )));
        }

        let mut buf = Vec::with_capacity(KEY_BYTES + access_path.len());
        buf.extend_from_slice(RawInstanceKey::new(key).as_bytes());
        buf.extend_from_slice(access_path.as_bytes());

        Ok(Self(buf))
    }

    /// Half-open range covering every path of one instance.
    #[must_use]
    pub(crate) fn instance_range(key: InstanceKey) -> (Self, Self) {
        let prefix = RawInstanceKey::new(key).as_bytes().to_vec();
        let mut upper = prefix.clone();
        upper.push(PATH_UPPER_SENTINEL);

        (Self(prefix), Self(upper))
    }

    pub(crate) fn decode(&self) -> Result<(InstanceKey, String), InternalError> {
        if self.0.len() < KEY_BYTES {
            return Err(InternalError::store_corruption(format!(
                "value key too short: {} bytes",
                self.0.len()
            )));
        }

        let (head, path) = self.0.split_at(KEY_BYTES);
        let key = RawInstanceKey::from_bytes(Cow::Borrowed(head)).key();
        let path = std::str::from_utf8(path)
            .map_err(|_| InternalError::store_corruption("value key access path is not UTF-8"))?;

        Ok((key, path.to_string()))
    }
}

impl Storable for RawValueKey {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        Self(bytes.into_owned())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    const BOUND: Bound = Bound::Bounded {
        max_size: KEY_BYTES as u32 + MAX_ACCESS_PATH_BYTES + 1,
        is_fixed_size: false,
    };
}

///
/// RawTableKey
///
/// table name ‖ 0x00 ‖ instance id (BE) ‖ class id (BE)
///
/// Ordering groups by table, then instance, so one instance id in one
/// table is a contiguous range of class ids.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct RawTableKey(Vec<u8>);

impl RawTableKey {
    pub(crate) fn try_new(
        table: &str,
        instance_id: InstanceId,
        class_id: ClassId,
    ) -> Result<Self, InternalError> {
        let mut buf = Self::prefix(table, instance_id)?;
        buf.extend_from_slice(&class_id.get().to_be_bytes());

        Ok(Self(buf))
    }

    /// Inclusive range covering every class of one (table, instance id).
    pub(crate) fn instance_range(
        table: &str,
        instance_id: InstanceId,
    ) -> Result<(Self, Self), InternalError> {
        Ok((
            Self::try_new(table, instance_id, ClassId::new(0))?,
            Self::try_new(table, instance_id, ClassId::new(u64::MAX))?,
        ))
    }

    #[must_use]
    pub(crate) fn class_id(&self) -> ClassId {
        let at = self.0.len().saturating_sub(ID_BYTES);
        ClassId::new(read_u64(&self.0[at..]))
    }

    fn prefix(table: &str, instance_id: InstanceId) -> Result<Vec<u8>, InternalError> {
        if table.len() > MAX_TABLE_NAME_BYTES as usize {
            return Err(InternalError::store_unsupported(format!(
                "table name exceeds {MAX_TABLE_NAME_BYTES} bytes: '{table}'"
            )));
        }
        if table.as_bytes().contains(&TABLE_TERMINATOR) {
            return Err(InternalError::store_unsupported(format!(
                "table name contains a NUL byte: '{}'",
                table.escape_debug()
            )));
        }

        let mut buf = Vec::with_capacity(table.len() + 1 + 2 * ID_BYTES);
        buf.extend_from_slice(table.as_bytes());
        buf.push(TABLE_TERMINATOR);
        buf.extend_from_slice(&instance_id.get().to_be_bytes());

        Ok(buf)
    }
}

impl Storable for RawTableKey {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        Self(bytes.into_owned())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    const BOUND: Bound = Bound::Bounded {
        max_size: MAX_TABLE_NAME_BYTES + 1 + 2 * ID_BYTES as u32,
        is_fixed_size: false,
    };
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; ID_BYTES];
    if bytes.len() == ID_BYTES {
        buf.copy_from_slice(bytes);
    }
    u64::from_be_bytes(buf)
}
