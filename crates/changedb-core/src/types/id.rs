use candid::CandidType;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

///
/// ClassId
///
/// Opaque identifier of a class in the object-relational model.
/// Zero is reserved and marks an absent class.
///

#[derive(
    CandidType,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct ClassId(u64);

impl ClassId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

///
/// InstanceId
///
/// Opaque identifier of one object of a class.
/// The upper 24 bits name the originating briefcase, the lower 40 bits the
/// local sequence; zero is reserved and marks "no object".
///

#[derive(
    CandidType,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct InstanceId(u64);

impl InstanceId {
    const LOCAL_BITS: u32 = 40;
    const LOCAL_MASK: u64 = (1 << Self::LOCAL_BITS) - 1;
    const BRIEFCASE_MASK: u64 = 0x00FF_FFFF;

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Compose an id from its briefcase and local parts.
    #[must_use]
    pub const fn from_parts(briefcase_id: u32, local_id: u64) -> Self {
        Self(
            ((briefcase_id as u64 & Self::BRIEFCASE_MASK) << Self::LOCAL_BITS)
                | (local_id & Self::LOCAL_MASK),
        )
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub const fn briefcase_id(self) -> u32 {
        ((self.0 >> Self::LOCAL_BITS) & Self::BRIEFCASE_MASK) as u32
    }

    #[must_use]
    pub const fn local_id(self) -> u64 {
        self.0 & Self::LOCAL_MASK
    }
}

///
/// InstanceKey
///
/// (class id, instance id) pair naming one logical object.
/// A key is valid only when both halves are.
///

#[derive(
    CandidType,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[display("{class_id}:{instance_id}")]
pub struct InstanceKey {
    pub class_id: ClassId,
    pub instance_id: InstanceId,
}

impl InstanceKey {
    #[must_use]
    pub const fn new(class_id: ClassId, instance_id: InstanceId) -> Self {
        Self {
            class_id,
            instance_id,
        }
    }

    /// The key used for "no object at this end".
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            class_id: ClassId(0),
            instance_id: InstanceId(0),
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.class_id.is_valid() && self.instance_id.is_valid()
    }

    /// Return `Some(self)` for a valid key.
    #[must_use]
    pub const fn valid(self) -> Option<Self> {
        if self.is_valid() { Some(self) } else { None }
    }
}
