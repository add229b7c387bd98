use candid::CandidType;
use derive_more::{BitOr, Display};
use serde::{Deserialize, Serialize};

///
/// RowOp
///
/// Physical row operation; also the net operation recorded per instance.
///

#[derive(
    CandidType, Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum RowOp {
    Insert,
    Update,
    Delete,
}

impl RowOp {
    /// Whether the pre-image of a row is observable for this operation.
    #[must_use]
    pub const fn has_old(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }

    /// Whether the post-image of a row is observable for this operation.
    #[must_use]
    pub const fn has_new(self) -> bool {
        matches!(self, Self::Insert | Self::Update)
    }

    #[must_use]
    pub const fn mask(self) -> OpMask {
        match self {
            Self::Insert => OpMask::INSERT,
            Self::Update => OpMask::UPDATE,
            Self::Delete => OpMask::DELETE,
        }
    }
}

///
/// OpMask
///
/// Bitmask over {Insert, Update, Delete} used by summary filters.
///

#[derive(BitOr, Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OpMask(u8);

impl OpMask {
    pub const NONE: Self = Self(0);
    pub const INSERT: Self = Self(1);
    pub const UPDATE: Self = Self(1 << 1);
    pub const DELETE: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    #[must_use]
    pub const fn contains(self, op: RowOp) -> bool {
        self.0 & op.mask().0 != 0
    }

    #[must_use]
    pub const fn is_all(self) -> bool {
        self.0 & Self::ALL.0 == Self::ALL.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for OpMask {
    fn default() -> Self {
        Self::ALL
    }
}

///
/// Stage
///
/// Which image of a changed row a value is read from.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Old,
    New,
}

///
/// RelationshipEnd
///

#[derive(
    CandidType, Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum RelationshipEnd {
    #[display("source")]
    Source,
    #[display("target")]
    Target,
}

impl RelationshipEnd {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}
