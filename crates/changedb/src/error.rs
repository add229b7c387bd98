use candid::CandidType;
use changedb_core::error::{
    ErrorClass, ErrorDetail, ErrorOrigin as CoreErrorOrigin, ExtractError, InternalError,
    StoreError,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(CandidType, Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match &err.detail {
            Some(ErrorDetail::Extract(detail)) => ErrorKind::Extract(detail.into()),
            Some(ErrorDetail::Store(detail)) => ErrorKind::Store(detail.into()),
            None => err.class.into(),
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and canister interfaces.
///

#[derive(CandidType, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Extract(ExtractErrorKind),
    Store(StoreErrorKind),

    /// A referenced summary, class, or row does not exist.
    NotFound,

    /// The request is valid but asks for something the engine cannot do.
    Unsupported,

    /// Internal bookkeeping disagrees with itself.
    InvariantViolation,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Corruption => Self::Store(StoreErrorKind::Corrupt),
            ErrorClass::NotFound => Self::NotFound,
            ErrorClass::Unsupported => Self::Unsupported,
            ErrorClass::InvariantViolation => Self::InvariantViolation,
            ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ExtractErrorKind
/// Why an extraction run was aborted.
///

#[derive(CandidType, Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ExtractErrorKind {
    /// The changeset touches schema tables.
    SchemaChanged,

    /// A changed row maps to no class or instance.
    UnattributedRow,

    /// An updated row is gone from the live store.
    MissingLiveRow,

    /// A relationship end class could not be determined.
    UnresolvedEndpoint,

    /// Mapping metadata is inconsistent for a relationship.
    BadMapping,
}

impl From<&ExtractError> for ExtractErrorKind {
    fn from(err: &ExtractError) -> Self {
        match err {
            ExtractError::SchemaTableChanged { .. } => Self::SchemaChanged,
            ExtractError::UnresolvablePrimaryInstance { .. } => Self::UnattributedRow,
            ExtractError::MissingLiveRow { .. } => Self::MissingLiveRow,
            ExtractError::AmbiguousEndpointClass { .. }
            | ExtractError::UnresolvableEndpointClass { .. } => Self::UnresolvedEndpoint,
            ExtractError::MissingEndpointColumn { .. } | ExtractError::NotARelationship { .. } => {
                Self::BadMapping
            }
        }
    }
}

///
/// StoreErrorKind
///

#[derive(CandidType, Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StoreErrorKind {
    Corrupt,
    InvariantViolation,
}

impl From<&StoreError> for StoreErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Corrupt { .. } => Self::Corrupt,
            StoreError::InvariantViolation { .. } => Self::InvariantViolation,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers and canister interfaces.
///

#[derive(CandidType, Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Extract,
    Index,
    Serialize,
    Store,
    Summary,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Extract => Self::Extract,
            CoreErrorOrigin::Index => Self::Index,
            CoreErrorOrigin::Serialize => Self::Serialize,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Summary => Self::Summary,
        }
    }
}

///
/// TESTS
///
