use crate::types::{ClassId, InstanceId, RelationshipEnd};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError with optional origin-specific detail.
    /// This constructor provides default StoreError details for certain
    /// (class, origin) combinations but does not guarantee a detail payload.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        let message = message.into();

        let detail = match (class, origin) {
            (ErrorClass::Corruption, ErrorOrigin::Store) => {
                Some(ErrorDetail::Store(StoreError::Corrupt {
                    message: message.clone(),
                }))
            }
            (ErrorClass::InvariantViolation, ErrorOrigin::Store) => {
                Some(ErrorDetail::Store(StoreError::InvariantViolation {
                    message: message.clone(),
                }))
            }
            _ => None,
        };

        Self {
            class,
            origin,
            message,
            detail,
        }
    }

    /// Construct an extraction failure carrying its structured cause.
    pub(crate) fn extract(err: ExtractError) -> Self {
        Self {
            class: err.class(),
            origin: ErrorOrigin::Extract,
            message: err.to_string(),
            detail: Some(ErrorDetail::Extract(err)),
        }
    }

    /// Construct a config-origin unsupported error.
    pub(crate) fn config_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, message.into())
    }

    /// Construct a store-origin corruption error.
    pub(crate) fn store_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Store, message.into())
    }

    /// Construct a store-origin unsupported error.
    pub(crate) fn store_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Store, message.into())
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Index,
            message.into(),
        )
    }

    /// Construct a summary-origin invariant violation.
    pub(crate) fn summary_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Summary,
            message.into(),
        )
    }

    /// Construct a summary-origin not-found error.
    pub(crate) fn summary_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Summary, message.into())
    }

    /// Construct a summary-origin unsupported error.
    pub(crate) fn summary_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Summary, message.into())
    }

    #[must_use]
    pub const fn extract_detail(&self) -> Option<&ExtractError> {
        match &self.detail {
            Some(ErrorDetail::Extract(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Extract(ExtractError),
    #[error("{0}")]
    Store(StoreError),
}

///
/// ExtractError
///
/// Row-level failures that abort an extraction run.
/// There is no partial-success mode: the summary must be discarded.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExtractError {
    #[error("changeset includes changes to schema table '{table}'; a change summary cannot be built")]
    SchemaTableChanged { table: String },

    #[error("changed row in table '{table}' cannot be attributed to a class/instance")]
    UnresolvablePrimaryInstance { table: String },

    #[error(
        "updated row {instance_id} in table '{table}' no longer exists; the changeset does not span all modifications"
    )]
    MissingLiveRow {
        table: String,
        instance_id: InstanceId,
    },

    #[error("relationship {relationship} constrains {end} to {candidates} classes; cannot pick one")]
    AmbiguousEndpointClass {
        relationship: ClassId,
        end: RelationshipEnd,
        candidates: usize,
    },

    #[error(
        "cannot resolve {end} class of relationship {relationship} for instance {instance_id}"
    )]
    UnresolvableEndpointClass {
        relationship: ClassId,
        end: RelationshipEnd,
        instance_id: InstanceId,
    },

    #[error("relationship {relationship} has no mapped {what} column for {end}")]
    MissingEndpointColumn {
        relationship: ClassId,
        end: RelationshipEnd,
        what: &'static str,
    },

    #[error("class {class_id} is not a mapped relationship class")]
    NotARelationship { class_id: ClassId },
}

impl ExtractError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::SchemaTableChanged { .. } => ErrorClass::Unsupported,
            Self::UnresolvablePrimaryInstance { .. }
            | Self::UnresolvableEndpointClass { .. }
            | Self::MissingLiveRow { .. } => ErrorClass::NotFound,
            Self::AmbiguousEndpointClass { .. }
            | Self::MissingEndpointColumn { .. }
            | Self::NotARelationship { .. } => ErrorClass::InvariantViolation,
        }
    }
}

impl From<ExtractError> for InternalError {
    fn from(err: ExtractError) -> Self {
        Self::extract(err)
    }
}

///
/// StoreError
///
/// Store-specific structured error detail.
/// Never returned directly; always wrapped in [`ErrorDetail::Store`].
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store corruption: {message}")]
    Corrupt { message: String },

    #[error("store invariant violation: {message}")]
    InvariantViolation { message: String },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Serialize,
    Store,
    Index,
    Extract,
    Summary,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Serialize => "serialize",
            Self::Store => "store",
            Self::Index => "index",
            Self::Extract => "extract",
            Self::Summary => "summary",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
