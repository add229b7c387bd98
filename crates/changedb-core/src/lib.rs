//! Core engine for ChangeDB: turns row-level changesets into change
//! summaries of instance and relationship deltas, and answers queries over
//! them.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod changeset;
pub mod config;
pub mod error;
pub mod extract;
pub mod function;
pub mod index;
pub mod model;
pub mod obs;
pub mod serialize;
pub mod summary;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary and the summary entry points.
///

pub mod prelude {
    pub use crate::{
        changeset::{ChangeRow, Changeset, LiveStore},
        extract::ExtractOptions,
        index::{InstanceRecord, ValueRecord},
        model::MappingCatalog,
        config::SummaryConfig,
        summary::{ChangeSummary, InstanceFilter},
        types::{ClassId, InstanceId, InstanceKey, OpMask, RelationshipEnd, RowOp},
        value::ChangeValue,
    };
}
