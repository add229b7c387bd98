//! ## Crate layout
//! - `core`: catalog, changeset, extraction, index, and summary runtime.
//! - `error`: public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module mirrors the surface used by host code that extracts
//! and queries change summaries.

pub use changedb_core as core;

pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        changeset::{MemoryChangeset, MemoryLiveStore, RowChange},
        config::IndexBackend,
        index::{ChangeIndex, DurableIndex, DurableMemories, SummaryIndex, TransientIndex},
        model::StaticCatalog,
        prelude::*,
    };
    pub use candid::CandidType;
    pub use serde::{Deserialize, Serialize};
}
