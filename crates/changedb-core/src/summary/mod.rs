//! The change summary: one instance index and one value index, populated
//! once by an extraction run and read back through queries.

mod diagnostics;
mod filter;
mod iter;
mod projection;


use crate::{
    changeset::{Changeset, LiveStore},
    error::InternalError,
    extract::{ExtractOptions, ExtractStats, Extractor},
    config::SummaryConfig,
    index::{
        ChangeIndex, DurableIndex, DurableMemories, InstanceRecord, SummaryIndex, TransientIndex,
        ValueRecord,
    },
    model::MappingCatalog,
    types::{ClassId, InstanceId, InstanceKey, OpMask},
    value::ChangeValue,
};
use canic_cdk::structures::{DefaultMemoryImpl, memory::VirtualMemory};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::warn;

static NEXT_SUMMARY_ID: AtomicU64 = AtomicU64::new(1);

// re-exports
pub use filter::InstanceFilter;
pub use iter::{Instances, Values};
pub use projection::{InstanceChangeRow, ValueChangeRow};

///
/// ChangeSummary
///
/// Write-once view of one changeset. Later changesets go into a fresh
/// summary; nothing is consolidated across runs.
///

pub struct ChangeSummary<'c, I> {
    id: u64,
    catalog: &'c dyn MappingCatalog,
    index: I,
    extracted: bool,
}

impl<'c> ChangeSummary<'c, TransientIndex> {
    /// Summary backed by session-scoped, in-process indices.
    #[must_use]
    pub fn transient(catalog: &'c dyn MappingCatalog) -> Self {
        Self::new(catalog, TransientIndex::new())
    }
}

impl<'c> ChangeSummary<'c, DurableIndex> {
    /// Summary backed by the durable change cache. Existing contents of the
    /// memories are discarded.
    #[must_use]
    pub fn durable(
        catalog: &'c dyn MappingCatalog,
        instances: VirtualMemory<DefaultMemoryImpl>,
        values: VirtualMemory<DefaultMemoryImpl>,
        tables: VirtualMemory<DefaultMemoryImpl>,
    ) -> Self {
        let memories = DurableMemories {
            instances,
            values,
            tables,
        };

        Self::new(catalog, memories.into_cleared_index())
    }
}

impl<'c> ChangeSummary<'c, SummaryIndex> {
    /// Summary on the backend named by `config`. `memories` are required
    /// when that backend is durable.
    pub fn from_config(
        catalog: &'c dyn MappingCatalog,
        config: &SummaryConfig,
        memories: Option<DurableMemories>,
    ) -> Result<Self, InternalError> {
        let index = SummaryIndex::open(config.backend, memories)?;

        Ok(Self::new(catalog, index))
    }
}

impl<'c, I: ChangeIndex> ChangeSummary<'c, I> {
    #[must_use]
    pub fn new(catalog: &'c dyn MappingCatalog, index: I) -> Self {
        Self {
            id: NEXT_SUMMARY_ID.fetch_add(1, Ordering::Relaxed),
            catalog,
            index,
            extracted: false,
        }
    }

    /// Populate the summary from one changeset.
    ///
    /// On error the summary is unusable and must be rebuilt from scratch.
    pub fn extract<C, L>(
        &mut self,
        changeset: &C,
        live: &L,
        options: ExtractOptions,
    ) -> Result<ExtractStats, InternalError>
    where
        C: Changeset,
        L: LiveStore + ?Sized,
    {
        if self.extracted {
            return Err(InternalError::summary_invariant(
                "change summary already extracted; build a new summary per changeset",
            ));
        }
        self.extracted = true;

        let id = self.id;
        Extractor::new(self.catalog, live, &mut self.index, options)
            .run(changeset)
            .inspect_err(|err| {
                warn!(
                    summary = id,
                    error = %err.display_with_class(),
                    "change extraction failed"
                );
            })
    }

    /// Process-unique id, passed as the first scalar-function argument.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub const fn is_extracted(&self) -> bool {
        self.extracted
    }

    #[must_use]
    pub fn catalog(&self) -> &'c dyn MappingCatalog {
        self.catalog
    }

    #[must_use]
    pub const fn index(&self) -> &I {
        &self.index
    }

    pub fn contains_instance(&self, key: InstanceKey) -> Result<bool, InternalError> {
        self.index.contains(key)
    }

    pub fn instance(&self, key: InstanceKey) -> Result<Option<InstanceRecord>, InternalError> {
        self.index.query(key)
    }

    /// Changed instances matching `filter`; restartable.
    #[must_use]
    pub fn instances(&self, filter: &InstanceFilter) -> Instances<'_, I> {
        Instances::new(&self.index, filter.resolve(self.catalog))
    }

    /// Value records of one instance; restartable.
    #[must_use]
    pub const fn values(&self, key: InstanceKey) -> Values<'_, I> {
        Values::new(&self.index, key)
    }

    pub fn value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ValueRecord>, InternalError> {
        self.index.query_value(key, access_path)
    }

    pub fn old_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ChangeValue>, InternalError> {
        Ok(self.value(key, access_path)?.and_then(|record| record.old))
    }

    pub fn new_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ChangeValue>, InternalError> {
        Ok(self.value(key, access_path)?.and_then(|record| record.new))
    }

    pub fn contains_value(&self, key: InstanceKey, access_path: &str) -> Result<bool, InternalError> {
        Ok(self.value(key, access_path)?.is_some())
    }

    /// Changed instances of a class keyed by instance id.
    pub fn query_by_class(
        &self,
        class_id: ClassId,
        polymorphic: bool,
        ops: OpMask,
    ) -> Result<BTreeMap<InstanceId, InstanceRecord>, InternalError> {
        let filter = if polymorphic {
            InstanceFilter::class(class_id)
        } else {
            InstanceFilter::exact_class(class_id)
        }
        .ops(ops);

        self.instances(&filter)
            .iter()
            .map(|record| record.map(|r| (r.instance_id(), r)))
            .collect()
    }

    /// Point predicate over (class id, instance id); invalid ids never match.
    pub fn is_changed_instance(
        &self,
        class_id: ClassId,
        instance_id: InstanceId,
    ) -> Result<bool, InternalError> {
        match InstanceKey::new(class_id, instance_id).valid() {
            Some(key) => self.contains_instance(key),
            None => Ok(false),
        }
    }
}
