use crate::{
    config::IndexBackend,
    error::InternalError,
    index::{
        DurableIndex, InstanceIndex, InstanceRecord, RecordIter, TransientIndex, ValueIndex,
        ValueRecord,
    },
    types::{ClassId, InstanceId, InstanceKey, RowOp},
};
use canic_cdk::structures::{DefaultMemoryImpl, memory::VirtualMemory};
use tracing::warn;

///
/// DurableMemories
///
/// Stable memories holding one durable change cache.
///

pub struct DurableMemories {
    pub instances: VirtualMemory<DefaultMemoryImpl>,
    pub values: VirtualMemory<DefaultMemoryImpl>,
    pub tables: VirtualMemory<DefaultMemoryImpl>,
}

impl DurableMemories {
    /// Open the cache and discard whatever a previous summary left behind.
    #[must_use]
    pub fn into_cleared_index(self) -> DurableIndex {
        let mut index = DurableIndex::init(self.instances, self.values, self.tables);
        index.clear();

        index
    }
}

///
/// SummaryIndex
///
/// Index whose backend is picked at runtime from [`IndexBackend`].
///

pub enum SummaryIndex {
    Transient(TransientIndex),
    Durable(DurableIndex),
}

impl SummaryIndex {
    /// Build the index named by `backend`. The durable backend needs its
    /// stable memories; the transient one ignores them.
    pub fn open(
        backend: IndexBackend,
        memories: Option<DurableMemories>,
    ) -> Result<Self, InternalError> {
        match (backend, memories) {
            (IndexBackend::Transient, memories) => {
                if memories.is_some() {
                    warn!("transient change index ignores the stable memories it was given");
                }

                Ok(Self::Transient(TransientIndex::new()))
            }
            (IndexBackend::Durable, Some(memories)) => {
                Ok(Self::Durable(memories.into_cleared_index()))
            }
            (IndexBackend::Durable, None) => Err(InternalError::config_unsupported(
                "durable index backend needs stable memories",
            )),
        }
    }

    #[must_use]
    pub const fn backend(&self) -> IndexBackend {
        match self {
            Self::Transient(_) => IndexBackend::Transient,
            Self::Durable(_) => IndexBackend::Durable,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $index:ident => $body:expr) => {
        match $self {
            Self::Transient($index) => $body,
            Self::Durable($index) => $body,
        }
    };
}

impl InstanceIndex for SummaryIndex {
    fn query(&self, key: InstanceKey) -> Result<Option<InstanceRecord>, InternalError> {
        dispatch!(self, index => index.query(key))
    }

    fn insert(&mut self, record: InstanceRecord) -> Result<(), InternalError> {
        dispatch!(self, index => index.insert(record))
    }

    fn update_operation(
        &mut self,
        key: InstanceKey,
        op: RowOp,
        indirect: bool,
    ) -> Result<(), InternalError> {
        dispatch!(self, index => index.update_operation(key, op, indirect))
    }

    fn delete(&mut self, key: InstanceKey) -> Result<(), InternalError> {
        dispatch!(self, index => index.delete(key))
    }

    fn class_ids_by_table_and_instance(
        &self,
        table: &str,
        instance_id: InstanceId,
    ) -> Result<Vec<ClassId>, InternalError> {
        dispatch!(self, index => index.class_ids_by_table_and_instance(table, instance_id))
    }

    fn records(&self) -> RecordIter<'_, InstanceRecord> {
        dispatch!(self, index => index.records())
    }

    fn class_records(&self, class_id: ClassId) -> RecordIter<'_, InstanceRecord> {
        dispatch!(self, index => index.class_records(class_id))
    }

    fn instance_count(&self) -> u64 {
        dispatch!(self, index => index.instance_count())
    }
}

impl ValueIndex for SummaryIndex {
    fn insert_value(&mut self, record: ValueRecord) -> Result<(), InternalError> {
        dispatch!(self, index => index.insert_value(record))
    }

    fn query_value(
        &self,
        key: InstanceKey,
        access_path: &str,
    ) -> Result<Option<ValueRecord>, InternalError> {
        dispatch!(self, index => index.query_value(key, access_path))
    }

    fn values(&self, key: InstanceKey) -> RecordIter<'_, ValueRecord> {
        dispatch!(self, index => index.values(key))
    }

    fn value_count(&self) -> u64 {
        dispatch!(self, index => index.value_count())
    }
}
