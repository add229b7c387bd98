use crate::{
    error::InternalError,
    index::{ChangeIndex, InstanceRecord, RecordIter, ValueRecord},
    summary::filter::ResolvedFilter,
    types::InstanceKey,
};

///
/// Instances
///
/// Lazy, restartable query over changed instances. Each call to `iter`
/// starts a fresh scan.
///

pub struct Instances<'s, I> {
    index: &'s I,
    filter: ResolvedFilter,
}

impl<'s, I: ChangeIndex> Instances<'s, I> {
    pub(super) const fn new(index: &'s I, filter: ResolvedFilter) -> Self {
        Self { index, filter }
    }

    #[must_use]
    pub fn iter(&self) -> RecordIter<'_, InstanceRecord> {
        let ops = self.filter.ops;
        let scan: RecordIter<'_, InstanceRecord> = match &self.filter.classes {
            Some(classes) => Box::new(
                classes
                    .iter()
                    .flat_map(|class_id| self.index.class_records(*class_id)),
            ),
            None => self.index.records(),
        };

        if ops.is_all() {
            return scan;
        }

        Box::new(scan.filter(move |record| match record {
            Ok(record) => ops.contains(record.op),
            Err(_) => true,
        }))
    }

    /// Number of matching instances, without collecting them.
    pub fn count(&self) -> Result<u64, InternalError> {
        self.iter().try_fold(0u64, |n, record| record.map(|_| n + 1))
    }

    pub fn to_vec(&self) -> Result<Vec<InstanceRecord>, InternalError> {
        self.iter().collect()
    }
}

impl<'a, I: ChangeIndex> IntoIterator for &'a Instances<'_, I> {
    type Item = Result<InstanceRecord, InternalError>;
    type IntoIter = RecordIter<'a, InstanceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// Values
///
/// Lazy, restartable sequence of one instance's value records.
///

pub struct Values<'s, I> {
    index: &'s I,
    key: InstanceKey,
}

impl<'s, I: ChangeIndex> Values<'s, I> {
    pub(super) const fn new(index: &'s I, key: InstanceKey) -> Self {
        Self { index, key }
    }

    #[must_use]
    pub fn iter(&self) -> RecordIter<'_, ValueRecord> {
        self.index.values(self.key)
    }

    pub fn count(&self) -> Result<u64, InternalError> {
        self.iter().try_fold(0u64, |n, record| record.map(|_| n + 1))
    }

    pub fn to_vec(&self) -> Result<Vec<ValueRecord>, InternalError> {
        self.iter().collect()
    }
}

impl<'a, I: ChangeIndex> IntoIterator for &'a Values<'_, I> {
    type Item = Result<ValueRecord, InternalError>;
    type IntoIter = RecordIter<'a, ValueRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
