//! Change extraction: turns a row-level changeset into instance and value
//! records.
//!
//! Two sequential passes over the changeset. The entity pass records every
//! non-relationship instance; the relationship pass then rebuilds link-table
//! and foreign-key relationships, resolving endpoint classes against what the
//! entity pass already indexed before falling back to live storage.

mod endpoint;
mod record;
mod relation;

#[cfg(test)]
mod tests;

use crate::{
    changeset::{ChangeRow, Changeset, LiveStore},
    error::{ExtractError, InternalError},
    index::{ChangeIndex, UpsertOutcome},
    model::MappingCatalog,
    obs::sink::{MetricsEvent, Span, record},
    types::{InstanceKey, RowOp},
};
use tracing::{debug, warn};

// re-exports
pub use endpoint::{
    SOURCE_CLASS_ID, SOURCE_INSTANCE_ID, TARGET_CLASS_ID, TARGET_INSTANCE_ID,
    endpoint_access_paths,
};
pub use relation::derive_relationship_op;

///
/// ExtractOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtractOptions {
    /// Run the relationship pass after the entity pass.
    pub include_relationships: bool,

    /// Fail on an unresolvable foreign-key other end instead of skipping it.
    pub strict_endpoints: bool,

    /// Fail when an updated row is missing from live storage.
    pub require_live_rows: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_relationships: true,
            strict_endpoints: true,
            require_live_rows: true,
        }
    }
}

///
/// ExtractStats
///
/// Per-run counters returned to the caller.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExtractStats {
    pub rows_visited: u64,
    pub rows_skipped: u64,
    pub vacuous_updates_dropped: u64,
    pub relationships_recorded: u64,
    pub endpoints_skipped: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Pass {
    Entities,
    Relationships,
}

///
/// Extractor
///
/// One extraction run over one changeset into one index.
/// On error the index is left in an unspecified state and must be dropped.
///

pub struct Extractor<'a, I, L: ?Sized> {
    catalog: &'a dyn MappingCatalog,
    live: &'a L,
    index: &'a mut I,
    options: ExtractOptions,
    stats: ExtractStats,
}

impl<'a, I, L> Extractor<'a, I, L>
where
    I: ChangeIndex,
    L: LiveStore + ?Sized,
{
    #[must_use]
    pub fn new(
        catalog: &'a dyn MappingCatalog,
        live: &'a L,
        index: &'a mut I,
        options: ExtractOptions,
    ) -> Self {
        Self {
            catalog,
            live,
            index,
            options,
            stats: ExtractStats::default(),
        }
    }

    /// Run both passes; stops at the first failing row.
    pub fn run<C: Changeset>(mut self, changeset: &C) -> Result<ExtractStats, InternalError> {
        let mut span = Span::new();

        debug!("change extraction: entity pass");
        for row in changeset.rows() {
            span.add_row();
            self.stats.rows_visited += 1;
            self.entity_row(row)?;
        }

        if self.options.include_relationships {
            debug!("change extraction: relationship pass");
            for row in changeset.rows() {
                self.relationship_row(row)?;
            }
        }

        let instances = self.index.instance_count();
        let values = self.index.value_count();
        span.complete(instances, values);
        debug!(instances, values, "change extraction finished");

        Ok(self.stats)
    }

    /// Attribute a row to its primary instance, or skip it.
    fn admit<R: ChangeRow>(
        &mut self,
        row: &R,
        pass: Pass,
    ) -> Result<Option<InstanceKey>, InternalError> {
        let table = row.table_name();

        if self.catalog.is_schema_table(table) {
            return Err(ExtractError::SchemaTableChanged {
                table: table.to_string(),
            }
            .into());
        }

        if !row.is_mapped() {
            if pass == Pass::Entities {
                warn!(table, "skipping changed row of unmapped table");
                record(MetricsEvent::RowSkipped);
                self.stats.rows_skipped += 1;
            }
            return Ok(None);
        }

        row.primary_class()
            .zip(row.primary_instance_id())
            .map(|(class_id, instance_id)| InstanceKey::new(class_id, instance_id))
            .and_then(InstanceKey::valid)
            .map(Some)
            .ok_or_else(|| {
                ExtractError::UnresolvablePrimaryInstance {
                    table: table.to_string(),
                }
                .into()
            })
    }

    fn entity_row<R: ChangeRow>(&mut self, row: &R) -> Result<(), InternalError> {
        let Some(key) = self.admit(row, Pass::Entities)? else {
            return Ok(());
        };
        let op = row.operation();
        let table = row.table_name();

        if op == RowOp::Update
            && self.options.require_live_rows
            && !self.live.row_exists(table, key.instance_id)?
        {
            return Err(ExtractError::MissingLiveRow {
                table: table.to_string(),
                instance_id: key.instance_id,
            }
            .into());
        }

        if self.catalog.is_relationship_class(key.class_id) {
            return Ok(());
        }

        let outcome = self.index.upsert(key, op, row.is_indirect(), table)?;
        let properties = self.record_properties(key, op, row)?;
        let foreign_keys = self.record_foreign_keys(key, row)?;

        // an update that changed nothing observable is not a change
        if op == RowOp::Update
            && outcome == UpsertOutcome::Inserted
            && !(properties || foreign_keys)
        {
            self.index.delete(key)?;
            record(MetricsEvent::VacuousUpdateDropped);
            self.stats.vacuous_updates_dropped += 1;
        }

        Ok(())
    }
}
