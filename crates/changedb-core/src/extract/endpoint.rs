use crate::{
    changeset::{ChangeRow, LiveStore},
    error::{ExtractError, InternalError},
    extract::Extractor,
    index::ChangeIndex,
    model::EndpointClassIdColumn,
    obs::sink::{EndpointSource, MetricsEvent, record},
    types::{ClassId, InstanceId, RelationshipEnd, Stage},
};
use tracing::debug;

pub const SOURCE_CLASS_ID: &str = "SourceClassId";
pub const SOURCE_INSTANCE_ID: &str = "SourceInstanceId";
pub const TARGET_CLASS_ID: &str = "TargetClassId";
pub const TARGET_INSTANCE_ID: &str = "TargetInstanceId";

/// (class id path, instance id path) of the synthetic records for `end`.
#[must_use]
pub const fn endpoint_access_paths(end: RelationshipEnd) -> (&'static str, &'static str) {
    match end {
        RelationshipEnd::Source => (SOURCE_CLASS_ID, SOURCE_INSTANCE_ID),
        RelationshipEnd::Target => (TARGET_CLASS_ID, TARGET_INSTANCE_ID),
    }
}

///
/// EndpointRef
///
/// One endpoint instance id to resolve, and where it was observed.
/// `row_instance` is the id of the row carrying the relationship.
///

#[derive(Clone, Copy, Debug)]
pub(super) struct EndpointRef {
    pub(super) relationship: ClassId,
    pub(super) end: RelationshipEnd,
    pub(super) instance_id: InstanceId,
    pub(super) stage: Stage,
    pub(super) row_instance: InstanceId,
}

impl<I, L> Extractor<'_, I, L>
where
    I: ChangeIndex,
    L: LiveStore + ?Sized,
{
    pub(super) fn instance_id_column(
        &self,
        relationship: ClassId,
        end: RelationshipEnd,
    ) -> Result<String, InternalError> {
        self.catalog
            .endpoint_instance_id_column(relationship, end)
            .ok_or_else(|| {
                ExtractError::MissingEndpointColumn {
                    relationship,
                    end,
                    what: "instance id",
                }
                .into()
            })
    }

    /// Find the class of one relationship endpoint.
    ///
    /// `Ok(None)` means no source could attribute the instance; an
    /// ambiguous virtual column is always an error.
    pub(super) fn resolve_class<R: ChangeRow>(
        &self,
        endpoint: EndpointRef,
        row: &R,
    ) -> Result<Option<ClassId>, InternalError> {
        let EndpointRef {
            relationship,
            end,
            instance_id,
            stage,
            row_instance,
        } = endpoint;

        let column = self
            .catalog
            .endpoint_class_id_column(relationship, end)
            .ok_or(ExtractError::MissingEndpointColumn {
                relationship,
                end,
                what: "class id",
            })?;

        match column {
            EndpointClassIdColumn::Virtual => {
                match self.catalog.constraint_classes(relationship, end).as_slice() {
                    [class_id] => {
                        record(MetricsEvent::EndpointResolved {
                            source: EndpointSource::Constraint,
                        });
                        Ok(Some(*class_id))
                    }
                    [] => Ok(None),
                    candidates => Err(ExtractError::AmbiguousEndpointClass {
                        relationship,
                        end,
                        candidates: candidates.len(),
                    }
                    .into()),
                }
            }

            EndpointClassIdColumn::SingleTable { table, column } => {
                let catalog = self.catalog;
                let indexed = self
                    .index
                    .class_ids_by_table_and_instance(&table, instance_id)?
                    .into_iter()
                    .find(|class_id| !catalog.is_relationship_class(*class_id));
                if let Some(class_id) = indexed {
                    record(MetricsEvent::EndpointResolved {
                        source: EndpointSource::ChangeIndex,
                    });
                    return Ok(Some(class_id));
                }

                debug!(
                    %relationship,
                    %end,
                    %instance_id,
                    table = %table,
                    "endpoint class read from live storage"
                );
                self.live_class(&table, &column, instance_id)
            }

            EndpointClassIdColumn::RowLocal { column } => {
                let visible = match stage {
                    Stage::Old => row.operation().has_old(),
                    Stage::New => row.operation().has_new(),
                };
                let changed = if visible {
                    row.value(&column, stage).and_then(|v| v.as_class_id())
                } else {
                    None
                };
                if let Some(class_id) = changed {
                    record(MetricsEvent::EndpointResolved {
                        source: EndpointSource::ChangedRow,
                    });
                    return Ok(Some(class_id));
                }

                debug!(
                    %relationship,
                    %end,
                    %instance_id,
                    column = %column,
                    "endpoint class read from live relationship row"
                );
                self.live_class(row.table_name(), &column, row_instance)
            }
        }
    }

    fn live_class(
        &self,
        table: &str,
        column: &str,
        instance_id: InstanceId,
    ) -> Result<Option<ClassId>, InternalError> {
        let class_id = self.live.class_for_table(table, column, instance_id)?;
        if class_id.is_some() {
            record(MetricsEvent::EndpointResolved {
                source: EndpointSource::LiveStore,
            });
        }

        Ok(class_id)
    }
}
