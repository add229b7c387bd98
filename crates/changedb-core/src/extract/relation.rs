use crate::{
    changeset::{ChangeRow, LiveStore},
    error::{ExtractError, InternalError},
    extract::{
        Extractor, Pass,
        endpoint::EndpointRef,
        record::EndpointPair,
    },
    index::ChangeIndex,
    model::{RelationshipShape, class_satisfies_constraint},
    obs::sink::{MetricsEvent, record},
    types::{ClassId, InstanceId, InstanceKey, RelationshipEnd, RowOp, Stage},
};
use tracing::{debug, warn};

/// Relationship operation implied by the validity of the other end before
/// and after the change. `None` when neither side names an object.
#[must_use]
pub const fn derive_relationship_op(old_valid: bool, new_valid: bool) -> Option<RowOp> {
    match (old_valid, new_valid) {
        (false, true) => Some(RowOp::Insert),
        (true, false) => Some(RowOp::Delete),
        (true, true) => Some(RowOp::Update),
        (false, false) => None,
    }
}

impl<I, L> Extractor<'_, I, L>
where
    I: ChangeIndex,
    L: LiveStore + ?Sized,
{
    pub(super) fn relationship_row<R: ChangeRow>(&mut self, row: &R) -> Result<(), InternalError> {
        let Some(key) = self.admit(row, Pass::Relationships)? else {
            return Ok(());
        };

        if !self.catalog.is_relationship_class(key.class_id) {
            for relationship in self.catalog.foreign_key_relationships(row.table_name()) {
                self.foreign_key_row(relationship, key, row)?;
            }
            return Ok(());
        }

        match self.catalog.relationship_shape(key.class_id) {
            Some(RelationshipShape::LinkTable) => self.link_table_row(key, row),
            Some(shape) => {
                debug!(
                    class_id = %key.class_id,
                    ?shape,
                    "foreign-key relationship class owns no rows"
                );
                Ok(())
            }
            None => Err(ExtractError::NotARelationship {
                class_id: key.class_id,
            }
            .into()),
        }
    }

    /// The row is the relationship instance.
    fn link_table_row<R: ChangeRow>(
        &mut self,
        key: InstanceKey,
        row: &R,
    ) -> Result<(), InternalError> {
        let op = row.operation();
        let source = self.link_endpoint(key, RelationshipEnd::Source, row)?;
        let target = self.link_endpoint(key, RelationshipEnd::Target, row)?;

        // a pure endpoint swap is a change even with no property diff
        self.index.upsert(key, op, row.is_indirect(), row.table_name())?;
        self.record_endpoints(key, source, target)?;
        self.record_properties(key, op, row)?;
        self.relationship_recorded(RelationshipShape::LinkTable);

        Ok(())
    }

    fn link_endpoint<R: ChangeRow>(
        &self,
        key: InstanceKey,
        end: RelationshipEnd,
        row: &R,
    ) -> Result<EndpointPair, InternalError> {
        let relationship = key.class_id;
        let column = self.instance_id_column(relationship, end)?;
        let op = row.operation();

        let (old_id, new_id) = if op == RowOp::Update && !row.contains_column(&column) {
            let current = self
                .live
                .read_value(row.table_name(), &column, key.instance_id)?
                .and_then(|v| v.as_instance_id());
            (current, current)
        } else {
            (
                read_instance_id(row, &column, Stage::Old),
                read_instance_id(row, &column, Stage::New),
            )
        };

        let resolve = |instance_id: Option<InstanceId>, stage| -> Result<_, InternalError> {
            let Some(instance_id) = instance_id else {
                return Ok(InstanceKey::invalid());
            };
            let endpoint = EndpointRef {
                relationship,
                end,
                instance_id,
                stage,
                row_instance: key.instance_id,
            };

            match self.resolve_class(endpoint, row)? {
                Some(class_id) => Ok(InstanceKey::new(class_id, instance_id)),
                None => Err(ExtractError::UnresolvableEndpointClass {
                    relationship,
                    end,
                    instance_id,
                }
                .into()),
            }
        };

        Ok(EndpointPair {
            old: resolve(old_id, Stage::Old)?,
            new: resolve(new_id, Stage::New)?,
        })
    }

    /// An entity row holding the foreign key of `relationship`.
    fn foreign_key_row<R: ChangeRow>(
        &mut self,
        relationship: ClassId,
        this: InstanceKey,
        row: &R,
    ) -> Result<(), InternalError> {
        let Some(shape) = self.catalog.relationship_shape(relationship) else {
            return Err(ExtractError::NotARelationship {
                class_id: relationship,
            }
            .into());
        };
        let Some(foreign_end) = shape.foreign_end() else {
            return Ok(());
        };

        // polymorphic tables can hold rows the relationship does not apply to
        if !class_satisfies_constraint(self.catalog, relationship, foreign_end, this.class_id) {
            return Ok(());
        }

        let other_end = foreign_end.opposite();
        let column = self.instance_id_column(relationship, other_end)?;
        let old_id = read_instance_id(row, &column, Stage::Old);
        let new_id = read_instance_id(row, &column, Stage::New);
        if old_id.is_none() && new_id.is_none() {
            return Ok(());
        }

        let other = |instance_id, stage| EndpointRef {
            relationship,
            end: other_end,
            instance_id,
            stage,
            row_instance: this.instance_id,
        };
        let Some(old_other) = self.other_end_key(old_id.map(|id| other(id, Stage::Old)), row)?
        else {
            return Ok(());
        };
        let Some(new_other) = self.other_end_key(new_id.map(|id| other(id, Stage::New)), row)?
        else {
            return Ok(());
        };

        let Some(op) = derive_relationship_op(old_other.is_valid(), new_other.is_valid()) else {
            return Ok(());
        };
        let this_pair = EndpointPair {
            old: if op == RowOp::Insert {
                InstanceKey::invalid()
            } else {
                this
            },
            new: if op == RowOp::Delete {
                InstanceKey::invalid()
            } else {
                this
            },
        };
        let other_pair = EndpointPair {
            old: old_other,
            new: new_other,
        };
        let (source, target) = match foreign_end {
            RelationshipEnd::Source => (this_pair, other_pair),
            RelationshipEnd::Target => (other_pair, this_pair),
        };

        let key = InstanceKey::new(relationship, this.instance_id);
        self.index.upsert(key, op, row.is_indirect(), row.table_name())?;
        self.record_endpoints(key, source, target)?;
        self.record_properties(key, op, row)?;
        self.relationship_recorded(shape);

        Ok(())
    }

    /// Resolve the referenced end of a foreign-key relationship.
    ///
    /// `Ok(None)` skips the relationship: the referenced class falls outside
    /// the constraint, or it is unresolvable and endpoints are lenient.
    fn other_end_key<R: ChangeRow>(
        &mut self,
        endpoint: Option<EndpointRef>,
        row: &R,
    ) -> Result<Option<InstanceKey>, InternalError> {
        let Some(endpoint) = endpoint else {
            return Ok(Some(InstanceKey::invalid()));
        };
        let EndpointRef {
            relationship,
            end,
            instance_id,
            ..
        } = endpoint;

        match self.resolve_class(endpoint, row)? {
            Some(class_id)
                if class_satisfies_constraint(self.catalog, relationship, end, class_id) =>
            {
                Ok(Some(InstanceKey::new(class_id, instance_id)))
            }
            Some(class_id) => {
                debug!(
                    %relationship,
                    %end,
                    %class_id,
                    "referenced class outside relationship constraint"
                );
                Ok(None)
            }
            None if self.options.strict_endpoints => {
                Err(ExtractError::UnresolvableEndpointClass {
                    relationship,
                    end,
                    instance_id,
                }
                .into())
            }
            None => {
                warn!(
                    %relationship,
                    %end,
                    %instance_id,
                    "skipping relationship with unresolvable endpoint class"
                );
                record(MetricsEvent::EndpointSkipped);
                self.stats.endpoints_skipped += 1;
                Ok(None)
            }
        }
    }

    /// Whether the row moves one of its foreign keys to another object.
    /// Foreign-key columns in the row's table that point away from `this`,
    /// one per relationship whose constraint the instance satisfies.
    pub(super) fn held_foreign_keys(
        &self,
        this: InstanceKey,
        table: &str,
    ) -> Vec<(ClassId, String)> {
        self.catalog
            .foreign_key_relationships(table)
            .into_iter()
            .filter_map(|relationship| {
                let foreign_end = self
                    .catalog
                    .relationship_shape(relationship)
                    .and_then(RelationshipShape::foreign_end)?;
                if !class_satisfies_constraint(self.catalog, relationship, foreign_end, this.class_id)
                {
                    return None;
                }

                self.catalog
                    .endpoint_instance_id_column(relationship, foreign_end.opposite())
                    .map(|column| (relationship, column))
            })
            .collect()
    }

    fn relationship_recorded(&mut self, shape: RelationshipShape) {
        record(MetricsEvent::RelationshipRecorded { shape });
        self.stats.relationships_recorded += 1;
    }
}

/// Instance id in `column` at `stage`, honoring which images the row
/// operation carries.
pub(super) fn read_instance_id<R: ChangeRow>(
    row: &R,
    column: &str,
    stage: Stage,
) -> Option<InstanceId> {
    let visible = match stage {
        Stage::Old => row.operation().has_old(),
        Stage::New => row.operation().has_new(),
    };
    if !visible {
        return None;
    }

    row.value(column, stage).and_then(|v| v.as_instance_id())
}
