use crate::types::{ClassId, RelationshipEnd};

///
/// RelationshipShape
///
/// Physical layout of a relationship class.
/// Foreign-key shapes name the end whose table holds the key column.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationshipShape {
    LinkTable,
    ForeignKeyOnSource,
    ForeignKeyOnTarget,
}

impl RelationshipShape {
    /// End whose row carries the foreign key, if any.
    #[must_use]
    pub const fn foreign_end(self) -> Option<RelationshipEnd> {
        match self {
            Self::LinkTable => None,
            Self::ForeignKeyOnSource => Some(RelationshipEnd::Source),
            Self::ForeignKeyOnTarget => Some(RelationshipEnd::Target),
        }
    }
}

///
/// EndpointClassIdColumn
///
/// Where the class id of a relationship endpoint lives.
///
/// - `Virtual`: not persisted; the end can only reference one class.
/// - `SingleTable`: the class-id column of the one table the end maps to.
/// - `RowLocal`: a class-id column on the relationship's own row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EndpointClassIdColumn {
    Virtual,
    SingleTable { table: String, column: String },
    RowLocal { column: String },
}

///
/// PropertyColumn
///
/// One non-system property of a class and the physical column holding it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyColumn {
    pub access_path: String,
    pub column: String,
}

impl PropertyColumn {
    #[must_use]
    pub fn new(access_path: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            access_path: access_path.into(),
            column: column.into(),
        }
    }
}

///
/// MappingCatalog
///
/// Read-only view of the class-to-table mapping.
/// Implementations are expected to be cheap to query repeatedly; the
/// extractor calls into them once per changed row.
///

pub trait MappingCatalog {
    /// Fully qualified class name, used only for diagnostics.
    fn class_name(&self, class_id: ClassId) -> Option<String>;

    fn is_relationship_class(&self, class_id: ClassId) -> bool;

    /// Storage shape of a relationship class; `None` for entity classes.
    fn relationship_shape(&self, class_id: ClassId) -> Option<RelationshipShape>;

    /// Properties of `class_id` stored in `table`, excluding system columns.
    fn property_columns(&self, class_id: ClassId, table: &str) -> Vec<PropertyColumn>;

    /// Relationship classes persisted as a foreign key column in `table`.
    fn foreign_key_relationships(&self, table: &str) -> Vec<ClassId>;

    /// Access path of the navigation property through which the entity
    /// holding a foreign key exposes it. `None` falls back to the column.
    fn navigation_access_path(&self, _relationship: ClassId) -> Option<String> {
        None
    }

    /// Column holding the instance id of one relationship endpoint.
    fn endpoint_instance_id_column(
        &self,
        relationship: ClassId,
        end: RelationshipEnd,
    ) -> Option<String>;

    /// Column holding the class id of one relationship endpoint.
    fn endpoint_class_id_column(
        &self,
        relationship: ClassId,
        end: RelationshipEnd,
    ) -> Option<EndpointClassIdColumn>;

    /// Classes listed by the relationship constraint at `end`.
    fn constraint_classes(&self, relationship: ClassId, end: RelationshipEnd) -> Vec<ClassId>;

    /// Direct base classes.
    fn base_classes(&self, class_id: ClassId) -> Vec<ClassId>;

    /// Direct subclasses.
    fn derived_classes(&self, class_id: ClassId) -> Vec<ClassId>;

    /// Tables that hold schema metadata rather than instance data.
    fn is_schema_table(&self, _table: &str) -> bool {
        false
    }
}
