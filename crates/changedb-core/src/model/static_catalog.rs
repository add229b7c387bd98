use crate::{
    model::{EndpointClassIdColumn, MappingCatalog, PropertyColumn, RelationshipShape},
    types::{ClassId, RelationshipEnd},
};
use std::collections::{BTreeMap, BTreeSet};

///
/// ClassDef
///
/// One entity class: display name, direct bases and the columns its
/// properties occupy, keyed by the table that stores them.
///

#[derive(Clone, Debug)]
pub struct ClassDef {
    id: ClassId,
    name: String,
    bases: Vec<ClassId>,
    properties: Vec<(String, PropertyColumn)>,
}

impl ClassDef {
    #[must_use]
    pub fn new(id: ClassId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bases: Vec::new(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn base(mut self, base: ClassId) -> Self {
        self.bases.push(base);
        self
    }

    #[must_use]
    pub fn property(
        mut self,
        table: impl Into<String>,
        access_path: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.properties
            .push((table.into(), PropertyColumn::new(access_path, column)));
        self
    }
}

///
/// EndDef
///
/// Physical mapping of one relationship end.
///

#[derive(Clone, Debug, Default)]
pub struct EndDef {
    instance_id_column: Option<String>,
    class_id_column: Option<EndpointClassIdColumn>,
    constraint: Vec<ClassId>,
}

impl EndDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn instance_id_column(mut self, column: impl Into<String>) -> Self {
        self.instance_id_column = Some(column.into());
        self
    }

    /// The end's class id is not stored; it follows from the constraint.
    #[must_use]
    pub fn virtual_class_id(mut self) -> Self {
        self.class_id_column = Some(EndpointClassIdColumn::Virtual);
        self
    }

    /// The end's class id lives in the class-id column of one other table.
    #[must_use]
    pub fn class_id_in_table(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.class_id_column = Some(EndpointClassIdColumn::SingleTable {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// The end's class id is carried on the relationship's own row.
    #[must_use]
    pub fn class_id_in_row(mut self, column: impl Into<String>) -> Self {
        self.class_id_column = Some(EndpointClassIdColumn::RowLocal {
            column: column.into(),
        });
        self
    }

    #[must_use]
    pub fn constraint(mut self, class_id: ClassId) -> Self {
        self.constraint.push(class_id);
        self
    }
}

///
/// RelationshipDef
///
/// A relationship class together with its storage shape.
/// `table` is the link table, or the entity table holding the foreign key.
///

#[derive(Clone, Debug)]
pub struct RelationshipDef {
    class: ClassDef,
    shape: RelationshipShape,
    table: String,
    navigation: Option<String>,
    source: EndDef,
    target: EndDef,
}

impl RelationshipDef {
    #[must_use]
    pub fn link_table(id: ClassId, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::with_shape(id, name, RelationshipShape::LinkTable, table)
    }

    /// Relationship stored as a foreign key in the table of `foreign_end`.
    #[must_use]
    pub fn foreign_key(
        id: ClassId,
        name: impl Into<String>,
        foreign_end: RelationshipEnd,
        table: impl Into<String>,
    ) -> Self {
        let shape = match foreign_end {
            RelationshipEnd::Source => RelationshipShape::ForeignKeyOnSource,
            RelationshipEnd::Target => RelationshipShape::ForeignKeyOnTarget,
        };

        Self::with_shape(id, name, shape, table)
    }

    fn with_shape(
        id: ClassId,
        name: impl Into<String>,
        shape: RelationshipShape,
        table: impl Into<String>,
    ) -> Self {
        Self {
            class: ClassDef::new(id, name),
            shape,
            table: table.into(),
            navigation: None,
            source: EndDef::default(),
            target: EndDef::default(),
        }
    }

    #[must_use]
    pub fn source(mut self, end: EndDef) -> Self {
        self.source = end;
        self
    }

    #[must_use]
    pub fn target(mut self, end: EndDef) -> Self {
        self.target = end;
        self
    }

    /// Navigation property of a foreign-key relationship on the entity
    /// that holds the key.
    #[must_use]
    pub fn navigation(mut self, access_path: impl Into<String>) -> Self {
        self.navigation = Some(access_path.into());
        self
    }

    /// Relationship property stored alongside the relationship's table.
    #[must_use]
    pub fn property(mut self, access_path: impl Into<String>, column: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.class = self.class.property(table, access_path, column);
        self
    }

    const fn end(&self, end: RelationshipEnd) -> &EndDef {
        match end {
            RelationshipEnd::Source => &self.source,
            RelationshipEnd::Target => &self.target,
        }
    }
}

///
/// StaticCatalog
///
/// In-memory mapping catalog assembled up front with a builder.
///

#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    classes: BTreeMap<ClassId, ClassDef>,
    relationships: BTreeMap<ClassId, RelationshipDef>,
    schema_tables: BTreeSet<String>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.classes.insert(class.id, class);
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        let id = relationship.class.id;
        self.classes.insert(id, relationship.class.clone());
        self.relationships.insert(id, relationship);
        self
    }

    #[must_use]
    pub fn with_schema_table(mut self, table: impl Into<String>) -> Self {
        self.schema_tables.insert(table.into());
        self
    }

    fn relationship(&self, class_id: ClassId) -> Option<&RelationshipDef> {
        self.relationships.get(&class_id)
    }
}

impl MappingCatalog for StaticCatalog {
    fn class_name(&self, class_id: ClassId) -> Option<String> {
        self.classes.get(&class_id).map(|class| class.name.clone())
    }

    fn is_relationship_class(&self, class_id: ClassId) -> bool {
        self.relationships.contains_key(&class_id)
    }

    fn relationship_shape(&self, class_id: ClassId) -> Option<RelationshipShape> {
        self.relationship(class_id).map(|rel| rel.shape)
    }

    // Inherited properties are included when they share the table.
    fn property_columns(&self, class_id: ClassId, table: &str) -> Vec<PropertyColumn> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![class_id];

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(class) = self.classes.get(&current) else {
                continue;
            };
            out.extend(
                class
                    .properties
                    .iter()
                    .filter(|(t, _)| t == table)
                    .map(|(_, column)| column.clone()),
            );
            stack.extend(class.bases.iter().rev().copied());
        }

        out
    }

    fn foreign_key_relationships(&self, table: &str) -> Vec<ClassId> {
        self.relationships
            .values()
            .filter(|rel| rel.shape.foreign_end().is_some() && rel.table == table)
            .map(|rel| rel.class.id)
            .collect()
    }

    fn navigation_access_path(&self, relationship: ClassId) -> Option<String> {
        self.relationship(relationship)?.navigation.clone()
    }

    fn endpoint_instance_id_column(
        &self,
        relationship: ClassId,
        end: RelationshipEnd,
    ) -> Option<String> {
        self.relationship(relationship)?
            .end(end)
            .instance_id_column
            .clone()
    }

    fn endpoint_class_id_column(
        &self,
        relationship: ClassId,
        end: RelationshipEnd,
    ) -> Option<EndpointClassIdColumn> {
        self.relationship(relationship)?
            .end(end)
            .class_id_column
            .clone()
    }

    fn constraint_classes(&self, relationship: ClassId, end: RelationshipEnd) -> Vec<ClassId> {
        self.relationship(relationship)
            .map(|rel| rel.end(end).constraint.clone())
            .unwrap_or_default()
    }

    fn base_classes(&self, class_id: ClassId) -> Vec<ClassId> {
        self.classes
            .get(&class_id)
            .map(|class| class.bases.clone())
            .unwrap_or_default()
    }

    fn derived_classes(&self, class_id: ClassId) -> Vec<ClassId> {
        self.classes
            .values()
            .filter(|class| class.bases.contains(&class_id))
            .map(|class| class.id)
            .collect()
    }

    fn is_schema_table(&self, table: &str) -> bool {
        self.schema_tables.contains(table)
    }
}
