use crate::{
    index::DurableIndex,
    model::{ClassDef, EndDef, RelationshipDef, StaticCatalog},
    types::{ClassId, InstanceId, InstanceKey, RelationshipEnd},
};
use canic_cdk::structures::{
    DefaultMemoryImpl,
    memory::{MemoryId, MemoryManager, VirtualMemory},
};

// Entity classes.
pub(crate) const ELEMENT: ClassId = ClassId::new(10);
pub(crate) const PHYSICAL: ClassId = ClassId::new(11);
pub(crate) const MODEL: ClassId = ClassId::new(20);
pub(crate) const ASPECT: ClassId = ClassId::new(30);

// Link-table relationships.
pub(crate) const ELEMENT_REFERS: ClassId = ClassId::new(40);
pub(crate) const MODEL_HAS_ASPECTS: ClassId = ClassId::new(41);
pub(crate) const AMBIGUOUS_LINK: ClassId = ClassId::new(42);

// Foreign-key relationships stored on `elements`.
pub(crate) const MODEL_CONTAINS_ELEMENTS: ClassId = ClassId::new(50);
pub(crate) const ELEMENT_OWNS_CHILDREN: ClassId = ClassId::new(51);

pub(crate) const ELEMENTS: &str = "elements";
pub(crate) const MODELS: &str = "models";
pub(crate) const ASPECTS: &str = "aspects";
pub(crate) const ELEMENT_REFS: &str = "element_refs";
pub(crate) const MODEL_ASPECTS: &str = "model_aspects";
pub(crate) const AMBIGUOUS_LINKS: &str = "ambiguous_links";
pub(crate) const SCHEMA_TABLE: &str = "ec_Class";

pub(crate) const fn iid(raw: u64) -> InstanceId {
    InstanceId::new(raw)
}

pub(crate) const fn key(class_id: ClassId, raw: u64) -> InstanceKey {
    InstanceKey::new(class_id, InstanceId::new(raw))
}

/// Small element/model/aspect schema covering every endpoint mapping.
///
/// `elements` holds Element and PhysicalElement rows plus two foreign keys:
/// `ModelId` (class read from the `models` table) and `ParentId` (class
/// carried in the row-local `ParentClassId` column, constrained to
/// PhysicalElement).
pub(crate) fn fixture_catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_class(
            ClassDef::new(ELEMENT, "Fixture.Element")
                .property(ELEMENTS, "Code", "code")
                .property(ELEMENTS, "Name", "name"),
        )
        .with_class(
            ClassDef::new(PHYSICAL, "Fixture.PhysicalElement")
                .base(ELEMENT)
                .property(ELEMENTS, "Height", "height"),
        )
        .with_class(ClassDef::new(MODEL, "Fixture.Model").property(MODELS, "Name", "name"))
        .with_class(ClassDef::new(ASPECT, "Fixture.Aspect").property(ASPECTS, "Note", "note"))
        .with_relationship(
            RelationshipDef::link_table(ELEMENT_REFERS, "Fixture.ElementRefersToElements", ELEMENT_REFS)
                .source(
                    EndDef::new()
                        .instance_id_column("SourceId")
                        .class_id_in_table(ELEMENTS, "ClassId")
                        .constraint(ELEMENT),
                )
                .target(
                    EndDef::new()
                        .instance_id_column("TargetId")
                        .class_id_in_row("TargetClassId")
                        .constraint(ELEMENT),
                )
                .property("Priority", "priority"),
        )
        .with_relationship(
            RelationshipDef::link_table(MODEL_HAS_ASPECTS, "Fixture.ModelHasAspects", MODEL_ASPECTS)
                .source(
                    EndDef::new()
                        .instance_id_column("ModelId")
                        .virtual_class_id()
                        .constraint(MODEL),
                )
                .target(
                    EndDef::new()
                        .instance_id_column("AspectId")
                        .virtual_class_id()
                        .constraint(ASPECT),
                ),
        )
        .with_relationship(
            RelationshipDef::link_table(AMBIGUOUS_LINK, "Fixture.AmbiguousLink", AMBIGUOUS_LINKS)
                .source(
                    EndDef::new()
                        .instance_id_column("SourceId")
                        .virtual_class_id()
                        .constraint(ELEMENT)
                        .constraint(MODEL),
                )
                .target(
                    EndDef::new()
                        .instance_id_column("TargetId")
                        .virtual_class_id()
                        .constraint(ELEMENT),
                ),
        )
        .with_relationship(
            RelationshipDef::foreign_key(
                MODEL_CONTAINS_ELEMENTS,
                "Fixture.ModelContainsElements",
                RelationshipEnd::Target,
                ELEMENTS,
            )
            .navigation("Model.Id")
            .source(
                EndDef::new()
                    .instance_id_column("ModelId")
                    .class_id_in_table(MODELS, "ClassId")
                    .constraint(MODEL),
            )
            .target(
                EndDef::new()
                    .instance_id_column("Id")
                    .class_id_in_table(ELEMENTS, "ClassId")
                    .constraint(ELEMENT),
            )
            .property("MemberPriority", "member_priority"),
        )
        .with_relationship(
            RelationshipDef::foreign_key(
                ELEMENT_OWNS_CHILDREN,
                "Fixture.ElementOwnsChildren",
                RelationshipEnd::Target,
                ELEMENTS,
            )
            .navigation("Parent.Id")
            .source(
                EndDef::new()
                    .instance_id_column("ParentId")
                    .class_id_in_row("ParentClassId")
                    .constraint(PHYSICAL),
            )
            .target(
                EndDef::new()
                    .instance_id_column("Id")
                    .class_id_in_table(ELEMENTS, "ClassId")
                    .constraint(ELEMENT),
            ),
        )
        .with_schema_table(SCHEMA_TABLE)
}

// Test-only stable memory allocation for durable indices.
pub(crate) fn test_memory(id: u8) -> VirtualMemory<DefaultMemoryImpl> {
    let manager = MemoryManager::init(DefaultMemoryImpl::default());

    manager.get(MemoryId::new(id))
}

pub(crate) fn durable_index() -> DurableIndex {
    DurableIndex::init(test_memory(0), test_memory(1), test_memory(2))
}
