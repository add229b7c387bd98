//! Mapping-catalog boundary: how classes and relationships are laid out in
//! physical tables. The engine consumes this; it never decides a mapping.

mod catalog;
mod hierarchy;
mod static_catalog;


pub use catalog::{EndpointClassIdColumn, MappingCatalog, PropertyColumn, RelationshipShape};
pub use hierarchy::{class_satisfies_constraint, polymorphic_closure};
pub use static_catalog::{ClassDef, EndDef, RelationshipDef, StaticCatalog};
