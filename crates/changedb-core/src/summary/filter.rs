use crate::{
    model::{MappingCatalog, polymorphic_closure},
    types::{ClassId, OpMask},
};
use std::collections::BTreeSet;

///
/// InstanceFilter
///
/// Optional class restriction plus an operation mask.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InstanceFilter {
    class: Option<ClassScope>,
    ops: OpMask,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ClassScope {
    class_id: ClassId,
    polymorphic: bool,
}

impl InstanceFilter {
    /// Every changed instance.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            class: None,
            ops: OpMask::ALL,
        }
    }

    /// Instances of `class_id` or any of its subclasses.
    #[must_use]
    pub const fn class(class_id: ClassId) -> Self {
        Self {
            class: Some(ClassScope {
                class_id,
                polymorphic: true,
            }),
            ops: OpMask::ALL,
        }
    }

    /// Instances of exactly `class_id`.
    #[must_use]
    pub const fn exact_class(class_id: ClassId) -> Self {
        Self {
            class: Some(ClassScope {
                class_id,
                polymorphic: false,
            }),
            ops: OpMask::ALL,
        }
    }

    #[must_use]
    pub const fn ops(mut self, ops: OpMask) -> Self {
        self.ops = ops;
        self
    }

    /// Expand the class scope against the catalog's hierarchy.
    pub(super) fn resolve(&self, catalog: &dyn MappingCatalog) -> ResolvedFilter {
        let classes = self.class.map(|scope| {
            if scope.polymorphic {
                polymorphic_closure(catalog, scope.class_id)
            } else {
                BTreeSet::from([scope.class_id])
            }
        });

        ResolvedFilter {
            classes,
            ops: self.ops,
        }
    }
}

impl Default for InstanceFilter {
    fn default() -> Self {
        Self::all()
    }
}

///
/// ResolvedFilter
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ResolvedFilter {
    pub(super) classes: Option<BTreeSet<ClassId>>,
    pub(super) ops: OpMask,
}
