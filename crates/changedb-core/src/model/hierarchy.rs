use crate::{
    model::MappingCatalog,
    types::{ClassId, RelationshipEnd},
};
use std::collections::{BTreeSet, VecDeque};

/// Expand a class into itself plus every transitive subclass.
///
/// Breadth-first over base→derived edges; cycles in a malformed hierarchy
/// terminate because visited classes are never re-queued.
pub fn polymorphic_closure(catalog: &dyn MappingCatalog, root: ClassId) -> BTreeSet<ClassId> {
    let mut seen = BTreeSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(class_id) = queue.pop_front() {
        for derived in catalog.derived_classes(class_id) {
            if seen.insert(derived) {
                queue.push_back(derived);
            }
        }
    }

    seen
}

/// Whether `candidate` (or any of its ancestors) is listed by the
/// relationship constraint at `end`.
pub fn class_satisfies_constraint(
    catalog: &dyn MappingCatalog,
    relationship: ClassId,
    end: RelationshipEnd,
    candidate: ClassId,
) -> bool {
    let constraint: BTreeSet<ClassId> = catalog
        .constraint_classes(relationship, end)
        .into_iter()
        .collect();
    if constraint.is_empty() {
        return false;
    }

    let mut seen = BTreeSet::from([candidate]);
    let mut queue = VecDeque::from([candidate]);

    while let Some(class_id) = queue.pop_front() {
        if constraint.contains(&class_id) {
            return true;
        }
        for base in catalog.base_classes(class_id) {
            if seen.insert(base) {
                queue.push_back(base);
            }
        }
    }

    false
}
