//! Picks which concrete variation of a family to present next.

use crate::types::{ConceptFamily, FamilyMasteryRecord, ProblemVariation};

/// Unseen-first by `order`; once the family is exhausted, start over at
/// the lowest-order variation. `None` only for an empty family.
pub fn select_next<'a>(
    family: &'a ConceptFamily,
    record: &FamilyMasteryRecord,
) -> Option<&'a ProblemVariation> {
    let mut ordered: Vec<&ProblemVariation> = family.variations.iter().collect();
    ordered.sort_by_key(|v| v.order);
    ordered
        .iter()
        .find(|v| !record.used_variations.contains(&v.id))
        .copied()
        .or_else(|| ordered.first().copied())
}
