//! Conflict resolution for overlapping detections
//!
//! Reduces a set of possibly overlapping labelled intervals over one text
//! to a disjoint, deterministic set, Presidio-style: same-category
//! intervals that overlap or touch are merged first (score = max of the
//! merged set), then overlapping intervals across categories are decided
//! by score, then length, then earlier start, then lexicographically
//! smaller category.

use crate::entity::Entity;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Resolve a list of entities over one text into a disjoint list sorted
/// by start.
///
/// Zero-length entities must have been rejected upstream; they are dropped
/// here rather than allowed to poison the sweep.
pub fn resolve(entities: Vec<Entity>) -> Vec<Entity> {
    let mut by_category: BTreeMap<String, Vec<Entity>> = BTreeMap::new();
    for entity in entities {
        if entity.is_empty() {
            continue;
        }
        by_category
            .entry(entity.category.clone())
            .or_default()
            .push(entity);
    }

    // Within a category, merge intervals that overlap or touch.
    let mut merged = Vec::new();
    for (_, mut group) in by_category {
        group.sort_by_key(|e| (e.start, e.end));
        let mut group = group.into_iter();
        let mut current = group.next().expect("groups are non-empty");
        for entity in group {
            if entity.start <= current.end {
                current.end = current.end.max(entity.end);
                if entity.score > current.score {
                    current.score = entity.score;
                    current.source = entity.source;
                }
            } else {
                merged.push(std::mem::replace(&mut current, entity));
            }
        }
        merged.push(current);
    }

    // Across categories, the stronger interval wins every overlap it is
    // part of. Sorting by precedence and sweeping greedily implements the
    // pairwise rule deterministically.
    merged.sort_by(precedence);
    let mut retained: Vec<Entity> = Vec::new();
    for entity in merged {
        if retained.iter().all(|kept| !kept.overlaps(&entity)) {
            retained.push(entity);
        }
    }

    retained.sort_by_key(|e| (e.start, e.end));
    retained
}

/// score desc, length desc, start asc, category asc
fn precedence(a: &Entity, b: &Entity) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.category.cmp(&b.category))
}
