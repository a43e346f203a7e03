//! Validation of client-supplied course orderings against stored membership.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderingError {
    #[error("course {0} is listed more than once")]
    DuplicateCourse(Uuid),
    #[error("order value {0} is used more than once")]
    DuplicateOrder(i64),
    #[error("ordering does not match the learning path's courses (missing: {missing:?}, unknown: {unknown:?})")]
    NotAPermutation { missing: Vec<Uuid>, unknown: Vec<Uuid> },
}

/// Fails on the first id that appears twice.
pub fn ensure_distinct(ids: &[Uuid]) -> Result<(), OrderingError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(OrderingError::DuplicateCourse(*id));
        }
    }
    Ok(())
}

/// `requested` must contain every id of `current` exactly once and nothing else.
/// Missing and unknown ids are reported in the order they were given.
pub fn ensure_permutation(current: &[Uuid], requested: &[Uuid]) -> Result<(), OrderingError> {
    ensure_distinct(requested)?;

    let current_set: HashSet<&Uuid> = current.iter().collect();
    let requested_set: HashSet<&Uuid> = requested.iter().collect();

    let missing: Vec<Uuid> = current
        .iter()
        .filter(|id| !requested_set.contains(id))
        .copied()
        .collect();
    let unknown: Vec<Uuid> = requested
        .iter()
        .filter(|id| !current_set.contains(id))
        .copied()
        .collect();

    if missing.is_empty() && unknown.is_empty() {
        Ok(())
    } else {
        Err(OrderingError::NotAPermutation { missing, unknown })
    }
}

/// Turns `(course_id, order)` pairs into a course sequence sorted by `order`.
/// Only the relative order matters; the values need not start at zero.
pub fn sequence_from_positions(entries: &[(Uuid, i64)]) -> Result<Vec<Uuid>, OrderingError> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|(_, order)| *order);
    for pair in sorted.windows(2) {
        if pair[0].1 == pair[1].1 {
            return Err(OrderingError::DuplicateOrder(pair[0].1));
        }
    }
    Ok(sorted.into_iter().map(|(course_id, _)| course_id).collect())
}
