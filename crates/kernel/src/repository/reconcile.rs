//! Id-keyed reconciliation of a persisted, ordered collection against an
//! incoming list.
//!
//! The planner is pure: it decides which persisted ids are deleted, which
//! incoming items update a persisted row in place and which are created.
//! Output order follows the inputs, never hash iteration order.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// What to do with one incoming item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Update the persisted row `id` and move it to `order`.
    Update { id: Uuid, order: i32 },
    /// Create a new row at `order`.
    Create { order: i32 },
}

/// Reconciliation plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Persisted ids absent from the incoming list, in persisted order.
    pub delete: Vec<Uuid>,
    /// One step per incoming item, in incoming order.
    pub steps: Vec<Step>,
}

/// Plan the reconciliation of `existing` (persisted ids, in order) against
/// `incoming` (the id each incoming item references, if any).
///
/// An incoming id updates the persisted row only the first time it appears
/// and only when it is persisted; unknown and repeated ids are created fresh.
/// Order indices are assigned densely from the incoming position.
pub fn plan(existing: &[Uuid], incoming: &[Option<Uuid>]) -> Plan {
    let old_by_id: HashMap<Uuid, usize> = existing
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let mut new_by_id: HashMap<Uuid, usize> = HashMap::new();
    let mut steps = Vec::with_capacity(incoming.len());

    for (position, id) in incoming.iter().enumerate() {
        let order = position as i32;
        let step = match id {
            Some(id) if old_by_id.contains_key(id) && !new_by_id.contains_key(id) => {
                new_by_id.insert(*id, position);
                Step::Update { id: *id, order }
            }
            _ => Step::Create { order },
        };
        steps.push(step);
    }

    let mut seen = HashSet::new();
    let delete = existing
        .iter()
        .filter(|id| !new_by_id.contains_key(*id) && seen.insert(**id))
        .copied()
        .collect();

    Plan { delete, steps }
}
