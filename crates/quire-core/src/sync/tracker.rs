//! Change tracking between a local and a remote snapshot

use crate::models::{Conflict, DocumentSnapshot, Field};

/// Fields whose values differ, in schema order.
///
/// Timestamps alone never produce a conflict; an empty result means the
/// snapshots are value-identical.
pub fn diff(local: &DocumentSnapshot, remote: &DocumentSnapshot) -> Vec<Conflict> {
    Field::ALL
        .into_iter()
        .filter(|field| local.value(*field) != remote.value(*field))
        .map(|field| Conflict::new(field, local, remote))
        .collect()
}
