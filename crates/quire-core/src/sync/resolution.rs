//! Resolution engine: folds decisions into a single reconciled snapshot

use std::collections::BTreeSet;

use crate::models::{Conflict, DocumentSnapshot, Field, ResolvedConflict};

use super::{SyncError, SyncResult};

/// Overwrite each resolved field on top of the local snapshot.
///
/// Unaffected fields carry over from `local`. The result's revision is unset;
/// the orchestrator assigns one when it commits.
pub fn apply(
    local: &DocumentSnapshot,
    resolved: &[ResolvedConflict],
) -> SyncResult<DocumentSnapshot> {
    let mut merged = local.clone();
    merged.revision = None;

    for decision in resolved {
        merged
            .set_value(decision.field, decision.value.clone())
            .map_err(|error| SyncError::InvalidResolution(error.to_string()))?;
    }

    Ok(merged)
}

/// Whether every conflict has exactly one matching decision
pub fn is_complete(conflicts: &[Conflict], resolved: &[ResolvedConflict]) -> bool {
    validate_complete(conflicts, resolved).is_ok()
}

/// Fails with `InvalidResolution` when a field is decided twice, and with
/// `IncompleteResolution` naming each undecided field.
pub fn validate_complete(conflicts: &[Conflict], resolved: &[ResolvedConflict]) -> SyncResult<()> {
    if let Some(field) = repeated_field(resolved) {
        return Err(SyncError::InvalidResolution(format!(
            "field {field} has more than one decision"
        )));
    }

    let missing = missing_decisions(conflicts, resolved);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::IncompleteResolution { missing })
    }
}

/// First field that appears in more than one decision
pub(crate) fn repeated_field(resolved: &[ResolvedConflict]) -> Option<Field> {
    let mut seen = BTreeSet::new();
    resolved
        .iter()
        .map(|decision| decision.field)
        .find(|field| !seen.insert(*field))
}

fn missing_decisions(conflicts: &[Conflict], resolved: &[ResolvedConflict]) -> Vec<Field> {
    conflicts
        .iter()
        .map(|conflict| conflict.field)
        .filter(|field| !resolved.iter().any(|decision| decision.field == *field))
        .collect()
}
