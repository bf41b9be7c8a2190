//! Conflict classification: decides which divergences are safe to settle
//! without a person.
//!
//! Rules, first match wins:
//!
//! 1. The field declares a merge function: `Merged`.
//! 2. The remote stamp is not newer than the last synced revision (remote is
//!    stale): `LocalWins`.
//! 3. The local stamp is not newer than the last synced revision (local is
//!    stale): `RemoteWins`.
//! 4. Both sides changed since the last common point: manual.
//!
//! Stamps live in the remote revision domain, so no wall-clock reads happen here.

use crate::models::{Conflict, ResolvedConflict, Revision};

/// Result of classifying a conflict set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Conflicts carrying their automatic resolution
    pub auto_resolvable: Vec<Conflict>,
    /// Conflicts that need a decision, still unresolved
    pub manual: Vec<Conflict>,
}

impl Classification {
    pub fn is_fully_automatic(&self) -> bool {
        self.manual.is_empty()
    }
}

/// Split conflicts into auto-resolvable and manual sets
pub fn classify(conflicts: Vec<Conflict>, last_synced_revision: Revision) -> Classification {
    let mut classification = Classification::default();

    for mut conflict in conflicts {
        match auto_resolution(&conflict, last_synced_revision) {
            Some(resolved) => {
                conflict.resolution = Some(resolved);
                classification.auto_resolvable.push(conflict);
            }
            None => {
                conflict.resolution = None;
                classification.manual.push(conflict);
            }
        }
    }

    classification
}

/// Resolution for `conflict` if one side is provably stale or a merge exists
pub fn auto_resolution(
    conflict: &Conflict,
    last_synced_revision: Revision,
) -> Option<ResolvedConflict> {
    if let Some(merged) = conflict.merged() {
        return Some(merged);
    }
    if conflict.remote_timestamp <= last_synced_revision {
        return Some(conflict.keep_local());
    }
    if conflict.local_timestamp <= last_synced_revision {
        return Some(conflict.keep_remote());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldValue, ResolutionKind};
    use pretty_assertions::assert_eq;

    fn conflict(
        field: Field,
        local: impl Into<FieldValue>,
        remote: impl Into<FieldValue>,
        local_timestamp: Revision,
        remote_timestamp: Revision,
    ) -> Conflict {
        Conflict {
            field,
            local_value: local.into(),
            remote_value: remote.into(),
            local_timestamp,
            remote_timestamp,
            resolution: None,
        }
    }

    fn kind_of(conflict: &Conflict) -> ResolutionKind {
        conflict.resolution.as_ref().unwrap().kind
    }

    #[test]
    fn mergeable_fields_always_merge_regardless_of_stamps() {
        for (local_ts, remote_ts) in [(1, 1), (9, 9), (2, 8), (8, 2)] {
            let result = classify(
                vec![conflict(Field::IsFavorite, true, false, local_ts, remote_ts)],
                5,
            );
            assert!(result.manual.is_empty());
            let merged = &result.auto_resolvable[0];
            assert_eq!(kind_of(merged), ResolutionKind::Merged);
            assert_eq!(
                merged.resolution.as_ref().unwrap().value,
                FieldValue::Flag(true)
            );
        }
    }

    #[test]
    fn stale_remote_resolves_local_wins() {
        let result = classify(vec![conflict(Field::Content, "new", "old", 6, 5)], 5);
        assert_eq!(kind_of(&result.auto_resolvable[0]), ResolutionKind::LocalWins);
        assert_eq!(
            result.auto_resolvable[0].resolution.as_ref().unwrap().value,
            FieldValue::from("new")
        );
    }

    #[test]
    fn stale_local_resolves_remote_wins() {
        let result = classify(vec![conflict(Field::Font, "sans", "serif", 3, 7)], 5);
        assert_eq!(kind_of(&result.auto_resolvable[0]), ResolutionKind::RemoteWins);
        assert_eq!(
            result.auto_resolvable[0].resolution.as_ref().unwrap().value,
            FieldValue::from("serif")
        );
    }

    #[test]
    fn independent_edits_go_to_manual() {
        let result = classify(vec![conflict(Field::Title, "Plan A", "Plan B", 6, 7)], 5);
        assert!(result.auto_resolvable.is_empty());
        assert_eq!(result.manual.len(), 1);
        assert!(!result.manual[0].is_resolved());
        assert!(!result.is_fully_automatic());
    }

    #[test]
    fn both_sides_stale_prefers_local() {
        let result = classify(vec![conflict(Field::Icon, "📘", "📗", 4, 4)], 5);
        assert_eq!(kind_of(&result.auto_resolvable[0]), ResolutionKind::LocalWins);
    }

    #[test]
    fn classification_is_deterministic_and_partitions_input() {
        let input = vec![
            conflict(Field::Title, "a", "b", 6, 6),
            conflict(Field::Content, "x", "y", 6, 1),
            conflict(Field::IsFavorite, false, true, 6, 6),
        ];
        let first = classify(input.clone(), 5);
        let second = classify(input, 5);
        assert_eq!(first, second);
        assert_eq!(first.auto_resolvable.len() + first.manual.len(), 3);
        assert_eq!(first.manual[0].field, Field::Title);
    }
}
