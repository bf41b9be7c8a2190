//! Conflict and resolution models

use serde::{Deserialize, Serialize};

use super::document::{DocumentSnapshot, Field, FieldValue, Revision};

/// How a conflict was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    LocalWins,
    RemoteWins,
    /// Combined by the field's merge function
    Merged,
}

impl ResolutionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LocalWins => "local",
            Self::RemoteWins => "remote",
            Self::Merged => "merged",
        }
    }
}

/// The outcome chosen for one conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConflict {
    pub field: Field,
    pub kind: ResolutionKind,
    pub value: FieldValue,
}

/// One field whose value differs between the local and remote snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub field: Field,
    pub local_value: FieldValue,
    pub remote_value: FieldValue,
    pub local_timestamp: Revision,
    pub remote_timestamp: Revision,
    /// Filled once the conflict has been decided
    pub resolution: Option<ResolvedConflict>,
}

impl Conflict {
    /// Capture `field` from both snapshots
    pub fn new(field: Field, local: &DocumentSnapshot, remote: &DocumentSnapshot) -> Self {
        Self {
            field,
            local_value: local.value(field),
            remote_value: remote.value(field),
            local_timestamp: local.stamp(field),
            remote_timestamp: remote.stamp(field),
            resolution: None,
        }
    }

    pub fn keep_local(&self) -> ResolvedConflict {
        ResolvedConflict {
            field: self.field,
            kind: ResolutionKind::LocalWins,
            value: self.local_value.clone(),
        }
    }

    pub fn keep_remote(&self) -> ResolvedConflict {
        ResolvedConflict {
            field: self.field,
            kind: ResolutionKind::RemoteWins,
            value: self.remote_value.clone(),
        }
    }

    /// Merge both sides; `None` when the field declares no merge function
    pub fn merged(&self) -> Option<ResolvedConflict> {
        let merge = self.field.merge_function()?;
        let value = merge(&self.local_value, &self.remote_value)?;
        Some(ResolvedConflict {
            field: self.field,
            kind: ResolutionKind::Merged,
            value,
        })
    }

    /// Resolution of the requested kind, if the field permits it
    pub fn resolve(&self, kind: ResolutionKind) -> Option<ResolvedConflict> {
        match kind {
            ResolutionKind::LocalWins => Some(self.keep_local()),
            ResolutionKind::RemoteWins => Some(self.keep_remote()),
            ResolutionKind::Merged => self.merged(),
        }
    }

    pub const fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Whether `resolved` is a legal decision for this conflict
    pub fn accepts(&self, resolved: &ResolvedConflict) -> bool {
        resolved.field == self.field
            && self
                .resolve(resolved.kind)
                .is_some_and(|expected| expected.value == resolved.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentFields, DocumentId, Origin};

    fn title_conflict() -> Conflict {
        Conflict {
            field: Field::Title,
            local_value: "Plan A".into(),
            remote_value: "Plan B".into(),
            local_timestamp: 3,
            remote_timestamp: 3,
            resolution: None,
        }
    }

    #[test]
    fn test_conflict_new_captures_both_sides() {
        let id = DocumentId::new();
        let mut local = DocumentSnapshot::new(id, Origin::Local, DocumentFields::default());
        local.edit(Field::Font, "serif").unwrap();
        let remote = DocumentSnapshot::new(id, Origin::Remote, DocumentFields::default());

        let conflict = Conflict::new(Field::Font, &local, &remote);
        assert_eq!(conflict.local_value, "serif".into());
        assert_eq!(conflict.remote_value, "default".into());
        assert_eq!(conflict.local_timestamp, 1);
        assert_eq!(conflict.remote_timestamp, 0);
        assert!(!conflict.is_resolved());
    }

    #[test]
    fn test_merged_only_for_mergeable_fields() {
        assert!(title_conflict().merged().is_none());

        let favorite = Conflict {
            field: Field::IsFavorite,
            local_value: true.into(),
            remote_value: false.into(),
            local_timestamp: 1,
            remote_timestamp: 1,
            resolution: None,
        };
        let merged = favorite.merged().unwrap();
        assert_eq!(merged.kind, ResolutionKind::Merged);
        assert_eq!(merged.value, FieldValue::Flag(true));
    }

    #[test]
    fn test_accepts_checks_value_against_side() {
        let conflict = title_conflict();
        assert!(conflict.accepts(&conflict.keep_local()));
        assert!(conflict.accepts(&conflict.keep_remote()));

        let mut forged = conflict.keep_local();
        forged.value = "Plan C".into();
        assert!(!conflict.accepts(&forged));

        let merged = ResolvedConflict {
            field: Field::Title,
            kind: ResolutionKind::Merged,
            value: "Plan A".into(),
        };
        assert!(!conflict.accepts(&merged));
    }
}
