//! One synchronization attempt for one document

use serde::Serialize;

use crate::models::{Conflict, DocumentId, DocumentSnapshot, ResolvedConflict};

use super::classifier::{auto_resolution, classify};
use super::registry::InFlightGuard;
use super::resolution::{apply, repeated_field, validate_complete};
use super::tracker::diff;
use super::{SyncError, SyncResult};

/// Why a session ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Network,
    TooManyRetries,
    IncompleteResolution,
    InvalidResolution,
    AlreadySyncing,
    Cancelled,
    NoPendingSession,
    Store,
}

/// Session lifecycle.
///
/// `Clean -> Applied`, `AwaitingResolution -> Resolving -> Applied`, and any
/// live state `-> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    /// No conflicts were found
    Clean,
    /// Conflicts remain after auto-resolution
    AwaitingResolution,
    /// Every conflict carries a decision
    Resolving,
    Applied,
    Failed(FailureKind),
}

impl SyncStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Failed(_))
    }

    /// A revision race sends `Resolving` back through a fresh diff, so it may
    /// return to `AwaitingResolution` or stay `Resolving`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed(_))
                | (Self::Clean | Self::Resolving, Self::Applied)
                | (
                    Self::AwaitingResolution | Self::Resolving,
                    Self::AwaitingResolution | Self::Resolving,
                )
        )
    }
}

/// Unit of work for one sync attempt. Owned exclusively by the orchestrator
/// and dropped at a terminal status, which releases the document.
#[derive(Debug)]
pub struct SyncSession {
    document_id: DocumentId,
    local: DocumentSnapshot,
    remote: DocumentSnapshot,
    conflicts: Vec<Conflict>,
    status: SyncStatus,
    revision_races: u32,
    _in_flight: InFlightGuard,
}

impl SyncSession {
    /// Diff and classify a freshly fetched pair
    pub(crate) fn open(
        in_flight: InFlightGuard,
        local: DocumentSnapshot,
        remote: DocumentSnapshot,
    ) -> Self {
        let (conflicts, next) = reconcile(&local, &remote);
        let status = if conflicts.is_empty() {
            SyncStatus::Clean
        } else {
            next
        };

        Self {
            document_id: in_flight.document_id(),
            local,
            remote,
            conflicts,
            status,
            revision_races: 0,
            _in_flight: in_flight,
        }
    }

    /// Re-diff after a lost push race: `merged` is the already reconciled copy,
    /// `remote` the freshly fetched one.
    pub(crate) fn restart(&mut self, merged: DocumentSnapshot, remote: DocumentSnapshot) {
        let (conflicts, next) = reconcile(&merged, &remote);
        self.local = merged;
        self.remote = remote;
        self.conflicts = conflicts;
        self.set_status(next);
    }

    pub const fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub const fn status(&self) -> SyncStatus {
        self.status
    }

    /// Local baseline of this attempt (the merged copy after a race restart)
    pub const fn local(&self) -> &DocumentSnapshot {
        &self.local
    }

    pub const fn remote(&self) -> &DocumentSnapshot {
        &self.remote
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub const fn revision_races(&self) -> u32 {
        self.revision_races
    }

    pub fn unresolved(&self) -> Vec<Conflict> {
        self.conflicts
            .iter()
            .filter(|conflict| !conflict.is_resolved())
            .cloned()
            .collect()
    }

    pub fn resolved(&self) -> Vec<ResolvedConflict> {
        self.conflicts
            .iter()
            .filter_map(|conflict| conflict.resolution.clone())
            .collect()
    }

    /// Record caller decisions. Every decision is checked before any is stored.
    pub(crate) fn record(&mut self, decisions: Vec<ResolvedConflict>) -> SyncResult<()> {
        if let Some(field) = repeated_field(&decisions) {
            return Err(SyncError::InvalidResolution(format!(
                "field {field} has more than one decision"
            )));
        }

        for decision in &decisions {
            let conflict = self
                .conflicts
                .iter()
                .find(|conflict| conflict.field == decision.field)
                .ok_or_else(|| {
                    SyncError::InvalidResolution(format!(
                        "field {} is not in conflict",
                        decision.field
                    ))
                })?;
            if !conflict.accepts(decision) {
                return Err(SyncError::InvalidResolution(format!(
                    "{} is not a valid {} resolution for field {}",
                    decision.value,
                    decision.kind.label(),
                    decision.field
                )));
            }
        }

        for decision in decisions {
            if let Some(conflict) = self
                .conflicts
                .iter_mut()
                .find(|conflict| conflict.field == decision.field)
            {
                conflict.resolution = Some(decision);
            }
        }

        self.settle_status();
        Ok(())
    }

    /// Re-run the automatic rules over undecided conflicts.
    ///
    /// Returns the decisions made by this pass and the conflicts still manual.
    pub(crate) fn auto_resolve(&mut self) -> (Vec<ResolvedConflict>, Vec<Conflict>) {
        let baseline = self.local.base_revision();
        let mut newly_resolved = Vec::new();

        for conflict in self.conflicts.iter_mut().filter(|c| !c.is_resolved()) {
            if let Some(decision) = auto_resolution(conflict, baseline) {
                conflict.resolution = Some(decision.clone());
                newly_resolved.push(decision);
            }
        }

        self.settle_status();
        (newly_resolved, self.unresolved())
    }

    pub fn validate(&self) -> SyncResult<()> {
        validate_complete(&self.conflicts, &self.resolved())
    }

    /// Merged snapshot built from the recorded decisions; revision unset
    pub fn merged(&self) -> SyncResult<DocumentSnapshot> {
        apply(&self.local, &self.resolved())
    }

    /// Count a lost push race, failing once the budget is spent
    pub(crate) fn note_revision_race(&mut self, max_restarts: u32) -> SyncResult<()> {
        self.revision_races += 1;
        if self.revision_races > max_restarts {
            return Err(SyncError::TooManyRetries {
                attempts: self.revision_races,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_applied(mut self) {
        self.set_status(SyncStatus::Applied);
    }

    /// End the session with `error`, releasing the document
    pub(crate) fn fail(mut self, error: SyncError) -> SyncError {
        self.set_status(SyncStatus::Failed(error.kind()));
        error
    }

    fn settle_status(&mut self) {
        if self.status == SyncStatus::AwaitingResolution
            && self.conflicts.iter().all(Conflict::is_resolved)
        {
            self.set_status(SyncStatus::Resolving);
        }
    }

    fn set_status(&mut self, next: SyncStatus) {
        if self.status == next {
            return;
        }
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal sync status transition {:?} -> {next:?}",
            self.status
        );
        tracing::debug!(
            document = %self.document_id,
            from = ?self.status,
            to = ?next,
            "Sync session status changed"
        );
        self.status = next;
    }
}

/// Conflicts between the pair, auto-resolved where possible, plus the status
/// they leave the session in.
fn reconcile(local: &DocumentSnapshot, remote: &DocumentSnapshot) -> (Vec<Conflict>, SyncStatus) {
    let classification = classify(diff(local, remote), local.base_revision());
    let status = if classification.is_fully_automatic() {
        SyncStatus::Resolving
    } else {
        SyncStatus::AwaitingResolution
    };

    let mut conflicts = classification.auto_resolvable;
    conflicts.extend(classification.manual);
    conflicts.sort_by_key(|conflict| conflict.field);
    (conflicts, status)
}
