use async_trait::async_trait;

use crate::models::{Conflict, DocumentId, ResolvedConflict};

/// Source of decisions for conflicts the engine cannot settle alone.
///
/// Returning `None` abandons the sync; the orchestrator cancels the session.
#[async_trait]
pub trait ResolutionProvider: Send + Sync {
    async fn resolve(
        &self,
        document_id: DocumentId,
        conflicts: &[Conflict],
    ) -> Option<Vec<ResolvedConflict>>;
}

/// Settles every manual conflict in favor of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferSide {
    Local,
    Remote,
}

#[async_trait]
impl ResolutionProvider for PreferSide {
    async fn resolve(
        &self,
        _document_id: DocumentId,
        conflicts: &[Conflict],
    ) -> Option<Vec<ResolvedConflict>> {
        let decisions = conflicts
            .iter()
            .map(|conflict| match self {
                Self::Local => conflict.keep_local(),
                Self::Remote => conflict.keep_remote(),
            })
            .collect();
        Some(decisions)
    }
}
