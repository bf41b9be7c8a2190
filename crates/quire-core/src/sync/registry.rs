//! In-flight document registry: at most one active sync session per document.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::DocumentId;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    in_flight: Arc<Mutex<HashSet<DocumentId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as mid-sync. Returns `None` when another session already holds it.
    pub fn try_acquire(&self, id: DocumentId) -> Option<InFlightGuard> {
        if !self.lock().insert(id) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            id,
        })
    }

    pub fn is_syncing(&self, id: &DocumentId) -> bool {
        self.lock().contains(id)
    }

    /// Number of documents currently mid-sync
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<DocumentId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the document's registry entry when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<DocumentId>>>,
    id: DocumentId,
}

impl InFlightGuard {
    pub const fn document_id(&self) -> DocumentId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_document_is_rejected() {
        let registry = SessionRegistry::new();
        let id = DocumentId::new();

        let guard = registry.try_acquire(id).unwrap();
        assert!(registry.try_acquire(id).is_none());
        assert!(registry.is_syncing(&id));
        assert_eq!(guard.document_id(), id);
    }

    #[test]
    fn different_documents_sync_in_parallel() {
        let registry = SessionRegistry::new();
        let _a = registry.try_acquire(DocumentId::new()).unwrap();
        let _b = registry.try_acquire(DocumentId::new()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn dropping_guard_releases_document() {
        let registry = SessionRegistry::new();
        let id = DocumentId::new();

        drop(registry.try_acquire(id).unwrap());
        assert!(!registry.is_syncing(&id));
        assert!(registry.is_empty());
        assert!(registry.try_acquire(id).is_some());
    }
}
