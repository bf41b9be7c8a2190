//! In-memory store implementations

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LocalStore, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{DocumentFields, DocumentId, DocumentSnapshot, Field, Origin, Revision};

/// Local cache held in memory
#[derive(Clone, Default)]
pub struct MemoryLocalStore {
    documents: Arc<Mutex<HashMap<DocumentId, DocumentSnapshot>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a cached snapshot
    pub async fn insert(&self, snapshot: DocumentSnapshot) {
        let snapshot = snapshot.with_origin(Origin::Local);
        self.documents.lock().await.insert(snapshot.id, snapshot);
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get_local(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.documents
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or(Error::NotFound(*id))
    }

    async fn put_local(&self, id: &DocumentId, snapshot: &DocumentSnapshot) -> Result<()> {
        let mut snapshot = snapshot.clone().with_origin(Origin::Local);
        snapshot.id = *id;
        self.documents.lock().await.insert(*id, snapshot);
        Ok(())
    }
}

/// Remote store held in memory, assigning revisions like a real server
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    documents: Arc<Mutex<HashMap<DocumentId, DocumentSnapshot>>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document at revision 1, every field stamped 1
    pub async fn create(&self, id: DocumentId, fields: DocumentFields) -> DocumentSnapshot {
        let mut snapshot = DocumentSnapshot::new(id, Origin::Remote, fields);
        snapshot.revision = Some(1);
        snapshot.modified = Field::ALL.into_iter().map(|field| (field, 1)).collect();
        self.documents.lock().await.insert(id, snapshot.clone());
        snapshot
    }

    /// Current revision of a document, if it exists
    pub async fn revision(&self, id: &DocumentId) -> Option<Revision> {
        self.documents.lock().await.get(id).map(|s| s.base_revision())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.documents
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or(Error::NotFound(*id))
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        let mut documents = self.documents.lock().await;
        let current = documents.get(id).ok_or(Error::NotFound(*id))?;

        let actual = current.base_revision();
        if actual != expected_revision {
            return Err(Error::RevisionConflict {
                expected: expected_revision,
                actual,
            });
        }

        let revision = actual + 1;
        let mut stored = snapshot
            .committed(current, revision)
            .with_origin(Origin::Remote);
        stored.id = *id;
        stored.updated_at = chrono::Utc::now().timestamp_millis();
        documents.insert(*id, stored);
        Ok(revision)
    }
}
