//! Remote store doubles for orchestrator tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::{DocumentId, DocumentSnapshot, Field, FieldValue, Revision};
use crate::store::{LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore};
use crate::sync::RetryPolicy;

/// Three network attempts, millisecond backoff, two race restarts
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        network: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
        max_revision_retries: 2,
    }
}

/// Commit a change to `field` as another device would
pub async fn commit_remote_edit(
    store: &MemoryRemoteStore,
    id: DocumentId,
    field: Field,
    value: FieldValue,
) -> Revision {
    let mut snapshot = store.get_remote(&id).await.unwrap();
    snapshot.set_value(field, value).unwrap();
    store
        .put_remote(&id, &snapshot, snapshot.base_revision())
        .await
        .unwrap()
}

/// Fails the first `failures` reads with a network error
#[derive(Clone)]
pub struct FlakyRemote {
    inner: MemoryRemoteStore,
    failures: u32,
    calls: Arc<AtomicU32>,
}

impl FlakyRemote {
    pub fn new(inner: MemoryRemoteStore, failures: u32) -> Self {
        Self {
            inner,
            failures,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for FlakyRemote {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(Error::Network("connection reset".to_string()));
        }
        self.inner.get_remote(id).await
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        self.inner.put_remote(id, snapshot, expected_revision).await
    }
}

/// Fails the first `failures` pushes with a network error. When `delivered`
/// is set the write lands before the error, as if only the response was lost.
#[derive(Clone)]
pub struct FlakyPush {
    inner: MemoryRemoteStore,
    failures: u32,
    delivered: bool,
    pushes: Arc<AtomicU32>,
}

impl FlakyPush {
    pub fn dropping_requests(inner: MemoryRemoteStore, failures: u32) -> Self {
        Self::new(inner, failures, false)
    }

    pub fn dropping_responses(inner: MemoryRemoteStore, failures: u32) -> Self {
        Self::new(inner, failures, true)
    }

    fn new(inner: MemoryRemoteStore, failures: u32, delivered: bool) -> Self {
        Self {
            inner,
            failures,
            delivered,
            pushes: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn pushes(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for FlakyPush {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.inner.get_remote(id).await
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        if self.pushes.fetch_add(1, Ordering::SeqCst) < self.failures {
            if self.delivered {
                self.inner.put_remote(id, snapshot, expected_revision).await?;
            }
            return Err(Error::Network("response lost".to_string()));
        }
        self.inner.put_remote(id, snapshot, expected_revision).await
    }
}

/// Fails the first `failures` local writes with a network error
#[derive(Clone)]
pub struct FlakyLocal {
    inner: MemoryLocalStore,
    failures: u32,
    writes: Arc<AtomicU32>,
}

impl FlakyLocal {
    pub fn new(inner: MemoryLocalStore, failures: u32) -> Self {
        Self {
            inner,
            failures,
            writes: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalStore for FlakyLocal {
    async fn get_local(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.inner.get_local(id).await
    }

    async fn put_local(&self, id: &DocumentId, snapshot: &DocumentSnapshot) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(Error::Network("store unavailable".to_string()));
        }
        self.inner.put_local(id, snapshot).await
    }
}

/// Lets another writer commit to `field` right before each of the first
/// `races` pushes, so those pushes lose the revision check.
#[derive(Clone)]
pub struct RacingRemote {
    inner: MemoryRemoteStore,
    field: Field,
    races: u32,
    run: Arc<AtomicU32>,
}

impl RacingRemote {
    pub fn new(inner: MemoryRemoteStore, field: Field, races: u32) -> Self {
        Self {
            inner,
            field,
            races,
            run: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn races_run(&self) -> u32 {
        self.run.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for RacingRemote {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.inner.get_remote(id).await
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        let run = self.run.load(Ordering::SeqCst);
        if run < self.races {
            let race = run + 1;
            self.run.store(race, Ordering::SeqCst);
            let value = FieldValue::Text(format!("concurrent edit {race}"));
            commit_remote_edit(&self.inner, *id, self.field, value).await;
        }
        self.inner.put_remote(id, snapshot, expected_revision).await
    }
}

/// Holds every read until `open` is called
#[derive(Clone)]
pub struct GatedRemote {
    inner: MemoryRemoteStore,
    entered: Arc<Notify>,
    gate: Arc<Notify>,
}

impl GatedRemote {
    pub fn new(inner: MemoryRemoteStore) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Resolves once a read is blocked on the gate
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.get_remote(id).await
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        self.inner.put_remote(id, snapshot, expected_revision).await
    }
}
