//! Sync orchestration: drives sessions from fetch to commit

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SyncConfig;
use crate::error::Error;
use crate::models::{Conflict, DocumentId, DocumentSnapshot, Origin, ResolvedConflict};
use crate::store::{LocalStore, RemoteStore};

use super::provider::ResolutionProvider;
use super::registry::SessionRegistry;
use super::session::{SyncSession, SyncStatus};
use super::{SyncError, SyncResult};

/// Where a sync attempt stands after a call returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress {
    /// Nothing differed; no write to the remote happened
    Clean(DocumentSnapshot),
    /// The merged snapshot was committed to both stores
    Applied(DocumentSnapshot),
    /// The session is parked until these conflicts are decided
    NeedsResolution(Vec<Conflict>),
}

impl SyncProgress {
    /// Final snapshot, unless the attempt is still waiting on decisions
    pub const fn snapshot(&self) -> Option<&DocumentSnapshot> {
        match self {
            Self::Clean(snapshot) | Self::Applied(snapshot) => Some(snapshot),
            Self::NeedsResolution(_) => None,
        }
    }
}

struct Inner {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
    registry: SessionRegistry,
    /// Sessions waiting on manual decisions. Never locked across an await.
    parked: Mutex<HashMap<DocumentId, SyncSession>>,
}

/// Runs sync sessions against a local and a remote store.
///
/// Clones share the same stores, in-flight registry, and parked sessions.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                config,
                registry: SessionRegistry::new(),
                parked: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Whether a session for `id` is in flight or parked
    pub fn is_syncing(&self, id: &DocumentId) -> bool {
        self.inner.registry.is_syncing(id)
    }

    /// Undecided conflicts of a parked session
    pub fn pending_conflicts(&self, id: &DocumentId) -> Option<Vec<Conflict>> {
        self.parked().get(id).map(SyncSession::unresolved)
    }

    /// Open a session for `id` and run it as far as it can go unattended.
    ///
    /// Fails with `AlreadySyncing` when another session holds the document.
    pub async fn start_sync(&self, id: DocumentId) -> SyncResult<SyncProgress> {
        let in_flight = self
            .inner
            .registry
            .try_acquire(id)
            .ok_or(SyncError::AlreadySyncing(id))?;

        tracing::debug!(document = %id, "Sync started");
        let (local, remote) = self.fetch(&id).await?;
        let session = SyncSession::open(in_flight, local, remote);
        self.advance(session).await
    }

    /// Record decisions for a parked session and commit once complete.
    ///
    /// Invalid or incomplete decisions are returned as errors and the session
    /// stays parked. A race with another writer may surface new conflicts.
    pub async fn submit_resolutions(
        &self,
        id: DocumentId,
        resolutions: Vec<ResolvedConflict>,
    ) -> SyncResult<SyncProgress> {
        let mut session = self.take_parked(&id)?;

        if let Err(error) = session
            .record(resolutions)
            .and_then(|()| session.validate())
        {
            tracing::debug!(document = %id, %error, "Rejected submitted resolutions");
            self.park(session);
            return Err(error);
        }

        self.advance(session).await
    }

    /// Re-run the automatic rules over a parked session's undecided conflicts.
    ///
    /// Returns what this pass decided and what is still manual. Commit with
    /// `submit_resolutions` once nothing manual remains.
    pub fn auto_resolve_remaining(
        &self,
        id: &DocumentId,
    ) -> SyncResult<(Vec<ResolvedConflict>, Vec<Conflict>)> {
        let mut parked = self.parked();
        let session = parked
            .get_mut(id)
            .ok_or(SyncError::NoPendingSession(*id))?;
        Ok(session.auto_resolve())
    }

    /// Abandon a parked session, releasing the document
    pub fn cancel(&self, id: &DocumentId) -> SyncResult<()> {
        let session = self.take_parked(id)?;
        session.fail(SyncError::Cancelled);
        tracing::info!(document = %id, "Sync cancelled");
        Ok(())
    }

    /// Run a full sync, asking `provider` whenever manual decisions are needed.
    ///
    /// Dropping the returned future while the provider is deciding cancels
    /// the session.
    pub async fn sync(
        &self,
        id: DocumentId,
        provider: &dyn ResolutionProvider,
    ) -> SyncResult<DocumentSnapshot> {
        let mut progress = self.start_sync(id).await?;

        loop {
            let conflicts = match progress {
                SyncProgress::Clean(snapshot) | SyncProgress::Applied(snapshot) => {
                    return Ok(snapshot);
                }
                SyncProgress::NeedsResolution(conflicts) => conflicts,
            };

            let waiting = CancelOnDrop::new(self, id);
            let decisions = provider.resolve(id, &conflicts).await;
            waiting.disarm();

            let Some(decisions) = decisions else {
                self.cancel(&id)?;
                return Err(SyncError::Cancelled);
            };

            progress = match self.submit_resolutions(id, decisions).await {
                Ok(progress) => progress,
                Err(error) => {
                    self.discard(&id);
                    return Err(error);
                }
            };
        }
    }

    async fn fetch(&self, id: &DocumentId) -> SyncResult<(DocumentSnapshot, DocumentSnapshot)> {
        let policy = self.inner.config.network;
        let local_store = &self.inner.local;
        let remote_store = &self.inner.remote;

        let (local, remote) = tokio::try_join!(
            policy.run("get_local", move || local_store.get_local(id)),
            policy.run("get_remote", move || remote_store.get_remote(id)),
        )?;
        Ok((local, remote))
    }

    /// Move a session forward until it parks or reaches a terminal status
    async fn advance(&self, mut session: SyncSession) -> SyncResult<SyncProgress> {
        loop {
            match session.status() {
                SyncStatus::Clean => return self.finish_clean(session).await,
                SyncStatus::AwaitingResolution => {
                    let manual = session.unresolved();
                    tracing::info!(
                        document = %session.document_id(),
                        conflicts = manual.len(),
                        "Sync waiting on manual resolution"
                    );
                    self.park(session);
                    return Ok(SyncProgress::NeedsResolution(manual));
                }
                _ => {}
            }

            match self.commit(&mut session).await {
                Ok(Some(snapshot)) => {
                    session.mark_applied();
                    return Ok(SyncProgress::Applied(snapshot));
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(document = %session.document_id(), %error, "Sync failed");
                    return Err(session.fail(error));
                }
            }
        }
    }

    /// Nothing differs. The local copy is only rewritten when its revision or
    /// stamps disagree with the remote, e.g. after an edit that was reverted.
    async fn finish_clean(&self, session: SyncSession) -> SyncResult<SyncProgress> {
        let local = session.local();
        let remote = session.remote();

        if local.revision == remote.revision && local.modified == remote.modified {
            let snapshot = local.clone();
            session.mark_applied();
            return Ok(SyncProgress::Clean(snapshot));
        }

        let adopted = remote.clone().with_origin(Origin::Local);
        match self.write_local(&adopted).await {
            Ok(()) => {
                session.mark_applied();
                Ok(SyncProgress::Clean(adopted))
            }
            Err(error) => Err(session.fail(error)),
        }
    }

    /// Push the merged snapshot. `Ok(None)` means the remote moved and the
    /// session was re-diffed against a fresh copy.
    async fn commit(&self, session: &mut SyncSession) -> SyncResult<Option<DocumentSnapshot>> {
        session.validate()?;

        let id = session.document_id();
        let remote = session.remote().clone();
        let merged = session.merged()?.rebased_onto(&remote);

        let committed = if merged.same_values(&remote) {
            tracing::debug!(
                document = %id,
                revision = remote.base_revision(),
                "Merged copy matches remote, fast-forwarding"
            );
            remote.with_origin(Origin::Local)
        } else {
            let policy = self.inner.config.network;
            let store = &self.inner.remote;
            let (id_ref, merged_ref) = (&id, &merged);
            let expected = remote.base_revision();

            let pushed = policy
                .run("put_remote", move || {
                    store.put_remote(id_ref, merged_ref, expected)
                })
                .await;

            match pushed {
                Ok(revision) => merged.committed(&remote, revision).with_origin(Origin::Local),
                Err(Error::RevisionConflict { expected, actual }) => {
                    session.note_revision_race(self.inner.config.max_revision_retries)?;
                    tracing::warn!(
                        document = %id,
                        expected,
                        actual,
                        races = session.revision_races(),
                        "Remote moved during commit, re-diffing"
                    );
                    let fresh = policy
                        .run("get_remote", move || store.get_remote(id_ref))
                        .await?;
                    session.restart(merged, fresh);
                    return Ok(None);
                }
                Err(error) => return Err(error.into()),
            }
        };

        self.write_local(&committed).await?;
        tracing::info!(
            document = %id,
            revision = committed.base_revision(),
            "Sync applied"
        );
        Ok(Some(committed))
    }

    async fn write_local(&self, snapshot: &DocumentSnapshot) -> SyncResult<()> {
        let store = &self.inner.local;
        let id = &snapshot.id;
        self.inner
            .config
            .network
            .run("put_local", move || store.put_local(id, snapshot))
            .await?;
        Ok(())
    }

    fn park(&self, session: SyncSession) {
        self.parked().insert(session.document_id(), session);
    }

    fn take_parked(&self, id: &DocumentId) -> SyncResult<SyncSession> {
        self.parked()
            .remove(id)
            .ok_or(SyncError::NoPendingSession(*id))
    }

    /// Drop a parked session if there is one
    fn discard(&self, id: &DocumentId) {
        let session = self.parked().remove(id);
        if let Some(session) = session {
            session.fail(SyncError::Cancelled);
            tracing::debug!(document = %id, "Discarded parked session");
        }
    }

    fn parked(&self) -> MutexGuard<'_, HashMap<DocumentId, SyncSession>> {
        self.inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Discards the parked session unless disarmed, so an abandoned wait
/// releases the document.
struct CancelOnDrop<'a> {
    orchestrator: &'a SyncOrchestrator,
    id: DocumentId,
    armed: bool,
}

impl<'a> CancelOnDrop<'a> {
    const fn new(orchestrator: &'a SyncOrchestrator, id: DocumentId) -> Self {
        Self {
            orchestrator,
            id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.discard(&self.id);
        }
    }
}
