//! libSQL-backed document stores

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{params, Value};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{DocumentFields, DocumentId, DocumentSnapshot, Field, Origin, Revision};
use crate::store::{LocalStore, RemoteStore};

const LOCAL_COLUMNS: &str = "id, revision, fields, modified, updated_at";

/// Local document cache stored in `local_documents`
#[derive(Clone)]
pub struct LibSqlLocalStore {
    db: Arc<Database>,
}

impl LibSqlLocalStore {
    /// Create a store over an opened database
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List cached documents, most recently changed first
    pub async fn list(&self, limit: usize) -> Result<Vec<DocumentSnapshot>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .db
            .connection()
            .query(
                &format!(
                    "SELECT {LOCAL_COLUMNS} FROM local_documents ORDER BY updated_at DESC LIMIT ?1"
                ),
                params![limit],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(parse_snapshot(&row, Origin::Local)?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl LocalStore for LibSqlLocalStore {
    async fn get_local(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        let mut rows = self
            .db
            .connection()
            .query(
                &format!("SELECT {LOCAL_COLUMNS} FROM local_documents WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => parse_snapshot(&row, Origin::Local),
            None => Err(Error::NotFound(*id)),
        }
    }

    async fn put_local(&self, id: &DocumentId, snapshot: &DocumentSnapshot) -> Result<()> {
        let revision = match snapshot.revision {
            Some(revision) => Value::Integer(to_sql_revision(revision)?),
            None => Value::Null,
        };

        self.db
            .connection()
            .execute(
                "INSERT INTO local_documents (id, revision, fields, modified, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    revision = excluded.revision,
                    fields = excluded.fields,
                    modified = excluded.modified,
                    updated_at = excluded.updated_at",
                params![
                    id.as_str(),
                    revision,
                    serde_json::to_string(&snapshot.fields)?,
                    serde_json::to_string(&snapshot.modified)?,
                    snapshot.updated_at
                ],
            )
            .await?;

        Ok(())
    }
}

/// Authoritative copies stored in `remote_documents`
#[derive(Clone)]
pub struct LibSqlRemoteStore {
    db: Arc<Database>,
}

impl LibSqlRemoteStore {
    /// Create a store over an opened database
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a document at revision 1 with every field stamped 1
    pub async fn create(&self, id: DocumentId, fields: DocumentFields) -> Result<DocumentSnapshot> {
        let mut snapshot = DocumentSnapshot::new(id, Origin::Remote, fields);
        snapshot.revision = Some(1);
        snapshot.modified = Field::ALL.into_iter().map(|field| (field, 1)).collect();

        self.db
            .connection()
            .execute(
                "INSERT INTO remote_documents (id, revision, fields, modified, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.as_str(),
                    1i64,
                    serde_json::to_string(&snapshot.fields)?,
                    serde_json::to_string(&snapshot.modified)?,
                    snapshot.updated_at
                ],
            )
            .await?;

        Ok(snapshot)
    }
}

#[async_trait]
impl RemoteStore for LibSqlRemoteStore {
    async fn get_remote(&self, id: &DocumentId) -> Result<DocumentSnapshot> {
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT id, revision, fields, modified, updated_at
                 FROM remote_documents WHERE id = ?1",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => parse_snapshot(&row, Origin::Remote),
            None => Err(Error::NotFound(*id)),
        }
    }

    async fn put_remote(
        &self,
        id: &DocumentId,
        snapshot: &DocumentSnapshot,
        expected_revision: Revision,
    ) -> Result<Revision> {
        let current = self.get_remote(id).await?;
        let actual = current.base_revision();
        if actual != expected_revision {
            return Err(Error::RevisionConflict {
                expected: expected_revision,
                actual,
            });
        }

        let revision = actual + 1;
        let stored = snapshot.committed(&current, revision);
        let now = chrono::Utc::now().timestamp_millis();

        // Conditional on the expected revision so a concurrent writer cannot be overwritten
        let rows = self
            .db
            .connection()
            .execute(
                "UPDATE remote_documents
                 SET revision = ?1, fields = ?2, modified = ?3, updated_at = ?4
                 WHERE id = ?5 AND revision = ?6",
                params![
                    to_sql_revision(revision)?,
                    serde_json::to_string(&stored.fields)?,
                    serde_json::to_string(&stored.modified)?,
                    now,
                    id.as_str(),
                    to_sql_revision(expected_revision)?
                ],
            )
            .await?;

        if rows == 0 {
            let actual = self.get_remote(id).await?.base_revision();
            return Err(Error::RevisionConflict {
                expected: expected_revision,
                actual,
            });
        }

        Ok(revision)
    }
}

fn to_sql_revision(revision: Revision) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| Error::InvalidInput(format!("Revision {revision} exceeds storage range")))
}

fn from_sql_revision(value: i64) -> Result<Revision> {
    Revision::try_from(value)
        .map_err(|_| Error::Database(format!("Negative revision in storage: {value}")))
}

/// Parse a snapshot from a row selected as `id, revision, fields, modified, updated_at`
fn parse_snapshot(row: &libsql::Row, origin: Origin) -> Result<DocumentSnapshot> {
    let id: String = row.get(0)?;
    let id = id
        .parse()
        .map_err(|_| Error::Database(format!("Invalid document id in storage: {id}")))?;

    let revision = match row.get_value(1)? {
        Value::Null => None,
        Value::Integer(value) => Some(from_sql_revision(value)?),
        other => {
            return Err(Error::Database(format!(
                "Unexpected revision value in storage: {other:?}"
            )));
        }
    };

    let fields: DocumentFields = serde_json::from_str(&row.get::<String>(2)?)?;
    let modified: BTreeMap<Field, Revision> = serde_json::from_str(&row.get::<String>(3)?)?;

    Ok(DocumentSnapshot {
        id,
        origin,
        revision,
        fields,
        modified,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> Arc<Database> {
        Arc::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_put_and_get_roundtrip() {
        let store = LibSqlLocalStore::new(setup().await);
        let id = DocumentId::new();

        let mut snapshot = DocumentSnapshot::new(id, Origin::Local, DocumentFields::default());
        snapshot.edit(Field::Title, "Offline draft").unwrap();
        store.put_local(&id, &snapshot).await.unwrap();

        let loaded = store.get_local(&id).await.unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.revision, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_put_overwrites_existing() {
        let store = LibSqlLocalStore::new(setup().await);
        let id = DocumentId::new();

        let mut snapshot = DocumentSnapshot::new(id, Origin::Local, DocumentFields::default());
        store.put_local(&id, &snapshot).await.unwrap();

        snapshot.revision = Some(3);
        snapshot.fields.is_favorite = true;
        store.put_local(&id, &snapshot).await.unwrap();

        let loaded = store.get_local(&id).await.unwrap();
        assert_eq!(loaded.revision, Some(3));
        assert!(loaded.fields.is_favorite);
        assert_eq!(store.list(10).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_missing_is_not_found() {
        let store = LibSqlLocalStore::new(setup().await);
        let err = store.get_local(&DocumentId::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_create_and_put() {
        let store = LibSqlRemoteStore::new(setup().await);
        let id = DocumentId::new();
        let created = store.create(id, DocumentFields::default()).await.unwrap();
        assert_eq!(created.revision, Some(1));

        let mut next = created.clone();
        next.set_value(Field::Content, "[{\"type\":\"paragraph\"}]".into())
            .unwrap();
        let revision = store.put_remote(&id, &next, 1).await.unwrap();
        assert_eq!(revision, 2);

        let stored = store.get_remote(&id).await.unwrap();
        assert_eq!(stored.revision, Some(2));
        assert_eq!(stored.origin, Origin::Remote);
        assert_eq!(stored.stamp(Field::Content), 2);
        assert_eq!(stored.stamp(Field::Title), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_put_with_stale_revision_conflicts() {
        let store = LibSqlRemoteStore::new(setup().await);
        let id = DocumentId::new();
        let created = store.create(id, DocumentFields::default()).await.unwrap();
        store.put_remote(&id, &created, 1).await.unwrap();

        let err = store.put_remote(&id, &created, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RevisionConflict {
                expected: 1,
                actual: 2
            }
        ));
    }
}
