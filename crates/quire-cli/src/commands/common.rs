use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use quire_core::db::{Database, LibSqlLocalStore, LibSqlRemoteStore};
use quire_core::{DocumentId, DocumentSnapshot, Field, FieldValue};
use serde::Serialize;

use crate::error::CliError;

const LOCAL_DB_ENV: &str = "QUIRE_LOCAL_DB";
const REMOTE_DB_ENV: &str = "QUIRE_REMOTE_DB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPaths {
    pub local: PathBuf,
    pub remote: PathBuf,
}

pub struct Stores {
    pub local: LibSqlLocalStore,
    pub remote: LibSqlRemoteStore,
}

#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: String,
    pub title: String,
    pub revision: Option<u64>,
    pub is_favorite: bool,
    pub updated_at: i64,
    pub relative_time: String,
}

/// Flag > environment > platform data directory
pub fn resolve_db_paths(
    local: Option<PathBuf>,
    remote: Option<PathBuf>,
) -> Result<DbPaths, CliError> {
    Ok(DbPaths {
        local: resolve_db_path(local, LOCAL_DB_ENV, "local.db")?,
        remote: resolve_db_path(remote, REMOTE_DB_ENV, "remote.db")?,
    })
}

fn resolve_db_path(
    cli_path: Option<PathBuf>,
    env_var: &str,
    file_name: &str,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_path.or_else(|| env::var_os(env_var).map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("quire").join(file_name))
        .ok_or(CliError::NoDataDir)
}

pub async fn open_stores(paths: &DbPaths) -> Result<Stores, CliError> {
    let local = open_database(&paths.local).await?;
    let remote = open_database(&paths.remote).await?;
    Ok(Stores {
        local: LibSqlLocalStore::new(local),
        remote: LibSqlRemoteStore::new(remote),
    })
}

async fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Database::open(path).await?))
}

pub fn parse_document_id(raw: &str) -> Result<DocumentId, CliError> {
    raw.parse::<DocumentId>()
        .map_err(|_| CliError::InvalidDocumentId(raw.trim().to_string()))
}

/// Interpret command-line text as a value for `field`
pub fn parse_field_value(field: Field, raw: &str) -> Result<FieldValue, CliError> {
    let invalid = |reason: &str| CliError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    match field {
        Field::Title => normalize_title(raw)
            .map(FieldValue::Text)
            .ok_or(CliError::EmptyTitle),
        Field::Content | Field::Font => Ok(FieldValue::Text(raw.to_string())),
        Field::Icon | Field::CoverImage => {
            let trimmed = raw.trim();
            Ok(if trimmed.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(trimmed.to_string())
            })
        }
        Field::IsFavorite => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(FieldValue::Flag(true)),
            "false" | "no" | "0" => Ok(FieldValue::Flag(false)),
            _ => Err(invalid("expected true or false")),
        },
    }
}

pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn short_id(id: &DocumentId) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn document_to_list_item(snapshot: &DocumentSnapshot) -> DocumentListItem {
    DocumentListItem {
        id: snapshot.id.to_string(),
        title: snapshot.fields.title.clone(),
        revision: snapshot.revision,
        is_favorite: snapshot.fields.is_favorite,
        updated_at: snapshot.updated_at,
        relative_time: format_relative_time(snapshot.updated_at, Utc::now().timestamp_millis()),
    }
}

pub fn format_document_lines(documents: &[DocumentSnapshot]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    documents
        .iter()
        .map(|snapshot| {
            let marker = if snapshot.fields.is_favorite { "*" } else { " " };
            format!(
                "{}{marker} {}  ({})",
                short_id(&snapshot.id),
                snapshot.fields.title,
                format_relative_time(snapshot.updated_at, now_ms)
            )
        })
        .collect()
}

/// One line per field, with the revision that last changed it
pub fn format_snapshot_detail(snapshot: &DocumentSnapshot) -> Vec<String> {
    let revision = snapshot
        .revision
        .map_or_else(|| "unsynced".to_string(), |revision| format!("revision {revision}"));
    let mut lines = vec![format!("{} ({}, {revision})", snapshot.id, snapshot.origin)];

    lines.extend(Field::ALL.into_iter().map(|field| {
        format!(
            "  {:<11} {}  [@{}]",
            field.as_str(),
            preview(&snapshot.value(field).to_string(), 60),
            snapshot.stamp(field)
        )
    }));
    lines
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
