use quire_core::{DocumentFields, DocumentId, LocalStore};

use crate::commands::common::{normalize_title, open_stores, DbPaths};
use crate::error::CliError;

pub async fn run_new(title: &str, content: Option<&str>, paths: &DbPaths) -> Result<(), CliError> {
    let title = normalize_title(title).ok_or(CliError::EmptyTitle)?;
    let fields = DocumentFields {
        title,
        content: content.unwrap_or_default().to_string(),
        ..DocumentFields::default()
    };

    let stores = open_stores(paths).await?;
    let id = DocumentId::new();
    let snapshot = stores.remote.create(id, fields).await?;
    stores.local.put_local(&id, &snapshot).await?;

    tracing::debug!(document = %id, "Created document");
    println!("{id}");
    Ok(())
}
