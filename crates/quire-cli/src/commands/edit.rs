use quire_core::{Field, LocalStore, RemoteStore};

use crate::commands::common::{open_stores, parse_document_id, parse_field_value, DbPaths};
use crate::error::CliError;

/// Edit the local cache, or commit directly to the remote when `remote` is set
pub async fn run_edit(
    id: &str,
    field: &str,
    value: &str,
    remote: bool,
    paths: &DbPaths,
) -> Result<(), CliError> {
    let id = parse_document_id(id)?;
    let field = field.parse::<Field>()?;
    let value = parse_field_value(field, value)?;
    let stores = open_stores(paths).await?;

    if remote {
        let mut snapshot = stores.remote.get_remote(&id).await?;
        if snapshot.value(field) == value {
            println!("{id} unchanged");
            return Ok(());
        }
        snapshot.set_value(field, value)?;
        let revision = stores
            .remote
            .put_remote(&id, &snapshot, snapshot.base_revision())
            .await?;
        println!("{id} remote revision {revision}");
        return Ok(());
    }

    let mut snapshot = stores.local.get_local(&id).await?;
    if snapshot.edit(field, value)? {
        stores.local.put_local(&id, &snapshot).await?;
        println!("{id} edited locally");
    } else {
        println!("{id} unchanged");
    }
    Ok(())
}
