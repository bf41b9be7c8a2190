use quire_core::{LocalStore, RemoteStore};

use crate::commands::common::{format_snapshot_detail, open_stores, parse_document_id, DbPaths};
use crate::error::CliError;

pub async fn run_show(
    id: &str,
    remote: bool,
    as_json: bool,
    paths: &DbPaths,
) -> Result<(), CliError> {
    let id = parse_document_id(id)?;
    let stores = open_stores(paths).await?;
    let snapshot = if remote {
        stores.remote.get_remote(&id).await?
    } else {
        stores.local.get_local(&id).await?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for line in format_snapshot_detail(&snapshot) {
            println!("{line}");
        }
    }
    Ok(())
}
