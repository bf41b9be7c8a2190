use std::sync::Arc;

use quire_core::{PreferSide, ResolutionProvider, SyncConfig, SyncOrchestrator};

use crate::cli::Side;
use crate::commands::common::{open_stores, parse_document_id, DbPaths};
use crate::error::CliError;
use crate::prompt::PromptResolver;

pub async fn run_sync(
    id: &str,
    prefer: Option<Side>,
    as_json: bool,
    paths: &DbPaths,
) -> Result<(), CliError> {
    let id = parse_document_id(id)?;
    let config = SyncConfig::from_env()?;
    let stores = open_stores(paths).await?;
    let orchestrator =
        SyncOrchestrator::new(Arc::new(stores.local), Arc::new(stores.remote), config);

    let provider = resolution_provider(prefer);
    let snapshot = orchestrator.sync(id, provider.as_ref()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{id} synced at revision {}", snapshot.base_revision());
    }
    Ok(())
}

pub fn resolution_provider(prefer: Option<Side>) -> Box<dyn ResolutionProvider> {
    match prefer {
        Some(Side::Local) => Box::new(PreferSide::Local),
        Some(Side::Remote) => Box::new(PreferSide::Remote),
        None => Box::new(PromptResolver),
    }
}
