use crate::commands::common::{
    document_to_list_item, format_document_lines, open_stores, DbPaths, DocumentListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, paths: &DbPaths) -> Result<(), CliError> {
    let stores = open_stores(paths).await?;
    let documents = stores.local.list(limit).await?;

    if as_json {
        let json_items = documents
            .iter()
            .map(document_to_list_item)
            .collect::<Vec<DocumentListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if documents.is_empty() {
        println!("No documents yet. Create one with `quire new --title <TITLE>`.");
    } else {
        for line in format_document_lines(&documents) {
            println!("{line}");
        }
    }

    Ok(())
}
