//! Tables command handler

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use protomap_core::{MappingTableStore, TableSource};
use serde::Serialize;

/// One listed table; `error` is set when it fails to compile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableListing {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formats: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handle the tables command
pub async fn handle_tables(config: &Config, output: &mut OutputWriter) -> Result<()> {
    let store = config.table_store()?;
    let listings = list_tables(&store);

    if store.sources().iter().any(|s| matches!(s, TableSource::Remote(_))) {
        output.info("Remote tables are loaded on demand and are not listed")?;
    }

    if output.format() != crate::cli::OutputFormat::Human {
        return output.data(&listings);
    }

    let rows = listings
        .iter()
        .map(|t| {
            vec![
                t.name.clone(),
                t.version.clone().unwrap_or_default(),
                t.formats.clone().or_else(|| t.error.clone()).unwrap_or_default(),
            ]
        })
        .collect();
    output.table(&["Name", "Version", "Formats"], rows)
}

fn list_tables(store: &MappingTableStore) -> Vec<TableListing> {
    store
        .list()
        .into_iter()
        .map(|name| match store.load_sync(&name) {
            Ok(table) => TableListing {
                version: Some(table.version().to_string()),
                formats: Some(format!("{} -> {}", table.formats().source, table.formats().target)),
                error: None,
                name,
            },
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "Listed table failed to load");
                TableListing {
                    version: None,
                    formats: None,
                    error: Some(e.to_string()),
                    name,
                }
            }
        })
        .collect()
}
