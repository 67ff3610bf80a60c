//! Mapping table store
//!
//! Loads named mapping tables from the configured sources, compiles them once,
//! and hands out shared immutable copies. Sources are searched in the order
//! they were added and the first one holding the name wins.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::table::MappingTable;
use super::transformer::FunctionRegistry;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Tables compiled into the crate
pub const BUILTIN_TABLES: &[(&str, &str)] = &[
    (
        "openai-dashscope",
        include_str!("../../mapping-tables/openai-dashscope.json"),
    ),
    (
        "openai-agent-task",
        include_str!("../../mapping-tables/openai-agent-task.json"),
    ),
];

/// Where mapping table documents come from
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Tables bundled with the crate
    Builtin,
    /// A single table file, named by its file stem
    File(PathBuf),
    /// `<dir>/<name>.json`
    Directory(PathBuf),
    /// Documents embedded in configuration
    Inline(HashMap<String, Value>),
    /// `GET <base>/<name>.json`
    Remote(Url),
}

impl TableSource {
    fn describe(&self) -> String {
        match self {
            TableSource::Builtin => "builtin".to_string(),
            TableSource::File(path) => format!("file {}", path.display()),
            TableSource::Directory(dir) => format!("directory {}", dir.display()),
            TableSource::Inline(_) => "inline".to_string(),
            TableSource::Remote(base) => format!("remote {}", base),
        }
    }
}

/// Loads, compiles, and caches mapping tables
#[derive(Debug)]
pub struct MappingTableStore {
    sources: Vec<TableSource>,
    registry: Arc<FunctionRegistry>,
    cache: RwLock<HashMap<String, Arc<MappingTable>>>,
    client: Option<reqwest::Client>,
}

impl Default for MappingTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingTableStore {
    /// A store serving the bundled tables
    pub fn new() -> Self {
        Self::empty().with_source(TableSource::Builtin)
    }

    /// A store with no sources
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            registry: FunctionRegistry::builtin(),
            cache: RwLock::new(HashMap::new()),
            client: None,
        }
    }

    /// Add a source searched after the existing ones
    pub fn with_source(mut self, source: TableSource) -> Self {
        if matches!(source, TableSource::Remote(_)) && self.client.is_none() {
            self.client = Some(reqwest::Client::new());
        }
        self.sources.push(source);
        self
    }

    /// Compile tables against a custom function registry
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn sources(&self) -> &[TableSource] {
        &self.sources
    }

    pub fn registry(&self) -> Arc<FunctionRegistry> {
        self.registry.clone()
    }

    /// Load a table from any source, including remote ones
    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn load(&self, name: &str) -> Result<Arc<MappingTable>> {
        check_name(name)?;
        if let Some(table) = self.cached(name) {
            return Ok(table);
        }

        for source in &self.sources {
            let document = match source {
                TableSource::Remote(base) => self.fetch_remote(base, name).await?,
                TableSource::File(path) if file_matches(path, name) => {
                    Some(read_document(name, &tokio::fs::read_to_string(path).await?)?)
                }
                TableSource::Directory(dir) => {
                    let path = table_path(dir, name);
                    if tokio::fs::try_exists(&path).await? {
                        Some(read_document(name, &tokio::fs::read_to_string(&path).await?)?)
                    } else {
                        None
                    }
                }
                local => load_local(local, name)?,
            };

            if let Some(document) = document {
                return self.compile_and_cache(name, &document, source);
            }
        }

        Err(self.not_found(name))
    }

    /// Load a table from the non-remote sources without an async runtime
    pub fn load_sync(&self, name: &str) -> Result<Arc<MappingTable>> {
        check_name(name)?;
        if let Some(table) = self.cached(name) {
            return Ok(table);
        }

        for source in &self.sources {
            if let Some(document) = load_local(source, name)? {
                return self.compile_and_cache(name, &document, source);
            }
        }

        Err(self.not_found(name))
    }

    /// Names of every table available from local sources, sorted
    ///
    /// Remote stores cannot be enumerated and contribute nothing.
    pub fn list(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for source in &self.sources {
            match source {
                TableSource::Builtin => {
                    names.extend(BUILTIN_TABLES.iter().map(|(name, _)| name.to_string()));
                }
                TableSource::File(path) => {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.insert(stem.to_string());
                    }
                }
                TableSource::Directory(dir) => match std::fs::read_dir(dir) {
                    Ok(entries) => {
                        for entry in entries.filter_map(|e| e.ok()) {
                            let path = entry.path();
                            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                                    names.insert(stem.to_string());
                                }
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to list mapping tables in {}: {}", dir.display(), e);
                    }
                },
                TableSource::Inline(tables) => names.extend(tables.keys().cloned()),
                TableSource::Remote(_) => {}
            }
        }
        names.into_iter().collect()
    }

    fn cached(&self, name: &str) -> Option<Arc<MappingTable>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn compile_and_cache(&self, name: &str, document: &Value, source: &TableSource) -> Result<Arc<MappingTable>> {
        let table = Arc::new(MappingTable::compile(name, document, self.registry.clone())?);
        tracing::info!(
            table = name,
            version = table.version(),
            source = %source.describe(),
            "Loaded mapping table"
        );
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), table.clone());
        Ok(table)
    }

    async fn fetch_remote(&self, base: &Url, name: &str) -> Result<Option<Value>> {
        let Some(client) = &self.client else {
            return Ok(None);
        };
        let url = base.join(&format!("{}.json", name)).map_err(|e| Error::Configuration {
            message: format!("Cannot build table URL from base '{}'", base),
            source: Some(e.into()),
        })?;

        let response = client.get(url.clone()).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                message: format!("Fetching mapping table from {} returned {}", url, status),
                status_code: Some(status.as_u16()),
                source: None,
            });
        }
        let text = response.text().await?;
        read_document(name, &text).map(Some)
    }

    fn not_found(&self, name: &str) -> Error {
        let sources = self
            .sources
            .iter()
            .map(TableSource::describe)
            .collect::<Vec<_>>()
            .join(", ");
        let available = self.list();
        Error::configuration(format!(
            "Mapping table '{}' not found in [{}]; available: {}",
            name,
            sources,
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        ))
    }
}

/// Document for `name` from a source that needs no network access
fn load_local(source: &TableSource, name: &str) -> Result<Option<Value>> {
    match source {
        TableSource::Builtin => BUILTIN_TABLES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| read_document(name, text))
            .transpose(),
        TableSource::File(path) if file_matches(path, name) => {
            let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
                message: format!("Failed to read mapping table from {}", path.display()),
                source: e,
            })?;
            read_document(name, &text).map(Some)
        }
        TableSource::File(_) => Ok(None),
        TableSource::Directory(dir) => {
            let path = table_path(dir, name);
            if !path.is_file() {
                return Ok(None);
            }
            let text = std::fs::read_to_string(&path).map_err(|e| Error::Io {
                message: format!("Failed to read mapping table from {}", path.display()),
                source: e,
            })?;
            read_document(name, &text).map(Some)
        }
        TableSource::Inline(tables) => Ok(tables.get(name).cloned()),
        TableSource::Remote(_) => Ok(None),
    }
}

fn read_document(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::Configuration {
        message: format!("Mapping table '{}' is not valid JSON", name),
        source: Some(e.into()),
    })
}

fn file_matches(path: &Path, name: &str) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(name)
}

fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

/// Table names are plain identifiers, never paths
fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::configuration(format!("Invalid mapping table name '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn document(description: &str) -> Value {
        json!({
            "version": "1.0",
            "description": description,
            "formats": {"source": "a", "target": "b"},
            "fieldMappings": {"model": "model"}
        })
    }

    #[test]
    fn test_builtin_tables_load() {
        let store = MappingTableStore::new();
        for name in store.list() {
            let table = store.load_sync(&name).unwrap();
            assert_eq!(table.name(), name);
        }
        assert!(store.list().contains(&"openai-dashscope".to_string()));
    }

    #[test]
    fn test_cache_returns_shared_table() {
        let store = MappingTableStore::new();
        let first = store.load_sync("openai-dashscope").unwrap();
        let second = store.load_sync("openai-dashscope").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_table_is_configuration_error() {
        let err = MappingTableStore::new().load_sync("nope").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("'nope' not found"));
    }

    #[test]
    fn test_path_like_names_rejected() {
        let store = MappingTableStore::new();
        assert!(store.load_sync("../secrets").is_err());
        assert!(store.load_sync("a/b").is_err());
    }

    #[test]
    fn test_directory_source_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("openai-dashscope.json"),
            document("local override").to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = MappingTableStore::empty()
            .with_source(TableSource::Directory(dir.path().to_path_buf()))
            .with_source(TableSource::Builtin);
        let table = store.load_sync("openai-dashscope").unwrap();
        assert_eq!(table.description(), "local override");
        assert!(!store.list().contains(&"notes".to_string()));
    }

    #[test]
    fn test_file_and_inline_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, document("from file").to_string()).unwrap();

        let mut inline = HashMap::new();
        inline.insert("embedded".to_string(), document("inline"));

        let store = MappingTableStore::empty()
            .with_source(TableSource::File(path))
            .with_source(TableSource::Inline(inline));
        assert_eq!(store.list(), vec!["custom".to_string(), "embedded".to_string()]);
        assert_eq!(store.load_sync("custom").unwrap().description(), "from file");
        assert_eq!(store.load_sync("embedded").unwrap().description(), "inline");
    }

    #[test]
    fn test_malformed_table_rejected() {
        let mut inline = HashMap::new();
        inline.insert("broken".to_string(), json!({"version": "1"}));
        let store = MappingTableStore::empty().with_source(TableSource::Inline(inline));
        let err = store.load_sync("broken").unwrap_err();
        assert!(err.to_string().contains("missing 'description'"));
    }

    #[tokio::test]
    async fn test_async_load_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("async-table.json"), document("async").to_string()).unwrap();
        let store = MappingTableStore::empty().with_source(TableSource::Directory(dir.path().to_path_buf()));
        let table = store.load("async-table").await.unwrap();
        assert_eq!(table.description(), "async");
    }
}
