//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Command-line arguments

use crate::error::{Error, Result};
use protomap_core::{
    AgentConfig, Direction, MappingTableStore, ModuleConfig, ModuleValidation, TableSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where mapping tables are loaded from
    pub tables: TablesConfig,

    /// Defaults for the compatibility module built by each command
    pub module: ModuleDefaults,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Mapping table sources, searched after the bundled tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    /// Directory of `<name>.json` tables
    pub directory: Option<PathBuf>,

    /// Base URL of a remote table store
    pub remote: Option<String>,
}

/// Module settings applied when a command does not override them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleDefaults {
    /// Table used when `--table` is not given
    pub mapping_table: Option<String>,
    pub strict_mapping: bool,
    pub preserve_unknown_fields: bool,
    pub direction: Direction,
    pub enable_agents: bool,
    pub agent_config: AgentConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ModuleValidation>,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: String,

    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (compact, full, json)
    pub format: String,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            color: true,
            progress: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}

/// Serialization format of a configuration file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "yaml, yml, json or toml".to_string(),
            }),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, FileFormat::from_path(path)?)
    }

    /// Parse configuration text in the given format
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Ok(match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
            FileFormat::Toml => toml::from_str(content)?,
        })
    }

    /// Render configuration text in the given format
    pub fn render(&self, format: FileFormat) -> Result<String> {
        Ok(match format {
            FileFormat::Yaml => serde_yaml::to_string(self)?,
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    /// Load configuration from a specific file or the first default location found
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => match Self::discover() {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "Using discovered configuration file");
                    Self::from_file(&path)
                }
                None => Ok(Self::default()),
            },
        }
    }

    /// First existing configuration file among the default locations
    pub fn discover() -> Option<PathBuf> {
        Self::default_config_paths().into_iter().find(|p| p.is_file())
    }

    /// Get default configuration file paths to check
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = ["yaml", "yml", "json", "toml"]
            .iter()
            .map(|ext| PathBuf::from(format!(".protomap.{}", ext)))
            .collect();

        if let Some(dir) = Self::user_config_dir() {
            paths.extend(["yaml", "json", "toml"].iter().map(|ext| dir.join(format!("config.{}", ext))));
        }
        paths
    }

    /// `protomap` directory under the platform's user configuration directory
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("protomap"))
    }

    /// Build the table store: bundled tables, then the directory, then the remote store
    pub fn table_store(&self) -> Result<MappingTableStore> {
        let mut store = MappingTableStore::new();
        if let Some(dir) = &self.tables.directory {
            store = store.with_source(TableSource::Directory(dir.clone()));
        }
        if let Some(remote) = &self.tables.remote {
            let mut url = Url::parse(remote)
                .map_err(|e| Error::config(format!("Invalid remote table URL '{}': {}", remote, e)))?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            store = store.with_source(TableSource::Remote(url));
        }
        Ok(store)
    }

    /// Module configuration for `table`, falling back to the configured default table
    pub fn module_config(&self, table: Option<&str>) -> Result<ModuleConfig> {
        let name = table
            .or(self.module.mapping_table.as_deref())
            .ok_or_else(|| {
                Error::invalid_args("No mapping table given; pass --table or set module.mappingTable")
            })?;

        let mut config = ModuleConfig::new(name);
        config.strict_mapping = self.module.strict_mapping;
        config.preserve_unknown_fields = self.module.preserve_unknown_fields;
        config.direction = self.module.direction;
        config.enable_agents = self.module.enable_agents;
        config.agent_config = self.module.agent_config.clone();
        config.validation = self.module.validation.clone();
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.render(FileFormat::from_path(path)?)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_config_with_module_defaults() {
        let config = Config::parse(
            r#"
tables:
  directory: ./tables
module:
  mappingTable: openai-dashscope
  direction: bidirectional
  enableAgents: true
  agentConfig:
    enableCodeAgent: false
    defaultAgent: tool
"#,
            FileFormat::Yaml,
        )
        .unwrap();

        assert_eq!(config.tables.directory, Some(PathBuf::from("./tables")));
        assert_eq!(config.output, OutputConfig::default());

        let module = config.module_config(None).unwrap();
        assert_eq!(module.mapping_table, "openai-dashscope");
        assert_eq!(module.direction, Direction::Bidirectional);
        assert!(module.enable_agents);
        assert!(!module.agent_config.enable_code_agent);
        assert!(module.agent_config.enable_image_agent);

        let overridden = config.module_config(Some("openai-agent-task")).unwrap();
        assert_eq!(overridden.mapping_table, "openai-agent-task");
    }

    #[test]
    fn test_missing_table_is_invalid_args() {
        let err = Config::default().module_config(None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
    }

    #[test]
    fn test_save_and_reload_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.tables.remote = Some("https://tables.example.com/v1".to_string());
        config.module.strict_mapping = true;

        config.save(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_remote_url_gets_trailing_slash() {
        let mut config = Config::default();
        config.tables.remote = Some("https://tables.example.com/v1".to_string());
        let store = config.table_store().unwrap();
        let remote = store.sources().iter().find_map(|s| match s {
            TableSource::Remote(url) => Some(url.as_str().to_string()),
            _ => None,
        });
        assert_eq!(remote.as_deref(), Some("https://tables.example.com/v1/"));

        config.tables.remote = Some("not a url".to_string());
        assert!(matches!(config.table_store(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = FileFormat::from_path(Path::new("config.ini")).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }
}
