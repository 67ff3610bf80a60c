//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand,
//! plus the helpers they share for reading payloads and building modules.

mod check;
mod completions;
mod config;
mod convert;
mod inspect;
mod tables;
mod validate;

pub use check::handle_check;
pub use completions::handle_completions;
pub use config::handle_config;
pub use convert::handle_convert;
pub use inspect::handle_inspect;
pub use tables::handle_tables;
pub use validate::handle_validate;

use crate::cli::ModuleArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{current_request_id, redaction};
use crate::output::OutputWriter;
use protomap_core::{CompatibilityModule, ConversionContext, MappingTableStore, ModuleConfig};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Read a JSON or YAML payload from a file, or from stdin when the path is `-`
pub(crate) fn read_payload(path: &Path) -> Result<Value> {
    let (content, is_yaml) = if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        (content, false)
    } else {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        (std::fs::read_to_string(path)?, is_yaml_path(path))
    };

    let payload: Value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "YAML".to_string(),
        })?
    } else {
        serde_json::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "JSON".to_string(),
        })?
    };

    tracing::trace!(path = %path.display(), payload = %redaction::redacted(&payload), "Read payload");
    Ok(payload)
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false)
}

/// Module configuration from the config file defaults and command flags
pub(crate) fn module_config(args: &ModuleArgs, config: &Config) -> Result<ModuleConfig> {
    let mut module = config.module_config(args.table.as_deref())?;
    if let Some(direction) = args.direction {
        module.direction = direction.into();
    }
    if args.agents {
        module.enable_agents = true;
    }
    Ok(module)
}

/// Load the mapping table and build the module, with a spinner for slow sources
pub(crate) async fn build_module(
    module: ModuleConfig,
    store: &MappingTableStore,
    output: &mut OutputWriter,
) -> Result<CompatibilityModule> {
    let spinner = output.spinner(&format!("Loading mapping table '{}'...", module.mapping_table));
    let built = CompatibilityModule::initialize(module, store).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(built?)
}

/// Conversion context carrying this session's request ID
pub(crate) fn conversion_context() -> ConversionContext {
    match current_request_id() {
        Some(id) => ConversionContext::new().with_request_id(id),
        None => ConversionContext::new(),
    }
}
