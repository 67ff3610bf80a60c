//! Inspect command handler

use super::{build_module, module_config};
use crate::cli::InspectArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{FieldRow, InspectReport, OutputWriter};
use protomap_core::CompatibilityModule;

/// Handle the inspect command
pub async fn handle_inspect(args: InspectArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let module = module_config(&args.module, config)?;
    let store = config.table_store()?;
    let module = build_module(module, &store, output).await?;

    output.inspect_report(&inspect_report(&module))
}

fn inspect_report(module: &CompatibilityModule) -> InspectReport {
    let field_mappings = module
        .field_mappings()
        .iter()
        .map(|entry| FieldRow {
            source: entry.source_field.clone(),
            target: entry.mapping.target_field.clone(),
            transform: entry.mapping.transform.clone(),
            required: entry.mapping.required,
        })
        .collect();

    InspectReport {
        info: module.compatibility_info(),
        field_mappings,
        reverse_warnings: module
            .derivation_warnings()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protomap_core::{Direction, MappingTableStore, ModuleConfig};

    #[test]
    fn test_inspect_builtin_table() {
        let mut config = ModuleConfig::new("openai-dashscope");
        config.direction = Direction::Bidirectional;
        let module = CompatibilityModule::new(config, &MappingTableStore::new()).unwrap();

        let report = inspect_report(&module);
        assert_eq!(report.info.mapping_table, "openai-dashscope");
        assert_eq!(report.info.supported_conversions.len(), 2);
        assert!(!report.info.agent_enabled);

        let model = report.field_mappings.iter().find(|row| row.source == "model").unwrap();
        assert_eq!(model.target, "model");
        assert_eq!(model.transform.as_deref(), Some("model_names"));
        assert!(model.required);
        // Authored reverse mappings produce no derivation warnings
        assert!(report.reverse_warnings.is_empty());
    }
}
