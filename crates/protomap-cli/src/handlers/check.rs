//! Check command handler
//!
//! Compiles a mapping table file the same way the table store would and
//! reports how its reverse mapping is obtained.

use super::read_payload;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{CheckReport, OutputWriter, ReverseSummary};
use protomap_core::translation::reverse_table;
use protomap_core::MappingTable;
use std::path::Path;

/// Handle the check command
pub async fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    output.info(&format!("Checking mapping table: {}", args.table_file.display()))?;

    let name = table_name(&args.table_file)?;
    let document = read_payload(&args.table_file)?;
    let store = config.table_store()?;
    let table = MappingTable::compile(&name, &document, store.registry())?;
    let report = check_report(&table, args.strict)?;

    tracing::info!(
        table = %report.name,
        field_mappings = report.field_mappings,
        reverse_warnings = report.reverse.warnings.len(),
        "Mapping table checked"
    );
    output.check_report(&report)
}

/// Table name from the file stem, as a directory source would name it
fn table_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_args(format!("Cannot derive a table name from {}", path.display())))
}

fn check_report(table: &MappingTable, strict: bool) -> Result<CheckReport> {
    let reverse = reverse_table(table, strict)?;

    let mut required_fields: Vec<String> = table
        .entries()
        .iter()
        .filter(|entry| entry.mapping.required)
        .map(|entry| entry.source_field.clone())
        .collect();
    for field in &table.validation_rules().required {
        if !required_fields.contains(field) {
            required_fields.push(field.clone());
        }
    }

    Ok(CheckReport {
        name: table.name().to_string(),
        version: table.version().to_string(),
        description: table.description().to_string(),
        source_format: table.formats().source.clone(),
        target_format: table.formats().target.clone(),
        field_mappings: table.entries().len(),
        transforms: table.transforms().len(),
        required_fields,
        reverse: ReverseSummary {
            authored: !reverse.derived,
            field_mappings: reverse.table.entries().len(),
            warnings: reverse.warnings.iter().map(ToString::to_string).collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "version": "1.0.0",
            "description": "Chat to completion",
            "formats": {"source": "chat", "target": "completion"},
            "fieldMappings": {
                "model": {"targetField": "engine", "required": true},
                "finish": {"targetField": "stop_reason", "transform": "finishMap"}
            },
            "transformFunctions": {
                "finishMap": {"type": "mapping", "mappings": {"stop": "end_turn"}}
            },
            "validationRules": {"required": ["messages"]}
        })
    }

    #[test]
    fn test_report_for_derived_reverse() {
        let table = MappingTable::from_value("chat-completion", &document()).unwrap();
        let report = check_report(&table, false).unwrap();

        assert_eq!(report.name, "chat-completion");
        assert_eq!(report.source_format, "chat");
        assert_eq!(report.field_mappings, 2);
        assert_eq!(report.transforms, 1);
        assert_eq!(report.required_fields, vec!["model".to_string(), "messages".to_string()]);
        assert!(!report.reverse.authored);
        assert_eq!(report.reverse.field_mappings, 2);
        assert_eq!(report.reverse.warnings.len(), 1);
        assert!(report.reverse.warnings[0].contains("finishMap"));
    }

    #[test]
    fn test_strict_check_rejects_dropped_transform() {
        let table = MappingTable::from_value("chat-completion", &document()).unwrap();
        let err = check_report(&table, true).unwrap_err();
        assert!(matches!(err, Error::Core(protomap_core::Error::Configuration { .. })));
    }

    #[test]
    fn test_table_name_from_file_stem() {
        assert_eq!(table_name(Path::new("tables/my-table.json")).unwrap(), "my-table");
    }
}
