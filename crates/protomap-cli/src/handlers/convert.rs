//! Convert command handler

use super::{build_module, conversion_context, module_config, read_payload};
use crate::cli::{ConvertArgs, OutputFormat};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use protomap_core::Direction;
use std::fs;

/// Handle the convert command
pub async fn handle_convert(
    args: ConvertArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let mut module = module_config(&args.module, config)?;
    if args.preserve_unknown {
        module.preserve_unknown_fields = true;
    }
    if args.strict {
        module.strict_mapping = true;
    }
    if args.response {
        match args.module.direction {
            None => module.direction = Direction::Bidirectional,
            Some(_) if module.direction == Direction::Bidirectional => {}
            Some(_) => {
                return Err(Error::invalid_args(
                    "--response converts target responses back and needs --direction bidirectional",
                ))
            }
        }
    }

    let payload = read_payload(&args.input)?;
    let store = config.table_store()?;
    let module = build_module(module, &store, output).await?;
    for warning in module.derivation_warnings() {
        output.warning(&format!("Reverse mapping: {}", warning))?;
    }

    let ctx = conversion_context();
    let converted = {
        let _timer = Timer::with_details("convert", module.table().name());
        if args.response {
            module.convert_response(&payload, &ctx)?
        } else {
            module.convert_request(&payload, &ctx)?
        }
    };

    let kind = if args.response { "response" } else { "request" };
    output.success(&format!(
        "✓ Converted {} with '{}' ({})",
        kind,
        module.table().name(),
        module.direction()
    ))?;
    output.section("Converted Payload")?;
    output.data(&converted)?;

    if let Some(path) = args.save_to {
        let content = match output.format() {
            OutputFormat::Yaml => serde_yaml::to_string(&converted)?,
            _ => serde_json::to_string_pretty(&converted)?,
        };
        fs::write(&path, content)?;
        output.success(&format!("✓ Output saved to {}", path.display()))?;
    }

    Ok(())
}
