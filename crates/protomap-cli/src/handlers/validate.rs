//! Validate command handler

use super::{build_module, module_config, read_payload};
use crate::cli::{ModuleArgs, ValidateArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;

/// Handle the validate command
///
/// Prints every problem found instead of stopping at the first one, then
/// fails with [`Error::ValidationFailed`] when the input is not valid.
pub async fn handle_validate(
    args: ValidateArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    output.info(&format!("Validating payload: {}", args.input.display()))?;

    let module_args = ModuleArgs {
        table: args.table,
        ..ModuleArgs::default()
    };
    let module = module_config(&module_args, config)?;
    let payload = read_payload(&args.input)?;
    let store = config.table_store()?;
    let module = build_module(module, &store, output).await?;

    let mut result = module.validate(&payload);
    if !args.show_output {
        result.transformed_data = None;
    }
    output.validation_result(&result)?;

    if result.is_valid {
        Ok(())
    } else {
        Err(Error::ValidationFailed {
            table: module.table().name().to_string(),
            errors: result.errors.len(),
        })
    }
}
