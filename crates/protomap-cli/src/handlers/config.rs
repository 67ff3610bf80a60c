//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigInitArgs, ConfigShowArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use std::path::{Path, PathBuf};

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &Config,
    config_file: Option<&Path>,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
        ConfigAction::Path => handle_config_path(config_file, output),
    }
}

/// Handle config init subcommand
fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = init_path(&args)?;

    if path.exists() && !args.force {
        return Err(Error::config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    starter_config().save(&path)?;
    output.success(&format!("✓ Created config at {}", path.display()))?;
    output.info("Set module.mappingTable to choose the default table for convert, inspect and validate")?;
    Ok(())
}

fn init_path(args: &ConfigInitArgs) -> Result<PathBuf> {
    let file_name = if args.user {
        format!("config.{}", args.format.extension())
    } else {
        format!(".protomap.{}", args.format.extension())
    };
    if args.user {
        let dir = Config::user_config_dir()
            .ok_or_else(|| Error::config("Unable to determine user config directory"))?;
        Ok(dir.join(file_name))
    } else {
        Ok(PathBuf::from(file_name))
    }
}

/// Defaults written by `config init`
fn starter_config() -> Config {
    let mut config = Config::default();
    config.module.mapping_table = Some("openai-dashscope".to_string());
    config
}

/// Handle config show subcommand
fn handle_config_show(args: ConfigShowArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let content = config.render(args.format.into())?;
    output.writeln(content.trim_end())
}

/// Handle config path subcommand
fn handle_config_path(config_file: Option<&Path>, output: &mut OutputWriter) -> Result<()> {
    let active = config_file.map(Path::to_path_buf).or_else(Config::discover);
    match &active {
        Some(path) => output.writeln(&format!("Using: {}", path.display()))?,
        None => output.writeln("Using: built-in defaults (no configuration file found)")?,
    }

    output.section("Search Locations")?;
    for path in Config::default_config_paths() {
        let marker = if path.is_file() { "✓" } else { "✗" };
        output.writeln(&format!("{} {}", marker, path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigFormat;
    use crate::config::FileFormat;

    #[test]
    fn test_init_paths() {
        let project = init_path(&ConfigInitArgs {
            user: false,
            format: ConfigFormat::Toml,
            force: false,
        })
        .unwrap();
        assert_eq!(project, PathBuf::from(".protomap.toml"));

        if let Some(dir) = Config::user_config_dir() {
            let user = init_path(&ConfigInitArgs {
                user: true,
                format: ConfigFormat::Yaml,
                force: false,
            })
            .unwrap();
            assert_eq!(user, dir.join("config.yaml"));
        }
    }

    #[test]
    fn test_starter_config_round_trips_through_every_format() {
        let config = starter_config();
        for format in [FileFormat::Yaml, FileFormat::Json, FileFormat::Toml] {
            let text = config.render(format).unwrap();
            assert_eq!(Config::parse(&text, format).unwrap(), config);
        }
    }
}
