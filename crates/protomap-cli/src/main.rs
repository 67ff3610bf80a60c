//! Protomap CLI - command-line interface for protocol conversion
//!
//! This is the main entry point for the Protomap CLI application, providing
//! commands for converting payloads with mapping tables, checking tables and
//! inspecting the modules built from them.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LogSettings};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Set up colored output
    control::set_override(cli.use_color());

    let result = match load_config(&cli) {
        Ok(config) => {
            // Held until exit so buffered file logs are flushed
            let _guard = match init_logging(&cli, &config) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("Failed to initialize logging: {}", e);
                    None
                }
            };
            run(cli, config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

        if e.should_show_help() {
            eprintln!("\nFor more information, try '--help'");
        }

        process::exit(e.exit_code());
    }
}

/// Load the configuration file and apply command-line table source overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_with_file(cli.config.as_deref())?;
    if let Some(dir) = &cli.tables_dir {
        config.tables.directory = Some(dir.clone());
    }
    if let Some(remote) = &cli.remote_tables {
        config.tables.remote = Some(remote.clone());
    }
    Ok(config)
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet, config.output.progress);

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    match cli.command {
        Commands::Convert(args) => handlers::handle_convert(args, &config, &mut output).await,
        Commands::Check(args) => handlers::handle_check(args, &config, &mut output).await,
        Commands::Inspect(args) => handlers::handle_inspect(args, &config, &mut output).await,
        Commands::Validate(args) => handlers::handle_validate(args, &config, &mut output).await,
        Commands::Tables => handlers::handle_tables(&config, &mut output).await,
        Commands::Config(args) => {
            handlers::handle_config(args, &config, cli.config.as_deref(), &mut output).await
        }
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
///
/// Precedence from lowest to highest: `-v` flags, the `logging` section of
/// the configuration file, then environment variables.
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let verbosity = cli.verbosity_level();
    let mut settings = LogSettings::from_verbosity(verbosity);
    settings.merge_with_config(&config.logging, verbosity);
    settings.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        settings.level = "error".to_string();
        settings.console = false;
    }

    logging::init_logging(settings)
}
