//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API,
//! providing a type-safe and well-documented command interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Protomap CLI - convert LLM API payloads between protocols
///
/// Converts requests and responses between provider wire formats using
/// declarative mapping tables, and checks those tables before deployment.
#[derive(Parser, Debug)]
#[command(
    name = "protomap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PROTOMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory of mapping tables, searched after the bundled ones
    #[arg(long, global = true, value_name = "DIR")]
    pub tables_dir: Option<PathBuf>,

    /// Base URL of a remote mapping table store
    #[arg(long, global = true, value_name = "URL")]
    pub remote_tables: Option<String>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a request (or response) payload with a mapping table
    Convert(ConvertArgs),

    /// Load and compile a mapping table file and report on its reverse mapping
    Check(CheckArgs),

    /// Show compatibility info and field mappings for a table
    Inspect(InspectArgs),

    /// Validate a payload without failing on the first problem
    Validate(ValidateArgs),

    /// List mapping tables available from the configured sources
    Tables,

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Options shared by commands that build a compatibility module
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ModuleArgs {
    /// Mapping table name (defaults to module.mappingTable from the config)
    #[arg(short, long, value_name = "NAME")]
    pub table: Option<String>,

    /// Conversion direction
    #[arg(short, long, value_enum)]
    pub direction: Option<DirectionArg>,

    /// Enable agent routing
    #[arg(long)]
    pub agents: bool,
}

/// Arguments for the convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Payload file (JSON or YAML), or '-' for stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[command(flatten)]
    pub module: ModuleArgs,

    /// Treat the input as a response from the target protocol
    #[arg(long)]
    pub response: bool,

    /// Copy fields the table does not mention into the output
    #[arg(long)]
    pub preserve_unknown: bool,

    /// Reject fields the table does not mention
    #[arg(long)]
    pub strict: bool,

    /// Write the converted payload to a file
    #[arg(long = "save-to", value_name = "FILE")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Mapping table file (JSON or YAML)
    #[arg(value_name = "TABLE_FILE")]
    pub table_file: PathBuf,

    /// Derive the reverse mapping in strict mode
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Payload file (JSON or YAML), or '-' for stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Mapping table name (defaults to module.mappingTable from the config)
    #[arg(short, long, value_name = "NAME")]
    pub table: Option<String>,

    /// Print the converted payload when the input is valid
    #[arg(long)]
    pub show_output: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Print the configuration file in use and the search locations
    Path,
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Write to the user configuration directory instead of the current directory
    #[arg(long)]
    pub user: bool,

    /// File format to write
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Force overwrite existing config files
    #[arg(long)]
    pub force: bool,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Conversion direction
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Source protocol to target protocol
    AToB,
    /// Target protocol to source protocol
    BToA,
    /// Requests forward, responses back
    Bidirectional,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl From<DirectionArg> for protomap_core::Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::AToB => protomap_core::Direction::AToB,
            DirectionArg::BToA => protomap_core::Direction::BToA,
            DirectionArg::Bidirectional => protomap_core::Direction::Bidirectional,
        }
    }
}

impl From<ConfigFormat> for crate::config::FileFormat {
    fn from(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Yaml => crate::config::FileFormat::Yaml,
            ConfigFormat::Json => crate::config::FileFormat::Json,
            ConfigFormat::Toml => crate::config::FileFormat::Toml,
        }
    }
}

impl ConfigFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::parse_from([
            "protomap",
            "convert",
            "request.json",
            "--table",
            "openai-dashscope",
            "--direction",
            "bidirectional",
            "--response",
            "--save-to",
            "out.json",
        ]);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.module.table.as_deref(), Some("openai-dashscope"));
        assert_eq!(args.module.direction, Some(DirectionArg::Bidirectional));
        assert!(args.response);
        assert!(!args.module.agents);
        assert_eq!(args.save_to, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_global_table_sources() {
        let cli = Cli::parse_from([
            "protomap",
            "tables",
            "--tables-dir",
            "./tables",
            "--remote-tables",
            "https://tables.example.com/",
        ]);
        assert!(matches!(cli.command, Commands::Tables));
        assert_eq!(cli.tables_dir, Some(PathBuf::from("./tables")));
        assert_eq!(cli.remote_tables.as_deref(), Some("https://tables.example.com/"));
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli::parse_from(["protomap", "-vv", "tables"]);
        assert_eq!(cli.verbosity_level(), 2);

        let quiet = Cli::parse_from(["protomap", "--quiet", "tables"]);
        assert_eq!(quiet.verbosity_level(), 0);
    }

    #[test]
    fn test_direction_conversion() {
        assert_eq!(
            protomap_core::Direction::from(DirectionArg::BToA),
            protomap_core::Direction::BToA
        );
    }
}
