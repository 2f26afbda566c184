use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the tagflush binary.
#[derive(Debug, Parser)]
#[command(
    name = "tagflush",
    version,
    about = "Tag-based content cache invalidation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TAGFLUSH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Replay the changes of a fixture and flush the affected cache entries.
    Replay(ReplayArgs),
    /// Print the node type names implemented by a type, itself first.
    Supertypes(SupertypesArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    /// Fixture describing content, cache entries and changes.
    #[arg(value_name = "FIXTURE", value_hint = ValueHint::FilePath)]
    pub fixture: PathBuf,

    /// Print the pending tags instead of flushing them.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SupertypesArgs {
    /// Fixture providing the node type definitions.
    #[arg(value_name = "FIXTURE", value_hint = ValueHint::FilePath)]
    pub fixture: PathBuf,

    /// Node type to resolve.
    #[arg(value_name = "TYPE")]
    pub node_type: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Enable or disable tag registration.
    #[arg(
        long = "flusher-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub flusher_enabled: Option<bool>,

    /// Override the number of entries the in-memory store keeps.
    #[arg(long = "store-capacity", value_name = "COUNT", global = true)]
    pub store_capacity: Option<u64>,
}
