//! Clap derive structures for the `syncboard` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// syncboard -- manage projects, deviations, and additional tasks
#[derive(Debug, Parser)]
#[command(
    name = "syncboard",
    version,
    about = "Manage projects, deviations, and additional tasks from the command line",
    long_about = "Lists, filters, and edits the records of a syncboard data file.\n\n\
        Every change is applied to the local view first and then written\n\
        through the store; failures are reported and rolled back.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Data file to read and write (overrides config)
    #[arg(long, short = 'd', env = "SYNCBOARD_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long, env = "SYNCBOARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the configured one)
    #[arg(long, short = 'o', env = "SYNCBOARD_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage projects
    #[command(alias = "p")]
    Projects(KindArgs),

    /// Manage deviations
    #[command(alias = "dev")]
    Deviations(KindArgs),

    /// Manage additional tasks
    #[command(alias = "additional-tasks", alias = "t")]
    Tasks(KindArgs),

    /// Create an additional task from a deviation
    Convert {
        /// Deviation id
        deviation: String,
    },

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-kind commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KindArgs {
    #[command(subcommand)]
    pub command: KindCommand,
}

#[derive(Debug, Subcommand)]
pub enum KindCommand {
    /// List records, pinned first
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    Get {
        /// Record id
        id: String,
    },

    /// Create a record
    Create(FieldArgs),

    /// Change fields of a record
    Update {
        /// Record id
        id: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record id
        id: String,
    },

    /// Toggle the pinned flag (projects only)
    Pin {
        /// Record id
        id: String,
    },
}

/// Filters for list commands. All given filters must match.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive text search over the record's searchable fields
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Field filter as name=value, e.g. status=active (repeatable)
    #[arg(long, short = 'f', value_name = "NAME=VALUE")]
    pub filter: Vec<String>,
}

/// Field assignments for create and update.
#[derive(Debug, Args)]
pub struct FieldArgs {
    /// Set a text field, e.g. --set name="Harbor Bridge" (repeatable)
    #[arg(long = "set", value_name = "FIELD=TEXT")]
    pub set: Vec<String>,

    /// Set a field to a JSON value, e.g. --set-json pinned=true,
    /// --set-json project_id=4 (repeatable)
    #[arg(long = "set-json", value_name = "FIELD=JSON")]
    pub set_json: Vec<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value
    Set {
        /// Config key (dot-separated path, e.g. "defaults.output")
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }
}
