//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Edit issues and pull requests in bulk
#[derive(Parser, Debug)]
#[command(name = "ghi", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Select another repository using the OWNER/NAME format
    #[arg(short = 'R', long, global = true, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// GraphQL endpoint of the issue tracker
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Maximum concurrent updates (0 or less means 10)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Append JSON logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Edit one or more issues or pull requests
    Edit(EditArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for `ghi edit`.
///
/// Giving no field flag starts interactive mode, which needs a terminal and
/// exactly one selector.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Issue or pull request numbers (23, #23) or urls
    #[arg(required = true, value_name = "NUMBER | URL")]
    pub selectors: Vec<String>,

    /// Set the new title
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Set the new body
    #[arg(short = 'b', long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read body text from file (use "-" to read from standard input)
    #[arg(short = 'F', long, value_name = "FILE")]
    pub body_file: Option<PathBuf>,

    /// Add labels by name
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub add_label: Vec<String>,

    /// Remove labels by name
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub remove_label: Vec<String>,

    /// Add assigned users by their login. Use "@me" to assign yourself.
    #[arg(long, value_delimiter = ',', value_name = "LOGIN")]
    pub add_assignee: Vec<String>,

    /// Remove assigned users by their login. Use "@me" to unassign yourself.
    #[arg(long, value_delimiter = ',', value_name = "LOGIN")]
    pub remove_assignee: Vec<String>,

    /// Add to projects by title
    #[arg(long, value_delimiter = ',', value_name = "TITLE")]
    pub add_project: Vec<String>,

    /// Remove from projects by title
    #[arg(long, value_delimiter = ',', value_name = "TITLE")]
    pub remove_project: Vec<String>,

    /// Set the milestone by title (empty string removes it)
    #[arg(short = 'm', long, value_name = "TITLE")]
    pub milestone: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}
