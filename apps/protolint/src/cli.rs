//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "protolint",
    version,
    about = "Pluggable linter and fixer for Protocol Buffer files",
    long_about = "protolint checks .proto files against a catalog of style rules and can rewrite them in place to fix indentation.\n\nConfiguration precedence: CLI > .protolint.yaml|protolint.toml > defaults.",
    after_help = "Examples:\n  protolint lint proto/\n  protolint lint --fix api/v1/service.proto\n  protolint lint --output json --config-dir . proto/",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current protolint version.")]
    Version,
    /// List the rule catalog
    #[command(
        about = "List rules",
        long_about = "Print every known rule id, whether it is in the default set, and its purpose."
    )]
    List,
    /// Lint .proto files
    #[command(
        about = "Run lint checks",
        long_about = "Check .proto files with the configured rules. Directories are searched recursively. With --fix, fixable violations are rewritten in place and the files are checked again.",
        after_help = "Examples:\n  protolint lint proto/\n  protolint lint --fix proto/\n  protolint lint --output plain 'proto/**/*.proto'"
    )]
    Lint {
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Rewrite files to fix fixable violations")]
        fix: bool,
        #[arg(long, help = "Directory to start the config file search from (default: current dir)")]
        config_dir: Option<String>,
        #[arg(long, help = "Output mode: human|plain|json (default: human)")]
        output: Option<String>,
        #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Print per-file progress notes to stderr")]
        verbose: bool,
        #[arg(required = true, help = "Files, directories or glob patterns to lint")]
        paths: Vec<String>,
    },
}
