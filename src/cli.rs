use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "fln")]
#[command(
    about = "Build labeled method-level fault-localization corpora from buggy snapshots, coverage and suspiciousness scores"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./faultline.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing outputs
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build method catalogues from coverage (snippet.json, test_snippet.json, ...)
    Catalog(BatchArgs),

    /// Attach suspiciousness vectors to existing catalogues
    Attach(BatchArgs),

    /// Catalogue and attach in one pass
    Run(BatchArgs),

    /// Resolve one line of a Python file to its enclosing method
    Resolve(ResolveArgs),

    /// Initialize a faultline.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct BatchArgs {
    /// Only process these defects (repeatable, e.g. --defect ansible_1)
    #[arg(long = "defect", value_name = "NAME")]
    pub defects: Vec<String>,

    /// Defects processed in parallel
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Python source file
    pub file: PathBuf,

    /// 1-based line number
    pub line: usize,

    /// Directory the identity path is relative to (default: FILE as given)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to create config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
