//! CLI definitions and entry point.

use crate::config::CliOverrides;
use crate::suites::SuiteSelection;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Tree-equivalence oracle for remote file-storage command-line tools
#[derive(Parser, Debug)]
#[command(name = "tree-parity", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ./tree-parity.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Working area holding the fixture, reference and staging trees
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Issue commands through this interactive shell instead of per-command executables
    #[arg(long = "shell", id = "shell_program", value_name = "SHELL", global = true)]
    pub shell: Option<PathBuf>,

    /// Per-invocation timeout for the remote tool
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Append JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Config overrides carried by the global flags and the `run` flags.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let continue_on_failure = match &self.command {
            Commands::Run(args) if args.continue_on_failure => Some(true),
            _ => None,
        };
        CliOverrides {
            workdir: self.workdir.clone(),
            shell: self.shell.clone(),
            timeout_secs: self.timeout_secs,
            continue_on_failure,
            verbose: (self.verbose > 0).then_some(true),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenario families against the remote tool
    Run(RunArgs),

    /// Build the fixture tree and print its canonical snapshot
    Fixture(TreeArgs),

    /// Print the canonical snapshot of a local directory
    Snapshot(TreeArgs),

    /// Remove everything from the remote namespace and the working area
    Clean,

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Scenario family to run
    #[arg(long, value_enum, default_value_t = SuiteSelection::All)]
    pub suite: SuiteSelection,

    /// Reset and keep going after a failing scenario
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Leave both namespaces in place when the run ends
    #[arg(long)]
    pub keep: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Directory to operate on
    pub dir: PathBuf,
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
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}
