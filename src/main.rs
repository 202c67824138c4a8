use clap::Parser;
use std::io::{self, IsTerminal};
use tree_parity::cli::commands;
use tree_parity::cli::{Cli, Commands};
use tree_parity::config;
use tree_parity::logging::init_logging;
use tree_parity::output::OutputContext;
use tree_parity::{ParityError, StructuredError};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = dispatch(&cli) {
        handle_error(&e, cli.json);
    }
}

fn dispatch(cli: &Cli) -> tree_parity::Result<()> {
    match &cli.command {
        Commands::Fixture(args) => {
            let ctx = OutputContext::from_flags(cli.json, cli.quiet, cli.verbose > 0);
            commands::tree::execute_fixture(&args.dir, &ctx)
        }
        Commands::Snapshot(args) => {
            let ctx = OutputContext::from_flags(cli.json, cli.quiet, cli.verbose > 0);
            commands::tree::execute_snapshot(&args.dir, &ctx)
        }
        Commands::Version => commands::version::execute(&OutputContext::from_flags(cli.json, cli.quiet, false)),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Run(args) => {
            let config = config::load_config(cli.config.as_deref(), &cli.overrides())?;
            let ctx = OutputContext::from_flags(cli.json, cli.quiet, config.verbose);
            commands::run::execute(args, &config, &ctx)
        }
        Commands::Clean => {
            let config = config::load_config(cli.config.as_deref(), &cli.overrides())?;
            let ctx = OutputContext::from_flags(cli.json, cli.quiet, config.verbose);
            commands::clean::execute(&config, &ctx)
        }
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &ParityError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
