//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config = Config::load()?;

    // Determine output format
    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    let ctx = commands::Context {
        home: config.resolve_home(cli.home.as_deref())?,
        mint: config.mint_config(),
        output_format,
        verbose: cli.verbose,
    };

    debug!(
        home = %ctx.home.display(),
        output = %ctx.output_format,
        command = ?cli.command,
        "dispatching command"
    );

    match cli.command {
        Commands::Cert(args) => commands::cert::execute(ctx, args).await,
        Commands::Rootca(args) => commands::rootca::execute(ctx, args).await,
        Commands::Tool(args) => commands::tool::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, no_color: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}
