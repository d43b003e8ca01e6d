//! Secretary CLI - a passphrase-protected store of secrets
//!
//! Runs the command interpreter either interactively or over commands
//! passed with `-c`.

mod cli;
mod config;
mod host;
mod render;
mod repl;

use std::io::{self, IsTerminal};
use std::path::Path;

use clap::{CommandFactory, Parser as _};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use secretary_core::Parser;

use crate::cli::{Cli, Commands};
use crate::config::load_config;
use crate::host::ConsoleHost;
use crate::render::UiContext;

const DEFAULT_FILTER: &str = "warn,secretary::trace=info";

/// Initialize the tracing subscriber; `RUST_LOG` overrides `default_level`.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "secretary", &mut io::stdout());
        return Ok(());
    }

    init_tracing(DEFAULT_FILTER);

    let config = load_config(cli.config.as_deref())?;
    let session = config.session(cli.database.as_deref(), cli.trace)?;
    if let Some(parent) = session.default_path.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create data directory {}: {}", parent.display(), e)
            })?;
        }
    }
    let no_color = std::env::var("NO_COLOR").is_ok();
    let ctx = UiContext {
        color: config.ui.color && !no_color && io::stdout().is_terminal(),
        quiet: cli.quiet,
    };

    let host = ConsoleHost::new(config.ui.editor.clone());
    let mut parser = Parser::new(Box::new(host), session);

    if !cli.commands.is_empty() {
        if !repl::run_commands(&mut parser, &ctx, &cli.commands) {
            std::process::exit(1);
        }
        return Ok(());
    }

    repl::run_repl(&mut parser, &ctx)
}
