//! Scopes CLI
//!
//! Declares scopes from defaults files, applies settings files and
//! command-line overrides, then inspects the resulting registry.

mod binder;
mod cli;
mod commands;
mod error;

use std::ffi::OsString;

use clap::Parser;
use colored::Colorize;
use scope_core::Registry;
use scope_settings::SettingsDocument;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let (cli_args, overrides) = binder::split_overrides(std::env::args_os());
    let cli = Cli::parse_from(cli_args);

    init_tracing(cli.verbose);

    let registry = scope_core::global();
    prepare(registry, &cli, &overrides)?;

    match cli.command {
        Some(cmd) => execute_command(registry, cmd),
        None => {
            println!("{} Hierarchical configuration scopes", "scopes".green().bold());
            println!();
            println!("Run {} for available commands.", "scopes --help".cyan());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    // Diagnostics go to stderr so command output stays scriptable
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    if result.is_ok() {
        tracing::debug!(verbose, "Tracing initialized");
    }
}

/// Load defaults, settings, assignments and flags, in that order.
fn prepare(registry: &Registry, cli: &Cli, overrides: &[OsString]) -> Result<()> {
    for path in &cli.defaults {
        SettingsDocument::load(path)?.declare(registry)?;
    }
    scope_settings::load_all(&cli.settings, registry)?;
    binder::apply_assignments(registry, &cli.assignments)?;
    if !overrides.is_empty() {
        binder::apply_flags(registry, overrides)?;
    }
    Ok(())
}

fn execute_command(registry: &Registry, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::List => commands::run_list(registry),
        Commands::Get { scope, key } => commands::run_get(registry, &scope, &key),
        Commands::Show { scope, json } => commands::run_show(registry, &scope, json),
        Commands::Flags => commands::run_flags(registry),
        Commands::Tree => commands::run_tree(registry),
    }
}
