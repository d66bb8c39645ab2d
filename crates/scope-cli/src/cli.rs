//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Scopes - Inspect and override a hierarchical configuration registry
#[derive(Parser, Debug)]
#[command(name = "scopes")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Per-key flags generated from the registry go after `--`, \
    e.g. `scopes -d defaults.toml show svc -- --svc.port 8080`.")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Declare scopes from a defaults file (TOML, JSON or YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub defaults: Vec<PathBuf>,

    /// Apply a settings file, after all defaults files
    #[arg(short, long, global = true, value_name = "FILE")]
    pub settings: Vec<PathBuf>,

    /// Set a value as SCOPE.KEY=VALUE, after all settings files
    ///
    /// A bare KEY=VALUE addresses the root scope.
    #[arg(long = "set", global = true, value_name = "SCOPE.KEY=VALUE")]
    pub assignments: Vec<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List scopes with their parents and tracked keys
    List,

    /// Print the resolved value of one key
    Get {
        /// Scope name (e.g. svc.api)
        scope: String,

        /// Key to resolve, inherited keys included
        key: String,
    },

    /// Show every key visible from a scope
    Show {
        /// Scope name (e.g. svc.api)
        scope: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List the per-key flags generated from the registry
    Flags,

    /// Show registry topology, unresolved markers included
    Tree,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get() {
        let cli = Cli::try_parse_from(["scopes", "get", "svc.api", "path"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Get {
                scope: "svc.api".into(),
                key: "path".into()
            })
        );
    }

    #[test]
    fn test_parse_global_options() {
        let cli = Cli::try_parse_from([
            "scopes",
            "--defaults",
            "d.toml",
            "--settings",
            "s.json",
            "--set",
            "svc.port=8080",
            "show",
            "svc",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.defaults, vec![PathBuf::from("d.toml")]);
        assert_eq!(cli.settings, vec![PathBuf::from("s.json")]);
        assert_eq!(cli.assignments, vec!["svc.port=8080"]);
        assert_eq!(
            cli.command,
            Some(Commands::Show {
                scope: "svc".into(),
                json: true
            })
        );
    }
}
