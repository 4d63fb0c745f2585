//! Command-line interface for forge.
//!
//! ```text
//! forge [--verbose|--quiet] [--config PATH] <command>
//!
//!   skills   list, show and edit SKILL.md files
//!   mcp      list, edit and probe MCP server registries
//!   package  inspect and install .dxt / .mcpb packages
//!   config   show or create the forge configuration
//! ```
//!
//! Every command except `config` loads the configuration once, builds a
//! [`Forge`] from it and runs against that. Paths given on the command line
//! are authorized by the same rules as any other caller; the CLI gets no
//! extra access.
//!
//! Log lines go to stderr. `--verbose` selects `debug`, `--quiet` selects
//! `error`, otherwise `RUST_LOG` applies and falls back to `warn`.

mod common;
mod config;
mod mcp;
mod package;
mod skills;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::service::Forge;
use common::ForgeCommand;

const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Manage Claude skills, MCP server registries and MCP packages.
#[derive(Parser)]
#[command(
    name = "forge",
    about = "Manage Claude skills, MCP server registries and MCP packages",
    version,
    long_about = "forge reads and edits skill files and MCP server registries inside the \
                  directories listed in its configuration, and installs .dxt/.mcpb packages."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the forge configuration file (default: ~/.forge/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List, show and edit skills
    Skills(skills::SkillsCommand),

    /// List, edit and probe MCP servers
    Mcp(mcp::McpCommand),

    /// Inspect and install MCP packages
    Package(package::PackageCommand),

    /// Show or create the forge configuration
    Config(config::ConfigCommand),
}

impl Cli {
    /// Install logging, then run the selected command.
    pub async fn execute(self) -> Result<()> {
        init_logging(&self.log_directive());
        self.execute_without_logging().await
    }

    /// Run the selected command with whatever subscriber is installed.
    pub async fn execute_without_logging(self) -> Result<()> {
        match self.command {
            Commands::Config(cmd) => cmd.execute(self.config),
            Commands::Skills(cmd) => cmd.execute(&Forge::load(self.config)?).await,
            Commands::Mcp(cmd) => cmd.execute(&Forge::load(self.config)?).await,
            Commands::Package(cmd) => cmd.execute(&Forge::load(self.config)?).await,
        }
    }

    /// The `EnvFilter` directive selected by the global flags.
    #[must_use]
    pub fn log_directive(&self) -> String {
        log_directive(self.verbose, self.quiet, std::env::var("RUST_LOG").ok())
    }
}

fn log_directive(verbose: bool, quiet: bool, rust_log: Option<String>) -> String {
    if verbose {
        "debug".to_string()
    } else if quiet {
        "error".to_string()
    } else {
        rust_log
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string())
    }
}

/// Install a stderr `fmt` subscriber. A second call is a no-op.
pub fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{directive}': {e}");
        EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
