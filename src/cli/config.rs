//! `forge config`: show, locate or create the scope configuration.
//!
//! The configuration lists the only places forge may touch:
//!
//! ```toml
//! skill_paths = ["~/.claude/skills", "~/.claude/plugins/marketplaces"]
//! registry_paths = ["~/.claude.json"]
//! project_roots = ["~/project"]
//! ```
//!
//! The file lives at `~/.forge/config.toml` unless `--config` or
//! `FORGE_CONFIG_PATH` points elsewhere. A missing file means the defaults
//! above.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::ScopeConfig;

#[derive(Args)]
pub struct ConfigCommand {
    /// Defaults to `show`
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Run against the file at `config_path`, or the resolved default.
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => ScopeConfig::resolve_path()?,
        };

        match self.command.unwrap_or(ConfigSubcommands::Show) {
            ConfigSubcommands::Show => show(&path),
            ConfigSubcommands::Path => {
                println!("{}", path.display());
                Ok(())
            }
            ConfigSubcommands::Init { force } => init(&path, force),
        }
    }
}

fn show(path: &Path) -> Result<()> {
    let config = ScopeConfig::load_from(path)?;
    if path.exists() {
        println!("{} {}", "#".dimmed(), path.display().to_string().dimmed());
    } else {
        println!("{} {} (not found, showing defaults)", "#".dimmed(), path.display().to_string().dimmed());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    ScopeConfig::default().save_to(path)?;
    println!("{} Wrote default configuration to {}", "✅".green(), path.display());
    Ok(())
}
