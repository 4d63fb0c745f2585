//! `forge package`: inspect and install `.dxt` / `.mcpb` packages.
//!
//! A file named on the command line counts as user-selected: each command
//! approves it, then inspects or installs it in the same process.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::common::{ForgeCommand, parse_key_value, print_json};
use crate::install::PackageInspection;
use crate::package::LaunchConfig;
use crate::service::Forge;

#[derive(Args)]
pub struct PackageCommand {
    #[command(subcommand)]
    command: PackageSubcommands,
}

#[derive(Subcommand)]
enum PackageSubcommands {
    /// Show what a package declares without installing it
    Inspect {
        /// Package file (.dxt or .mcpb)
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Extract a package and register its server
    Install {
        /// Package file (.dxt or .mcpb)
        file: PathBuf,

        /// Registry file to add the server to
        #[arg(long, value_name = "FILE")]
        registry: PathBuf,

        /// Value for a user_config setting (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
}

impl ForgeCommand for PackageCommand {
    async fn execute(self, forge: &Forge) -> Result<()> {
        match self.command {
            PackageSubcommands::Inspect { file, json } => {
                let selected = forge.select_package(&file)?;
                let inspection = forge.inspect_package(&selected)?;
                if json {
                    print_json(&inspection)
                } else {
                    print_inspection(&inspection);
                    Ok(())
                }
            }
            PackageSubcommands::Install { file, registry, values } => {
                let selected = forge.select_package(&file)?;
                let inspection = forge.inspect_package(&selected)?;
                let values = with_defaults(&inspection, values.into_iter().collect());
                let missing = missing_required(&inspection, &values);
                if !missing.is_empty() {
                    bail!(
                        "Package '{}' needs a value for: {} (pass --set KEY=VALUE)",
                        inspection.manifest.name,
                        missing.join(", ")
                    );
                }

                let outcome = forge.install_package(&selected, &registry, values)?;
                println!(
                    "{} Installed '{}' ({} files) to {}",
                    "✅".green(),
                    outcome.server_name.bold(),
                    outcome.files,
                    outcome.install_dir.display()
                );
                println!("   Registered in {}", outcome.registry.display());
                Ok(())
            }
        }
    }
}

/// Fill unset settings with their declared defaults.
fn with_defaults(
    inspection: &PackageInspection,
    mut values: HashMap<String, String>,
) -> HashMap<String, String> {
    for field in &inspection.user_config {
        if !field.default_value.is_empty() && !values.contains_key(&field.key) {
            values.insert(field.key.clone(), field.default_value.clone());
        }
    }
    values
}

/// Required settings with neither a default nor a supplied value.
fn missing_required(inspection: &PackageInspection, values: &HashMap<String, String>) -> Vec<String> {
    inspection
        .user_config
        .iter()
        .filter(|field| field.required && field.default_value.is_empty())
        .filter(|field| values.get(&field.key).is_none_or(|v| v.is_empty()))
        .map(|field| field.key.clone())
        .collect()
}

fn print_inspection(inspection: &PackageInspection) {
    let manifest = &inspection.manifest;
    let title = manifest.display_name.as_deref().unwrap_or(&manifest.name);
    match &manifest.version {
        Some(version) => println!("{} {}", title.bold(), version.dimmed()),
        None => println!("{}", title.bold()),
    }
    if let Some(description) = &manifest.description {
        println!("  {description}");
    }
    println!("  name:    {}", manifest.name);
    if let Some(kind) = &manifest.server.kind {
        println!("  runtime: {kind}");
    }
    if let Some(LaunchConfig { command: Some(command), args, .. }) = &manifest.server.mcp_config {
        println!("  command: {} {}", command, args.join(" "));
    }
    println!("  archive: {} entries, {} bytes", inspection.entry_count, inspection.total_bytes);

    if !manifest.tools.is_empty() {
        println!("\n{}", "Tools".bold());
        for tool in &manifest.tools {
            println!("  {} {}", tool.name.green(), tool.description.as_deref().unwrap_or_default());
        }
    }

    if !inspection.user_config.is_empty() {
        println!("\n{}", "Settings".bold());
        for field in &inspection.user_config {
            let required = if field.required { " (required)".yellow() } else { "".normal() };
            println!("  {}{} {}", field.key.green(), required, field.description);
        }
    }
}
