//! `forge mcp`: list, edit and probe MCP server registries.
//!
//! Commands that change a registry take the registry file as their first
//! argument. `--project` selects the `projects.<path>` maps of that file
//! instead of the top-level ones.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::common::{ForgeCommand, parse_key_value, print_json};
use crate::health::HealthStatus;
use crate::registry::NewServer;
use crate::registry::scan::{RegistryFile, ServerListing};
use crate::service::Forge;
use crate::utils::read_text_file;

#[derive(Args)]
pub struct McpCommand {
    /// Defaults to `list`
    #[command(subcommand)]
    command: Option<McpSubcommands>,
}

#[derive(Subcommand)]
enum McpSubcommands {
    /// List every registry in scope and its servers
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print a registry file
    Show {
        /// Path to a registry file
        path: PathBuf,
    },

    /// Replace a registry file with the content of another file
    Save {
        /// Path to a registry file
        path: PathBuf,

        /// File holding the new JSON content
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },

    /// Enable or disable a server
    Toggle {
        #[arg(value_name = "CONFIG")]
        registry: PathBuf,

        name: String,

        #[command(flatten)]
        state: ToggleState,

        /// Project path inside the registry
        #[arg(long)]
        project: Option<String>,
    },

    /// Add or replace a server
    Add {
        #[arg(value_name = "CONFIG")]
        registry: PathBuf,

        name: String,

        #[command(flatten)]
        launch: Launch,

        /// Argument passed to the command (repeatable)
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true, conflicts_with = "url")]
        args: Vec<String>,

        /// Environment variable for the server (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        env: Vec<(String, String)>,

        /// Project path inside the registry
        #[arg(long)]
        project: Option<String>,
    },

    /// Remove a server
    Remove {
        #[arg(value_name = "CONFIG")]
        registry: PathBuf,

        name: String,

        /// Project path inside the registry
        #[arg(long)]
        project: Option<String>,
    },

    /// Import servers from a JSON file
    ///
    /// Accepts `{"mcpServers": {...}}` or a bare `{"name": {...}}` map.
    /// Servers land in the top-level active map. A bare map skips entries that
    /// are not objects.
    Import {
        #[arg(value_name = "CONFIG")]
        registry: PathBuf,

        /// JSON file to import
        #[arg(value_name = "JSON_FILE")]
        file: PathBuf,
    },

    /// Replace the tools a server may use without asking
    AllowTools {
        #[arg(value_name = "CONFIG")]
        registry: PathBuf,

        name: String,

        /// Allowed tool names; none clears the list
        #[arg(value_name = "TOOL")]
        tools: Vec<String>,

        /// Project path inside the registry
        #[arg(long)]
        project: Option<String>,
    },

    /// Probe every server in scope
    Health {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ToggleState {
    /// Move the server to the active map
    #[arg(long)]
    enable: bool,

    /// Move the server to the disabled map
    #[arg(long)]
    disable: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Launch {
    /// Command that starts a local server
    #[arg(long)]
    command: Option<String>,

    /// URL of a remote HTTP server
    #[arg(long)]
    url: Option<String>,
}

impl Launch {
    fn into_server(self, args: Vec<String>, env: Vec<(String, String)>) -> Result<NewServer> {
        let env: BTreeMap<String, String> = env.into_iter().collect();
        match (self.command, self.url) {
            (Some(command), None) => Ok(NewServer::Command { command, args, env }),
            (None, Some(url)) => Ok(NewServer::Http { url, env }),
            _ => bail!("Pass exactly one of --command or --url"),
        }
    }
}

#[derive(Serialize)]
struct HealthRow<'a> {
    id: &'a str,
    name: &'a str,
    config_path: &'a Path,
    status: HealthStatus,
}

impl ForgeCommand for McpCommand {
    async fn execute(self, forge: &Forge) -> Result<()> {
        match self.command.unwrap_or(McpSubcommands::List { json: false }) {
            McpSubcommands::List { json } => list(forge, json),
            McpSubcommands::Show { path } => {
                print!("{}", forge.read_registry(&path)?);
                Ok(())
            }
            McpSubcommands::Save { path, from } => {
                let content = read_text_file(&from)?;
                forge.save_registry(&path, &content)?;
                println!("{} Saved {}", "✅".green(), path.display());
                Ok(())
            }
            McpSubcommands::Toggle { registry, name, state, project } => {
                let enable = state.enable && !state.disable;
                let outcome = forge.toggle_server(&registry, &name, enable, project.as_deref())?;
                let verb = if enable { "Enabled" } else { "Disabled" };
                if outcome.is_applied() {
                    println!("{} {} '{}'", "✅".green(), verb, name.bold());
                } else {
                    let state = if enable { "disabled" } else { "active" };
                    println!(
                        "{} No {} server named '{}' in {}",
                        "⚠️".yellow(),
                        state,
                        name,
                        registry.display()
                    );
                }
                Ok(())
            }
            McpSubcommands::Add { registry, name, launch, args, env, project } => {
                let server = launch.into_server(args, env)?;
                let stored = forge.add_server(&registry, &name, &server, project.as_deref())?;
                println!("{} Added '{}' to {}", "✅".green(), stored.bold(), registry.display());
                Ok(())
            }
            McpSubcommands::Remove { registry, name, project } => {
                let outcome = forge.delete_server(&registry, &name, project.as_deref())?;
                Forge::require_applied(outcome, &name, &registry, project.as_deref())?;
                println!("{} Removed '{}'", "✅".green(), name.bold());
                Ok(())
            }
            McpSubcommands::Import { registry, file } => {
                let snippet = read_text_file(&file)?;
                let imported = forge.import_servers(&registry, &snippet)?;
                if imported.is_empty() {
                    println!("{} No servers found in {}", "⚠️".yellow(), file.display());
                } else {
                    println!(
                        "{} Imported {} server(s): {}",
                        "✅".green(),
                        imported.len(),
                        imported.join(", ")
                    );
                }
                Ok(())
            }
            McpSubcommands::AllowTools { registry, name, tools, project } => {
                let outcome = forge.set_allowed_tools(&registry, &name, &tools, project.as_deref())?;
                Forge::require_applied(outcome, &name, &registry, project.as_deref())?;
                println!("{} '{}' may use {} tool(s)", "✅".green(), name.bold(), tools.len());
                Ok(())
            }
            McpSubcommands::Health { json } => health(forge, json).await,
        }
    }
}

fn list(forge: &Forge, json: bool) -> Result<()> {
    let registries = forge.scan_registries();
    if json {
        return print_json(&registries);
    }

    if registries.is_empty() {
        println!("No MCP registries found.");
        return Ok(());
    }

    for registry in &registries {
        print_registry(registry);
    }
    Ok(())
}

fn print_registry(registry: &RegistryFile) {
    println!("{} {}", registry.label.cyan().bold(), registry.path.display().to_string().dimmed());
    if registry.servers.is_empty() {
        println!("  (no servers)");
    }
    for server in &registry.servers {
        print_server(server);
    }
    println!();
}

fn print_server(server: &ServerListing) {
    let marker = if server.disabled { "○".dimmed() } else { "●".green() };
    let name = if server.disabled { server.name.dimmed() } else { server.name.bold() };
    let scope = server.project_path.as_deref().map(|p| format!(" [{p}]")).unwrap_or_default();
    println!("  {marker} {name}{scope}  {}", server.description);
    if !server.allowed_tools.is_empty() {
        println!("      allowed: {}", server.allowed_tools.join(", ").dimmed());
    }
}

async fn health(forge: &Forge, json: bool) -> Result<()> {
    let servers = forge.list_servers();
    let results = forge.check_health(&servers).await;

    let rows: Vec<HealthRow<'_>> = servers
        .iter()
        .map(|server| HealthRow {
            id: &server.id,
            name: &server.name,
            config_path: &server.config_path,
            status: results.get(&server.id).copied().unwrap_or(HealthStatus::Unknown),
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No MCP servers to check.");
        return Ok(());
    }

    for row in &rows {
        let status = match row.status {
            HealthStatus::Connected => "connected".green(),
            HealthStatus::Failed => "failed".red(),
            HealthStatus::Unknown => "unknown".yellow(),
        };
        println!("  {:<10} {} {}", status, row.name.bold(), row.config_path.display().to_string().dimmed());
    }
    Ok(())
}
