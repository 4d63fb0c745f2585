//! forge - scoped management of Claude skills and MCP servers
//!
//! forge reads and edits `SKILL.md` files and MCP server registries
//! (`~/.claude.json`, project `.mcp.json` files, plugin `.mcp.json` files), and
//! installs packaged MCP servers (`.dxt` / `.mcpb` zip archives).
//!
//! Every path goes through a [`access::PathAuthority`] built from the user's
//! [`config::ScopeConfig`]: only configured skill roots, registry files and
//! project roots are reachable, and the plugin cache is read-only. Package
//! installation is additionally gated by single-use approvals recorded when
//! the user selects a file.
//!
//! # Layout
//!
//! - [`access`]: path authorization and package approvals
//! - [`archive`]: package file checks and zip entry validation
//! - [`package`]: manifest parsing and `${...}` substitution
//! - [`registry`]: registry documents, atomic edits and discovery
//! - [`skills`]: skill discovery and editing
//! - [`install`]: the install pipeline
//! - [`health`]: server reachability probes
//! - [`activity`]: in-memory log of changes
//! - [`service`]: the [`service::Forge`] facade tying these together
//! - [`cli`]: the `forge` command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_cli::config::ScopeConfig;
//! use forge_cli::service::Forge;
//!
//! # fn main() -> anyhow::Result<()> {
//! let forge = Forge::new(ScopeConfig::default(), "/home/me");
//! for skill in forge.scan_skills() {
//!     println!("{} {}", skill.slash_command, skill.path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod activity;
pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod health;
pub mod install;
pub mod package;
pub mod registry;
pub mod service;
pub mod skills;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
