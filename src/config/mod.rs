//! Scope configuration for forge.
//!
//! The scope configuration (`~/.forge/config.toml`) declares which directories
//! forge may touch:
//!
//! - **`skill_paths`**: roots searched for `SKILL.md` files
//! - **`registry_paths`**: exact MCP registry files (e.g. `~/.claude.json`)
//! - **`project_roots`**: project directories whose `.mcp.json` files and
//!   `.claude/skills` trees are in scope
//!
//! Entries may use the `~` home shorthand. Every list is sanitized on load and
//! on save: entries are trimmed, blanks dropped, duplicates removed (first
//! occurrence wins) and the list capped at
//! [`MAX_CONFIG_LIST_ENTRIES`](crate::constants::MAX_CONFIG_LIST_ENTRIES).
//! An empty list falls back to its default.
//!
//! # File Format
//!
//! ```toml
//! skill_paths = ["~/.claude/skills", "~/.claude/plugins/marketplaces"]
//! registry_paths = ["~/.claude.json"]
//! project_roots = ["~/project"]
//! ```
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.forge/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\forge\config.toml`
//!
//! The `FORGE_CONFIG_PATH` environment variable (or the `--config` flag)
//! overrides the location.

use crate::constants::MAX_CONFIG_LIST_ENTRIES;
use crate::utils::expand_home;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "FORGE_CONFIG_PATH";

const DEFAULT_SKILL_PATHS: &[&str] = &["~/.claude/skills", "~/.claude/plugins/marketplaces"];
const DEFAULT_REGISTRY_PATHS: &[&str] = &["~/.claude.json"];

#[cfg(windows)]
const DEFAULT_PROJECT_ROOT: &str = "D:/project";
#[cfg(not(windows))]
const DEFAULT_PROJECT_ROOT: &str = "~/project";

/// The directories and files forge is allowed to access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Roots searched for skill files.
    #[serde(default)]
    pub skill_paths: Vec<String>,

    /// Registry files that may be read and edited.
    #[serde(default)]
    pub registry_paths: Vec<String>,

    /// Project roots whose registries and skills are in scope.
    #[serde(default)]
    pub project_roots: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            skill_paths: to_owned_list(DEFAULT_SKILL_PATHS),
            registry_paths: to_owned_list(DEFAULT_REGISTRY_PATHS),
            project_roots: vec![DEFAULT_PROJECT_ROOT.to_string()],
        }
    }
}

impl ScopeConfig {
    /// Build a sanitized configuration from raw lists.
    #[must_use]
    pub fn new(
        skill_paths: Vec<String>,
        registry_paths: Vec<String>,
        project_roots: Vec<String>,
    ) -> Self {
        Self {
            skill_paths,
            registry_paths,
            project_roots,
        }
        .sanitize()
    }

    /// Trim, deduplicate and cap every list, restoring defaults for empty ones.
    #[must_use]
    pub fn sanitize(self) -> Self {
        let defaults = Self::default();
        let pick = |list: Vec<String>, fallback: Vec<String>| {
            let cleaned = sanitize_string_list(list);
            if cleaned.is_empty() { fallback } else { cleaned }
        };

        Self {
            skill_paths: pick(self.skill_paths, defaults.skill_paths),
            registry_paths: pick(self.registry_paths, defaults.registry_paths),
            project_roots: pick(self.project_roots, defaults.project_roots),
        }
    }

    /// Skill roots with the home shorthand expanded.
    #[must_use]
    pub fn skill_roots(&self, home: &Path) -> Vec<PathBuf> {
        self.skill_paths.iter().map(|p| expand_home(p, home)).collect()
    }

    /// Registry file paths with the home shorthand expanded.
    #[must_use]
    pub fn registry_files(&self, home: &Path) -> Vec<PathBuf> {
        self.registry_paths.iter().map(|p| expand_home(p, home)).collect()
    }

    /// Project roots with the home shorthand expanded.
    #[must_use]
    pub fn project_dirs(&self, home: &Path) -> Vec<PathBuf> {
        self.project_roots.iter().map(|p| expand_home(p, home)).collect()
    }

    /// Load the configuration from an explicit path, the `FORGE_CONFIG_PATH`
    /// override, or the default location.
    ///
    /// A missing file yields the defaults. A malformed file is reported with a
    /// warning and also yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only if the default location cannot be determined or
    /// an existing file cannot be read.
    pub fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::resolve_path()?,
        };
        Self::load_from(&path)
    }

    /// Load the configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        match toml::from_str::<Self>(&content) {
            Ok(config) => Ok(config.sanitize()),
            Err(e) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Save the sanitized configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&self.clone().sanitize())
            .context("Failed to serialize forge config")?;
        crate::utils::safe_write(path, &content)
            .with_context(|| format!("Failed to write forge config to {}", path.display()))
    }

    /// The configuration file path: `FORGE_CONFIG_PATH` if set, otherwise the
    /// platform default.
    pub fn resolve_path() -> Result<PathBuf> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path(),
        }
    }

    /// The platform default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("forge")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".forge")
        };

        Ok(config_dir.join("config.toml"))
    }
}

/// Trim, drop blanks, deduplicate (first occurrence wins) and cap a list.
#[must_use]
pub fn sanitize_string_list(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        result.push(trimmed.to_string());

        if result.len() >= MAX_CONFIG_LIST_ENTRIES {
            break;
        }
    }

    result
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}
