//! Registry discovery and server listing.
//!
//! [`scan_registries`] collects every registry file in scope:
//!
//! 1. each configured registry path that exists (source `user`)
//! 2. each `.mcp.json` found under a project root, at most
//!    [`REGISTRY_SCAN_DEPTH`] directories deep (source `project`)
//! 3. registries shipped by enabled plugins (source `plugin`), see
//!    [`super::plugins`]
//!
//! Files that are unreadable or not a JSON object are skipped with a warning.

use super::plugins::scan_plugin_registries;
use super::{ACTIVE_KEY, ALLOWED_TOOLS_KEY, DISABLED_KEY, PROJECTS_KEY, RegistryDocument};
use crate::access::PathAuthority;
use crate::constants::{MAX_DESCRIPTION_CHARS, REGISTRY_SCAN_DEPTH, SCAN_SKIP_DIRS};
use crate::utils::find_files_named;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

const PROJECT_REGISTRY_FILE_NAME: &str = ".mcp.json";
const ROOT_SCOPE_ID: &str = "__root__";

/// Where a registry file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrySource {
    User,
    Project,
    Plugin,
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
            Self::Plugin => write!(f, "plugin"),
        }
    }
}

/// One server as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerListing {
    /// Stable identifier: `<config>_<scope>_<name>` with `\ / :` replaced by `_`.
    pub id: String,
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub description: String,
    pub source: RegistrySource,
    pub source_label: String,
    pub config_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    pub usage_command: String,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
}

impl ServerListing {
    #[must_use]
    pub fn is_http(&self) -> bool {
        self.kind.as_deref() == Some("http")
    }
}

/// A registry file with its parsed servers.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryFile {
    pub path: PathBuf,
    pub source: RegistrySource,
    pub label: String,
    pub servers: Vec<ServerListing>,
    #[serde(skip)]
    pub raw_content: String,
}

/// Build the stable id of a server.
#[must_use]
pub fn build_server_id(config_path: &Path, name: &str, project: Option<&str>) -> String {
    let scope = project.unwrap_or(ROOT_SCOPE_ID);
    format!("{}_{scope}_{name}", config_path.display())
        .chars()
        .map(|c| if matches!(c, '\\' | '/' | ':') { '_' } else { c })
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn string_map(value: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let map: BTreeMap<String, String> = value
        .and_then(Value::as_object)?
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    (!map.is_empty()).then_some(map)
}

fn str_field<'a>(entry: &'a Map<String, Value>, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Descriptions for well-known servers recognized by their launch line.
fn known_description(command: &str, args: &[String]) -> Option<&'static str> {
    let any_arg = |needle: &str| args.iter().any(|arg| arg.contains(needle));
    if any_arg("server-filesystem") {
        Some("Allow Claude to access local files")
    } else if any_arg("server-github") {
        Some("GitHub repository operations")
    } else if command.contains("postgres") || any_arg("postgres") {
        Some("PostgreSQL service")
    } else {
        None
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Identifies which file and scope a server map belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ListingContext<'a> {
    pub config_path: &'a Path,
    pub source: RegistrySource,
    pub label: &'a str,
    pub project: Option<&'a str>,
}

/// List the servers of one name → entry map. Non-object entries are ignored.
#[must_use]
pub fn list_server_map(
    servers: &Map<String, Value>,
    context: ListingContext<'_>,
    disabled: bool,
) -> Vec<ServerListing> {
    servers
        .iter()
        .filter_map(|(name, entry)| {
            let entry = entry.as_object()?;
            let kind = str_field(entry, "type");
            let url = str_field(entry, "url");
            let command = str_field(entry, "command");
            let args = string_list(entry.get("args"));
            let is_http = kind == "http";

            let explicit = str_field(entry, "description").trim();
            let description = if !explicit.is_empty() {
                explicit.to_string()
            } else if is_http && !url.is_empty() {
                format!("HTTP MCP: {}", truncate_chars(url, MAX_DESCRIPTION_CHARS))
            } else if let Some(known) = known_description(command, &args) {
                known.to_string()
            } else {
                let command_line =
                    std::iter::once(command).chain(args.iter().map(String::as_str)).collect::<Vec<_>>();
                let command_line = command_line.join(" ");
                format!("MCP Server: {}", truncate_chars(command_line.trim(), MAX_DESCRIPTION_CHARS))
            };

            Some(ServerListing {
                id: build_server_id(context.config_path, name, context.project),
                name: name.clone(),
                command: if is_http { String::new() } else { command.to_string() },
                args: if is_http { Vec::new() } else { args },
                env: string_map(entry.get("env")),
                kind: (!kind.is_empty()).then(|| kind.to_string()),
                url: (!url.is_empty()).then(|| url.to_string()),
                description,
                source: context.source,
                source_label: context.label.to_string(),
                config_path: context.config_path.to_path_buf(),
                project_path: context.project.map(str::to_string),
                usage_command: format!("mcp: {name}"),
                disabled,
                allowed_tools: string_list(entry.get(ALLOWED_TOOLS_KEY)),
            })
        })
        .collect()
}

/// List every server of a document: top-level active, top-level disabled,
/// then each project's active and disabled maps.
///
/// The first occurrence of a (scope, name) pair wins.
#[must_use]
pub fn list_servers(
    document: &RegistryDocument,
    config_path: &Path,
    source: RegistrySource,
    label: &str,
) -> Vec<ServerListing> {
    let root = document.as_map();
    let mut listings = Vec::new();
    let mut seen = HashSet::new();
    let mut push_all = |batch: Vec<ServerListing>| {
        for server in batch {
            let key = (server.project_path.clone(), server.name.clone());
            if seen.insert(key) {
                listings.push(server);
            }
        }
    };

    let root_context = ListingContext {
        config_path,
        source,
        label,
        project: None,
    };
    for (key, disabled) in [(ACTIVE_KEY, false), (DISABLED_KEY, true)] {
        if let Some(map) = root.get(key).and_then(Value::as_object) {
            push_all(list_server_map(map, root_context, disabled));
        }
    }

    if let Some(projects) = root.get(PROJECTS_KEY).and_then(Value::as_object) {
        for (project_path, project) in projects {
            let Some(project) = project.as_object() else {
                continue;
            };
            let project_name = Path::new(project_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| project_path.clone());
            let project_label = format!("{label} ({project_name})");
            let context = ListingContext {
                config_path,
                source,
                label: &project_label,
                project: Some(project_path),
            };
            for (key, disabled) in [(ACTIVE_KEY, false), (DISABLED_KEY, true)] {
                if let Some(map) = project.get(key).and_then(Value::as_object) {
                    push_all(list_server_map(map, context, disabled));
                }
            }
        }
    }

    listings
}

/// Find `.mcp.json` files under `root`, descending at most `max_depth`
/// directories and skipping [`SCAN_SKIP_DIRS`]. Results are sorted.
#[must_use]
pub fn find_registry_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    find_files_named(root, PROJECT_REGISTRY_FILE_NAME, max_depth, SCAN_SKIP_DIRS)
}

/// Read and parse a registry file for listing, or `None` with a warning.
pub(crate) fn read_registry_file(
    path: &Path,
    source: RegistrySource,
    label: &str,
) -> Option<RegistryFile> {
    let raw_content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Skipping unreadable MCP config {}: {}", path.display(), e);
            return None;
        }
    };
    let document = match RegistryDocument::parse(&raw_content, path) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Skipping MCP config {}: {}", path.display(), e);
            return None;
        }
    };

    Some(RegistryFile {
        path: path.to_path_buf(),
        source,
        label: label.to_string(),
        servers: list_servers(&document, path, source, label),
        raw_content,
    })
}

/// Discover every registry file in scope.
#[must_use]
pub fn scan_registries(authority: &PathAuthority) -> Vec<RegistryFile> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for path in authority.registry_paths() {
        if !path.exists() || !seen.insert(path.clone()) {
            continue;
        }
        files.extend(read_registry_file(path, RegistrySource::User, "User"));
    }

    for root in authority.project_roots() {
        if !root.exists() {
            continue;
        }
        for path in find_registry_files(root, REGISTRY_SCAN_DEPTH) {
            if !seen.insert(path.clone()) {
                continue;
            }
            let project_name = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let label = format!("Project: {project_name}");
            files.extend(read_registry_file(&path, RegistrySource::Project, &label));
        }
    }

    for plugin in scan_plugin_registries(authority.home()) {
        if seen.insert(plugin.path.clone()) {
            files.push(plugin);
        }
    }

    tracing::debug!("Found {} MCP config files", files.len());
    files
}
