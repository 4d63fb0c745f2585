//! MCP server registry editing.
//!
//! A registry file is a JSON object that may hold:
//!
//! ```json
//! {
//!   "mcpServers": { "fs": { "command": "node", "args": ["x.js"] } },
//!   "_disabled_mcpServers": { "old": { "type": "http", "url": "https://..." } },
//!   "projects": {
//!     "/abs/project": { "mcpServers": { ... }, "_disabled_mcpServers": { ... } }
//!   }
//! }
//! ```
//!
//! [`RegistryDocument`] edits that structure as a generic JSON tree so every
//! key it does not own (numbers, unrelated objects, other tools' settings)
//! survives unchanged and in its original order. A server name is unique
//! within its (scope, active/disabled) pair.
//!
//! File access goes through [`edit_registry`], which reads the whole file,
//! applies one mutation in memory and writes back atomically only when the
//! mutation changed something.

pub mod plugins;
pub mod scan;

#[cfg(test)]
mod tests;

use crate::access::AuthorizedPath;
use crate::constants::{MAX_SERVER_NAME_LENGTH, RESERVED_SERVER_NAMES};
use crate::core::{ForgeError, ForgeResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Key of the active server map.
pub const ACTIVE_KEY: &str = "mcpServers";
/// Key of the disabled server map.
pub const DISABLED_KEY: &str = "_disabled_mcpServers";
/// Key of the per-project map.
pub const PROJECTS_KEY: &str = "projects";
/// Key of a server's permission allow-list.
pub const ALLOWED_TOOLS_KEY: &str = "allowedTools";

/// Which nesting level of a registry an edit targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistryScope {
    /// The top-level maps.
    Root,
    /// The maps under `projects.<path>`.
    Project(String),
}

impl RegistryScope {
    /// `Root` for `None`, otherwise the named project.
    #[must_use]
    pub fn from_project(project: Option<&str>) -> Self {
        project.map_or(Self::Root, |p| Self::Project(p.to_string()))
    }
}

impl fmt::Display for RegistryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "top-level servers"),
            Self::Project(path) => write!(f, "project {path}"),
        }
    }
}

/// Outcome of an edit that may find nothing to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Mutation {
    Applied,
    NotFound,
}

impl Mutation {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A server to add to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewServer {
    /// A locally launched server.
    Command {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// A remote HTTP server.
    Http { url: String, env: BTreeMap<String, String> },
}

impl NewServer {
    /// The registry entry: `{command, args?, env?}` or `{type: "http", url, env?}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut entry = Map::new();
        let env = match self {
            Self::Command { command, args, env } => {
                entry.insert("command".to_string(), Value::String(command.clone()));
                if !args.is_empty() {
                    entry.insert(
                        "args".to_string(),
                        Value::Array(args.iter().cloned().map(Value::String).collect()),
                    );
                }
                env
            }
            Self::Http { url, env } => {
                entry.insert("type".to_string(), Value::String("http".to_string()));
                entry.insert("url".to_string(), Value::String(url.clone()));
                env
            }
        };
        if !env.is_empty() {
            let env: Map<String, Value> =
                env.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
            entry.insert("env".to_string(), Value::Object(env));
        }
        Value::Object(entry)
    }
}

/// Validate and trim a server name.
///
/// Names are 1-80 characters of ASCII letters, digits, `.`, `_` and `-`, and
/// may not be an object-prototype identifier such as `__proto__`. A name made
/// only of dots is rejected since it doubles as a path segment.
pub fn validate_server_name(name: &str) -> ForgeResult<String> {
    let trimmed = name.trim();
    let valid_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if trimmed.is_empty()
        || trimmed.len() > MAX_SERVER_NAME_LENGTH
        || !valid_chars
        || trimmed.chars().all(|c| c == '.')
        || RESERVED_SERVER_NAMES.contains(&trimmed)
    {
        return Err(ForgeError::NameInvalid {
            name: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Trim, drop blanks and deduplicate a tool list, keeping first occurrences.
#[must_use]
pub fn sanitize_tools(tools: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .map(|tool| tool.trim())
        .filter(|tool| !tool.is_empty() && seen.insert(tool.to_string()))
        .map(str::to_string)
        .collect()
}

/// Return `container[key]` as an object, replacing a missing or non-object
/// value with `{}`.
fn ensure_object<'a>(container: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = container.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// An in-memory registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDocument {
    root: Map<String, Value>,
}

impl RegistryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a parsed value; `label` names the source in errors.
    pub fn from_value(value: Value, label: &str) -> ForgeResult<Self> {
        match value {
            Value::Object(root) => Ok(Self {
                root,
            }),
            _ => Err(ForgeError::RegistryFormatInvalid {
                path: label.to_string(),
            }),
        }
    }

    /// Parse registry text read from `path`.
    pub fn parse(text: &str, path: &Path) -> ForgeResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|source| ForgeError::RegistryParse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(value, &path.display().to_string())
    }

    /// Read a registry file that must exist.
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Read a registry file, treating a missing file as `{}`.
    pub fn load_or_default(path: &Path) -> ForgeResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Write the document as two-space indented JSON, atomically.
    pub fn save(&self, path: &Path) -> ForgeResult<()> {
        write_atomically(path, &self.to_pretty_string()?)
    }

    pub fn to_pretty_string(&self) -> ForgeResult<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// The object holding a scope's active and disabled maps.
    #[must_use]
    pub fn scope_object(&self, scope: &RegistryScope) -> Option<&Map<String, Value>> {
        match scope {
            RegistryScope::Root => Some(&self.root),
            RegistryScope::Project(path) => self
                .root
                .get(PROJECTS_KEY)
                .and_then(Value::as_object)
                .and_then(|projects| projects.get(path))
                .and_then(Value::as_object),
        }
    }

    fn scope_object_mut(&mut self, scope: &RegistryScope) -> Option<&mut Map<String, Value>> {
        match scope {
            RegistryScope::Root => Some(&mut self.root),
            RegistryScope::Project(path) => self
                .root
                .get_mut(PROJECTS_KEY)
                .and_then(Value::as_object_mut)
                .and_then(|projects| projects.get_mut(path))
                .and_then(Value::as_object_mut),
        }
    }

    /// The active map of a scope, if present.
    #[must_use]
    pub fn active_servers(&self, scope: &RegistryScope) -> Option<&Map<String, Value>> {
        self.scope_object(scope).and_then(|s| s.get(ACTIVE_KEY)).and_then(Value::as_object)
    }

    /// The disabled map of a scope, if present.
    #[must_use]
    pub fn disabled_servers(&self, scope: &RegistryScope) -> Option<&Map<String, Value>> {
        self.scope_object(scope).and_then(|s| s.get(DISABLED_KEY)).and_then(Value::as_object)
    }

    /// Move a server between the active and disabled maps of `scope`.
    ///
    /// Enabling moves from disabled to active and removes the disabled map
    /// once it is empty. Disabling moves from active to disabled; an emptied
    /// active map is kept. Returns [`Mutation::NotFound`] when the server is
    /// not in the source map, which makes repeated toggles no-ops.
    pub fn toggle_server(
        &mut self,
        scope: &RegistryScope,
        name: &str,
        enable: bool,
    ) -> ForgeResult<Mutation> {
        let name = validate_server_name(name)?;
        let Some(object) = self.scope_object_mut(scope) else {
            return Ok(Mutation::NotFound);
        };

        let (from, to) = if enable {
            (DISABLED_KEY, ACTIVE_KEY)
        } else {
            (ACTIVE_KEY, DISABLED_KEY)
        };

        let Some(entry) = object
            .get_mut(from)
            .and_then(Value::as_object_mut)
            .and_then(|source| source.shift_remove(&name))
        else {
            return Ok(Mutation::NotFound);
        };

        prune_empty_disabled(object);
        ensure_object(object, to).insert(name, entry);
        Ok(Mutation::Applied)
    }

    /// Insert or replace a server in the active map of `scope`.
    ///
    /// A project scope that does not exist yet is created.
    pub fn add_server(
        &mut self,
        scope: &RegistryScope,
        name: &str,
        server: &NewServer,
    ) -> ForgeResult<String> {
        let name = validate_server_name(name)?;
        let object = match scope {
            RegistryScope::Root => &mut self.root,
            RegistryScope::Project(path) => {
                let projects = match self.root.get(PROJECTS_KEY) {
                    None | Some(Value::Object(_)) => ensure_object(&mut self.root, PROJECTS_KEY),
                    Some(_) => {
                        return Err(ForgeError::RegistryFormatInvalid {
                            path: format!("'{PROJECTS_KEY}' section"),
                        });
                    }
                };
                ensure_object(projects, path)
            }
        };
        ensure_object(object, ACTIVE_KEY).insert(name.clone(), server.to_value());
        Ok(name)
    }

    /// Remove a server from both maps of `scope`, pruning an emptied disabled map.
    pub fn delete_server(&mut self, scope: &RegistryScope, name: &str) -> ForgeResult<Mutation> {
        let name = validate_server_name(name)?;
        let Some(object) = self.scope_object_mut(scope) else {
            return Ok(Mutation::NotFound);
        };

        let mut removed = false;
        for key in [ACTIVE_KEY, DISABLED_KEY] {
            if let Some(map) = object.get_mut(key).and_then(Value::as_object_mut) {
                removed |= map.shift_remove(&name).is_some();
            }
        }
        prune_empty_disabled(object);

        Ok(if removed {
            Mutation::Applied
        } else {
            Mutation::NotFound
        })
    }

    /// Import servers into the top-level active map.
    ///
    /// Accepts `{"mcpServers": {name: entry, ...}}` or a bare
    /// `{name: entry, ...}`. Every entry of a wrapped map is inserted as is;
    /// a bare map only contributes its object entries. Every name is
    /// validated before anything is inserted.
    ///
    /// Returns the names inserted, in snippet order.
    pub fn import_servers(&mut self, snippet: &Value) -> ForgeResult<Vec<String>> {
        let Value::Object(snippet) = snippet else {
            return Err(ForgeError::RegistryFormatInvalid {
                path: "import snippet".to_string(),
            });
        };

        let (servers, objects_only) = match snippet.get(ACTIVE_KEY) {
            Some(Value::Object(wrapped)) => (wrapped, false),
            Some(_) => {
                return Err(ForgeError::RegistryFormatInvalid {
                    path: format!("import snippet '{ACTIVE_KEY}'"),
                });
            }
            None => (snippet, true),
        };

        let entries = servers
            .iter()
            .filter(|(_, entry)| !objects_only || entry.is_object())
            .map(|(name, entry)| Ok((validate_server_name(name)?, entry.clone())))
            .collect::<ForgeResult<Vec<_>>>()?;

        let active = ensure_object(&mut self.root, ACTIVE_KEY);
        let mut imported = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            active.insert(name.clone(), entry);
            imported.push(name);
        }
        Ok(imported)
    }

    /// Replace the allow-list of an active server in `scope`.
    ///
    /// The list is trimmed and deduplicated; an empty result removes the
    /// `allowedTools` field. Returns [`Mutation::NotFound`] unless the server
    /// is an object in the scope's active map.
    pub fn set_allowed_tools(
        &mut self,
        scope: &RegistryScope,
        name: &str,
        tools: &[String],
    ) -> ForgeResult<Mutation> {
        let name = validate_server_name(name)?;
        let tools = sanitize_tools(tools);

        let Some(server) = self
            .scope_object_mut(scope)
            .and_then(|object| object.get_mut(ACTIVE_KEY))
            .and_then(Value::as_object_mut)
            .and_then(|active| active.get_mut(&name))
            .and_then(Value::as_object_mut)
        else {
            return Ok(Mutation::NotFound);
        };

        if tools.is_empty() {
            server.shift_remove(ALLOWED_TOOLS_KEY);
        } else {
            server.insert(
                ALLOWED_TOOLS_KEY.to_string(),
                Value::Array(tools.into_iter().map(Value::String).collect()),
            );
        }
        Ok(Mutation::Applied)
    }
}

fn prune_empty_disabled(object: &mut Map<String, Value>) {
    if object.get(DISABLED_KEY).and_then(Value::as_object).is_some_and(Map::is_empty) {
        object.shift_remove(DISABLED_KEY);
    }
}

/// Whether an edit result requires writing the document back.
pub trait WriteBack {
    fn needs_write(&self) -> bool;
}

impl WriteBack for Mutation {
    fn needs_write(&self) -> bool {
        self.is_applied()
    }
}

impl WriteBack for Vec<String> {
    fn needs_write(&self) -> bool {
        true
    }
}

impl WriteBack for String {
    fn needs_write(&self) -> bool {
        true
    }
}

/// Read-modify-write a registry file.
///
/// The file is parsed in full, `edit` runs on the in-memory document, and the
/// result is written back atomically only if `edit` succeeded and reports a
/// change. A parse failure aborts without touching the file. When
/// `create_if_missing` is set a missing file starts as `{}`.
///
/// # Errors
///
/// [`ForgeError::AccessDenied`] if `path` was not authorized for writing, and
/// any error from parsing, `edit` or the write.
pub fn edit_registry<T, F>(path: &AuthorizedPath, create_if_missing: bool, edit: F) -> ForgeResult<T>
where
    T: WriteBack,
    F: FnOnce(&mut RegistryDocument) -> ForgeResult<T>,
{
    if !path.is_writable() {
        return Err(ForgeError::access_denied(format!(
            "{} is not authorized for writing",
            path.path().display()
        )));
    }

    let file = path.path();
    let mut document = if create_if_missing {
        RegistryDocument::load_or_default(file)?
    } else {
        RegistryDocument::load(file)?
    };

    let outcome = edit(&mut document)?;
    if outcome.needs_write() {
        document.save(file)?;
        tracing::debug!("Wrote MCP config {}", file.display());
    } else {
        tracing::debug!("No change to MCP config {}", file.display());
    }
    Ok(outcome)
}

/// Atomically write text, mapping helper failures into the core taxonomy.
pub(crate) fn write_atomically(path: &Path, content: &str) -> ForgeResult<()> {
    crate::utils::safe_write(path, content)
        .map_err(|e| ForgeError::IoError(std::io::Error::other(format!("{e:#}"))))
}
