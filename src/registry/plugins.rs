//! Registries shipped by enabled plugins.
//!
//! `~/.claude/settings.json` lists enabled plugins as `name@marketplace`
//! keys under `enabledPlugins`. Each plugin's installed versions live in
//! `~/.claude/plugins/cache/<marketplace>/<name>/<version>/`; the newest
//! version directory holding a parseable `.mcp.json` provides the plugin's
//! servers. Plugin registries are bare name → entry maps and are never
//! written by forge.

use super::scan::{ListingContext, RegistryFile, RegistrySource, list_server_map};
use super::validate_server_name;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A plugin enabled in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledPlugin {
    pub name: String,
    pub marketplace: String,
}

impl EnabledPlugin {
    /// Split a `name@marketplace` key at the last `@`.
    ///
    /// Both parts become cache directory names, so each must pass
    /// [`validate_server_name`].
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let (name, marketplace) = key.rsplit_once('@')?;
        match (validate_server_name(name), validate_server_name(marketplace)) {
            (Ok(name), Ok(marketplace)) => Some(Self {
                name,
                marketplace,
            }),
            _ => {
                tracing::debug!("Ignoring enabled plugin with unsafe key '{}'", key);
                None
            }
        }
    }
}

/// Plugins whose `enabledPlugins` value is exactly `true`.
#[must_use]
pub fn enabled_plugins(settings: &Value) -> Vec<EnabledPlugin> {
    settings
        .get("enabledPlugins")
        .and_then(Value::as_object)
        .map(|plugins| {
            plugins
                .iter()
                .filter(|(_, enabled)| enabled.as_bool() == Some(true))
                .filter_map(|(key, _)| EnabledPlugin::parse(key))
                .collect()
        })
        .unwrap_or_default()
}

/// Version directories of a plugin, newest modification time first; ties are
/// broken by descending name.
#[must_use]
pub fn sorted_versions(plugin_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(plugin_dir) else {
        return Vec::new();
    };

    let mut versions: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .filter_map(|entry| {
            let metadata = std::fs::metadata(entry.path()).ok()?;
            metadata.is_dir().then(|| {
                (entry.path(), metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
            })
        })
        .collect();

    versions.sort_by(|(a_path, a_time), (b_path, b_time)| match b_time.cmp(a_time) {
        Ordering::Equal => b_path.file_name().cmp(&a_path.file_name()),
        other => other,
    });
    versions.into_iter().map(|(path, _)| path).collect()
}

/// Discover registries of enabled plugins under `home`.
#[must_use]
pub fn scan_plugin_registries(home: &Path) -> Vec<RegistryFile> {
    let claude_dir = home.join(".claude");
    let settings_path = claude_dir.join("settings.json");

    let settings: Value = match std::fs::read_to_string(&settings_path)
        .ok()
        .map(|raw| serde_json::from_str::<Value>(&raw))
    {
        Some(Ok(settings)) => settings,
        Some(Err(e)) => {
            tracing::warn!("Ignoring unparseable {}: {}", settings_path.display(), e);
            return Vec::new();
        }
        None => return Vec::new(),
    };

    let cache_dir = claude_dir.join("plugins").join("cache");
    let mut results = Vec::new();

    for plugin in enabled_plugins(&settings) {
        let plugin_dir = cache_dir.join(&plugin.marketplace).join(&plugin.name);
        if !plugin_dir.is_dir() {
            continue;
        }

        for version in sorted_versions(&plugin_dir) {
            let path = version.join(".mcp.json");
            let Ok(raw_content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Ok(Value::Object(servers)) = serde_json::from_str::<Value>(&raw_content) else {
                tracing::debug!("Skipping invalid plugin MCP config {}", path.display());
                continue;
            };

            let label = format!("Plugin: {}", plugin.name);
            let context = ListingContext {
                config_path: &path,
                source: RegistrySource::Plugin,
                label: &label,
                project: None,
            };
            let servers = list_server_map(&servers, context, false);
            if !servers.is_empty() {
                results.push(RegistryFile {
                    path: path.clone(),
                    source: RegistrySource::Plugin,
                    label,
                    servers,
                    raw_content,
                });
            }
            break;
        }
    }

    results
}
