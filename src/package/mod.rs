//! Package manifest parsing and launch specification resolution.
//!
//! A package's `manifest.json` is JSON that may carry `//` and `/* */`
//! comments. [`PackageManifest::parse`] strips the comments, checks the
//! required `name` and `server` fields and deserializes the rest into typed
//! structures. Missing or malformed fields fail here, before any file is
//! written.
//!
//! A manifest without `server.mcp_config` still parses (so it can be
//! inspected) but cannot produce an installable server entry.

pub mod comments;
pub mod substitute;

pub use comments::strip_json_comments;
pub use substitute::{SubstitutionContext, substitute};

use crate::core::{ForgeError, ForgeResult};
use crate::registry::{NewServer, validate_server_name};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Package author, either a bare name or a details object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Details {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

/// How the packaged server is launched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// The `server` block of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Declared runtime (`node`, `python`, `binary`, `uv`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<LaunchConfig>,
}

/// A tool advertised by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single `user_config` declaration as written in the manifest.
#[derive(Debug, Clone, Default, Deserialize)]
struct UserConfigSpec {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    sensitive: Option<bool>,
}

/// A user-configurable value with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserConfigField {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub required: bool,
    pub sensitive: bool,
    pub default_value: String,
}

/// A parsed package manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub server: ServerSpec,
    /// Raw declarations in manifest order; see [`Self::user_config_fields`].
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

impl PackageManifest {
    /// Parse manifest bytes.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::ManifestInvalid`] for non-UTF-8 or non-JSON content, a
    ///   missing `name` or `server`, or fields of the wrong shape
    /// - [`ForgeError::NameInvalid`] if `name` is not a safe identifier
    pub fn parse(bytes: &[u8]) -> ForgeResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ForgeError::manifest_invalid("manifest.json is not UTF-8"))?;
        let value: Value = serde_json::from_str(&strip_json_comments(text))
            .map_err(|e| ForgeError::manifest_invalid(format!("manifest.json is not valid JSON: {e}")))?;

        let Value::Object(mut object) = value else {
            return Err(ForgeError::manifest_invalid("manifest.json must be a JSON object"));
        };

        let name = match object.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => validate_server_name(name)?,
            _ => return Err(ForgeError::manifest_invalid("missing required field 'name'")),
        };
        if !object.get("server").is_some_and(Value::is_object) {
            return Err(ForgeError::manifest_invalid("missing required field 'server'"));
        }
        object.insert("name".to_string(), Value::String(name));

        let manifest: Self = serde_json::from_value(Value::Object(object))
            .map_err(|e| ForgeError::manifest_invalid(e.to_string()))?;
        manifest.user_config_fields()?;

        Ok(manifest)
    }

    /// User-configurable fields, in manifest order, with defaults applied
    /// (`type` = `string`, `title` = key, everything else empty or `false`).
    pub fn user_config_fields(&self) -> ForgeResult<Vec<UserConfigField>> {
        self.user_config
            .iter()
            .map(|(key, raw)| {
                let spec: UserConfigSpec = serde_json::from_value(raw.clone()).map_err(|e| {
                    ForgeError::manifest_invalid(format!("user_config.{key}: {e}"))
                })?;
                let default_value = match spec.default {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                };
                Ok(UserConfigField {
                    key: key.clone(),
                    kind: spec.kind.filter(|k| !k.is_empty()).unwrap_or_else(|| "string".to_string()),
                    title: spec.title.filter(|t| !t.is_empty()).unwrap_or_else(|| key.clone()),
                    description: spec.description.unwrap_or_default(),
                    required: spec.required.unwrap_or(false),
                    sensitive: spec.sensitive.unwrap_or(false),
                    default_value,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn has_user_config(&self) -> bool {
        !self.user_config.is_empty()
    }

    /// Build the registry entry for this package, substituting placeholders in
    /// the command, every argument and every environment value.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::ManifestInvalid`] when the manifest has no
    /// `server.mcp_config.command`.
    pub fn to_server_entry(&self, context: &SubstitutionContext) -> ForgeResult<NewServer> {
        let launch = self
            .server
            .mcp_config
            .as_ref()
            .and_then(|config| {
                config
                    .command
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .map(|command| (command, config))
            });
        let Some((command, config)) = launch else {
            return Err(ForgeError::manifest_invalid(
                "manifest has no server.mcp_config.command; cannot build a server entry",
            ));
        };

        Ok(NewServer::Command {
            command: substitute(command, context),
            args: config.args.iter().map(|arg| substitute(arg, context)).collect(),
            env: config
                .env
                .iter()
                .map(|(key, value)| (key.clone(), substitute(value, context)))
                .collect(),
        })
    }
}
