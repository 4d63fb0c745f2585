//! The [`Forge`] facade.
//!
//! A host process (the CLI, or any other front end) holds one `Forge` and
//! calls it for every operation. It owns the scope configuration, the path
//! authority built from it, the approval tokens shared with the install
//! coordinator, and the activity log. Every operation that takes a path
//! authorizes it first; registry mutations that change something are recorded
//! in the activity log.

use crate::access::{AccessIntent, ApprovalTokenSet, AuthorizedPath, PathAuthority};
use crate::activity::{ActivityAction, ActivityEntry, ActivityLog};
use crate::archive::check_package_file;
use crate::config::ScopeConfig;
use crate::core::{ForgeError, ForgeResult};
use crate::health::{HealthStatus, check_health};
use crate::install::{InstallCoordinator, InstallOutcome, InstallRequest, PackageInspection};
use crate::registry::scan::{RegistryFile, ServerListing, scan_registries};
use crate::registry::{Mutation, NewServer, RegistryDocument, RegistryScope, edit_registry};
use crate::skills::{self, SkillFile};
use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Entry point for every scoped operation.
#[derive(Debug, Clone)]
pub struct Forge {
    config: ScopeConfig,
    authority: PathAuthority,
    coordinator: InstallCoordinator,
    activity: ActivityLog,
}

impl Forge {
    /// Build a facade for `config` with `home` as the home directory.
    #[must_use]
    pub fn new(config: ScopeConfig, home: impl Into<PathBuf>) -> Self {
        let config = config.sanitize();
        let authority = PathAuthority::new(&config, home);
        Self {
            config,
            authority,
            coordinator: InstallCoordinator::default(),
            activity: ActivityLog::new(),
        }
    }

    /// Load the configuration (see [`ScopeConfig::load_with_optional`]) and
    /// use the current user's home directory.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ScopeConfig::load_with_optional(config_path)?;
        let home = crate::utils::get_home_dir()?;
        Ok(Self::new(config, home))
    }

    #[must_use]
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    #[must_use]
    pub fn authority(&self) -> &PathAuthority {
        &self.authority
    }

    #[must_use]
    pub fn approvals(&self) -> &ApprovalTokenSet {
        self.coordinator.approvals()
    }

    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Snapshot of the activity log, newest first.
    #[must_use]
    pub fn activity_entries(&self) -> Vec<ActivityEntry> {
        self.activity.entries()
    }

    pub fn clear_activity(&self) {
        self.activity.clear();
    }

    // Skills

    #[must_use]
    pub fn scan_skills(&self) -> Vec<SkillFile> {
        skills::scan_skills(&self.authority)
    }

    pub fn read_skill(&self, path: &Path) -> ForgeResult<String> {
        skills::read_skill(&self.authority, path)
    }

    pub fn save_skill(&self, path: &Path, content: &str) -> ForgeResult<()> {
        skills::save_skill(&self.authority, path, content)
    }

    // Registries

    #[must_use]
    pub fn scan_registries(&self) -> Vec<RegistryFile> {
        scan_registries(&self.authority)
    }

    /// Every server of every registry in scope.
    #[must_use]
    pub fn list_servers(&self) -> Vec<ServerListing> {
        self.scan_registries().into_iter().flat_map(|file| file.servers).collect()
    }

    /// Read a registry file's raw text.
    pub fn read_registry(&self, path: &Path) -> ForgeResult<String> {
        let authorized = self.authority.authorize_registry(path, AccessIntent::Read)?;
        Ok(std::fs::read_to_string(authorized.path())?)
    }

    /// Replace a registry file's text. The content must be a JSON object.
    ///
    /// # Errors
    ///
    /// [`ForgeError::AccessDenied`] for paths outside scope or in the plugin
    /// cache, [`ForgeError::RegistryParse`] or
    /// [`ForgeError::RegistryFormatInvalid`] for bad content.
    pub fn save_registry(&self, path: &Path, content: &str) -> ForgeResult<()> {
        let authorized = self.authority.authorize_registry(path, AccessIntent::Write)?;
        RegistryDocument::parse(content, authorized.path())?;
        crate::registry::write_atomically(authorized.path(), content)?;
        tracing::info!("Saved MCP config {}", authorized.path().display());
        Ok(())
    }

    fn writable_registry(&self, path: &Path) -> ForgeResult<AuthorizedPath> {
        self.authority.authorize_registry(path, AccessIntent::Write)
    }

    /// Move a server between the active and disabled maps of a scope.
    pub fn toggle_server(
        &self,
        config_path: &Path,
        name: &str,
        enable: bool,
        project: Option<&str>,
    ) -> ForgeResult<Mutation> {
        let registry = self.writable_registry(config_path)?;
        let scope = RegistryScope::from_project(project);
        let outcome = edit_registry(&registry, false, |doc| doc.toggle_server(&scope, name, enable))?;

        if outcome.is_applied() {
            let action = if enable { ActivityAction::Enable } else { ActivityAction::Disable };
            self.activity.record(action, name, Some(config_path.display().to_string()));
        } else {
            tracing::info!("Server '{}' not found in {} of {}", name, scope, config_path.display());
        }
        Ok(outcome)
    }

    /// Add or replace a server in a scope. Returns the stored name.
    pub fn add_server(
        &self,
        config_path: &Path,
        name: &str,
        server: &NewServer,
        project: Option<&str>,
    ) -> ForgeResult<String> {
        let registry = self.writable_registry(config_path)?;
        let scope = RegistryScope::from_project(project);
        let stored = edit_registry(&registry, false, |doc| doc.add_server(&scope, name, server))?;
        self.activity.record(ActivityAction::Add, &stored, Some(config_path.display().to_string()));
        Ok(stored)
    }

    /// Remove a server from both maps of a scope.
    pub fn delete_server(
        &self,
        config_path: &Path,
        name: &str,
        project: Option<&str>,
    ) -> ForgeResult<Mutation> {
        let registry = self.writable_registry(config_path)?;
        let scope = RegistryScope::from_project(project);
        let outcome = edit_registry(&registry, false, |doc| doc.delete_server(&scope, name))?;
        if outcome.is_applied() {
            self.activity.record(ActivityAction::Delete, name, Some(config_path.display().to_string()));
        }
        Ok(outcome)
    }

    /// Import servers from JSON text into the top-level active map.
    pub fn import_servers(&self, config_path: &Path, snippet: &str) -> ForgeResult<Vec<String>> {
        let registry = self.writable_registry(config_path)?;
        let snippet: Value = serde_json::from_str(snippet)?;
        let imported = edit_registry(&registry, false, |doc| doc.import_servers(&snippet))?;
        self.activity.record(
            ActivityAction::Import,
            imported.join(", "),
            Some(format!("{} servers imported", imported.len())),
        );
        Ok(imported)
    }

    /// Replace a server's allowed tools.
    pub fn set_allowed_tools(
        &self,
        config_path: &Path,
        name: &str,
        tools: &[String],
        project: Option<&str>,
    ) -> ForgeResult<Mutation> {
        let registry = self.writable_registry(config_path)?;
        let scope = RegistryScope::from_project(project);
        let outcome =
            edit_registry(&registry, false, |doc| doc.set_allowed_tools(&scope, name, tools))?;
        if outcome.is_applied() {
            self.activity.record(
                ActivityAction::SetTools,
                name,
                Some(format!("{} tools allowed", tools.len())),
            );
        }
        Ok(outcome)
    }

    /// Probe the given servers and record a summary.
    pub async fn check_health(&self, servers: &[ServerListing]) -> BTreeMap<String, HealthStatus> {
        let results = check_health(servers).await;
        let connected = results.values().filter(|s| **s == HealthStatus::Connected).count();
        self.activity.record(
            ActivityAction::HealthCheck,
            "*",
            Some(format!("{connected}/{} connected", results.len())),
        );
        results
    }

    // Packages

    /// Approve a package chosen through a trusted selection surface.
    ///
    /// # Errors
    ///
    /// [`ForgeError::InvalidPackageFile`] if the file fails the static checks;
    /// nothing is approved in that case.
    pub fn select_package(&self, path: &Path) -> ForgeResult<PathBuf> {
        check_package_file(path)?;
        let canonical = crate::access::canonicalize(path);
        self.approvals().approve(&canonical);
        Ok(canonical)
    }

    pub fn inspect_package(&self, path: &Path) -> ForgeResult<PackageInspection> {
        self.coordinator.inspect(path)
    }

    /// Install an approved package into the registry at `config_path`.
    pub fn install_package(
        &self,
        path: &Path,
        config_path: &Path,
        user_values: HashMap<String, String>,
    ) -> ForgeResult<InstallOutcome> {
        let registry = match self.writable_registry(config_path) {
            Ok(registry) => registry,
            Err(e) => {
                // The attempt still uses up the approval
                let _ = self.approvals().consume(path);
                return Err(e);
            }
        };

        let outcome = self.coordinator.install(
            &self.authority,
            InstallRequest {
                package: path,
                registry: &registry,
                user_values,
            },
        )?;
        self.activity.record(
            ActivityAction::Install,
            &outcome.server_name,
            Some(format!("installed to {}", outcome.install_dir.display())),
        );
        Ok(outcome)
    }

    /// Authorize a path for revealing in a file explorer.
    pub fn authorize_explorer(&self, path: &Path) -> ForgeResult<PathBuf> {
        Ok(self.authority.authorize_explorer(path)?.into_path())
    }

    /// Escalate a not-found mutation outcome into an error.
    pub fn require_applied(
        outcome: Mutation,
        name: &str,
        config_path: &Path,
        project: Option<&str>,
    ) -> ForgeResult<()> {
        if outcome.is_applied() {
            return Ok(());
        }
        Err(ForgeError::NotFound {
            name: name.to_string(),
            scope: format!("{} of {}", RegistryScope::from_project(project), config_path.display()),
        })
    }
}
