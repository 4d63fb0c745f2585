//! Package installation.
//!
//! An installation attempt moves through these stages:
//!
//! ```text
//! Selected -> Validated -> Extracted -> Registered -> Committed
//!     \__________\____________\____________\________-> Failed
//! ```
//!
//! - **Selected**: the package's approval token is consumed (a missing token
//!   is [`ForgeError::AccessDenied`]) and the static file checks pass.
//! - **Validated**: the archive's entry table passes [`crate::archive`] and the
//!   manifest parses with a safe server name.
//! - **Extracted**: files land in `<extensions root>/<server name>`, after the
//!   authority confirms that directory sits directly under the extensions
//!   root. Files of a prior install with the same name are overwritten.
//! - **Registered**: the placeholder-substituted launch entry is added to the
//!   top-level servers of the target registry.
//!
//! The approval token is consumed at the start of every attempt, so an
//! approval is good for exactly one attempt whatever its outcome. Files
//! extracted before a later failure are left in place; such failures are
//! reported as [`ForgeError::InstallFailed`] carrying the install directory.

use crate::access::{ApprovalTokenSet, AuthorizedPath, PathAuthority};
use crate::archive::{PackageArchive, ValidatedEntries, check_package_file};
use crate::core::{ForgeError, ForgeResult};
use crate::package::{PackageManifest, SubstitutionContext, UserConfigField};
use crate::registry::{RegistryScope, edit_registry};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stage of one installation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStage {
    Selected,
    Validated,
    Extracted,
    Registered,
    Committed,
    Failed,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Selected => "selected",
            Self::Validated => "validated",
            Self::Extracted => "extracted",
            Self::Registered => "registered",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a package declares, without installing it.
#[derive(Debug, Clone, Serialize)]
pub struct PackageInspection {
    pub path: PathBuf,
    pub manifest: PackageManifest,
    pub user_config: Vec<UserConfigField>,
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// A committed installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub server_name: String,
    pub install_dir: PathBuf,
    pub registry: PathBuf,
    pub files: usize,
}

/// Inputs of one installation.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    /// The selected package file.
    pub package: &'a Path,
    /// Registry to register the server in, already authorized for writing.
    pub registry: &'a AuthorizedPath,
    /// Values for `${user_config.KEY}` placeholders.
    pub user_values: HashMap<String, String>,
}

/// Tracks the stage of one attempt for logging.
struct Attempt<'a> {
    package: &'a Path,
    stage: InstallStage,
}

impl<'a> Attempt<'a> {
    fn new(package: &'a Path) -> Self {
        tracing::info!("Installing package {}", package.display());
        Self {
            package,
            stage: InstallStage::Selected,
        }
    }

    fn advance(&mut self, stage: InstallStage) {
        tracing::debug!("Package {}: {} -> {}", self.package.display(), self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, error: ForgeError) -> ForgeError {
        tracing::warn!(
            "Package {} failed after stage {}: {}",
            self.package.display(),
            self.stage,
            error
        );
        self.stage = InstallStage::Failed;
        error
    }
}

fn open_validated(path: &Path) -> ForgeResult<(PackageArchive, ValidatedEntries, PackageManifest)> {
    check_package_file(path)?;
    let mut archive = PackageArchive::open(path)?;
    let validated = archive.validate()?;
    let manifest = PackageManifest::parse(&archive.read_manifest(&validated)?)?;
    Ok((archive, validated, manifest))
}

/// Runs installations gated by an [`ApprovalTokenSet`].
#[derive(Debug, Clone, Default)]
pub struct InstallCoordinator {
    approvals: ApprovalTokenSet,
}

impl InstallCoordinator {
    /// Create a coordinator sharing `approvals` with the selection surface.
    #[must_use]
    pub fn new(approvals: ApprovalTokenSet) -> Self {
        Self {
            approvals,
        }
    }

    #[must_use]
    pub fn approvals(&self) -> &ApprovalTokenSet {
        &self.approvals
    }

    /// Validate an approved package and describe it. The approval is kept.
    ///
    /// # Errors
    ///
    /// [`ForgeError::AccessDenied`] if `path` is not approved, otherwise any
    /// file, archive or manifest validation error.
    pub fn inspect(&self, path: &Path) -> ForgeResult<PackageInspection> {
        if !self.approvals.is_approved(path) {
            return Err(ForgeError::access_denied(format!(
                "package was not selected: {}",
                path.display()
            )));
        }

        let (_, validated, manifest) = open_validated(path)?;
        Ok(PackageInspection {
            path: path.to_path_buf(),
            user_config: manifest.user_config_fields()?,
            manifest,
            entry_count: validated.entries().len(),
            total_bytes: validated.total_bytes(),
        })
    }

    /// Install an approved package and register its server.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::AccessDenied`] if the package was not approved (or its
    ///   approval was already used), the registry was not authorized for
    ///   writing, or the install directory would escape the extensions root
    /// - validation errors from the file, archive and manifest checks, raised
    ///   before anything is written
    /// - [`ForgeError::InstallFailed`] for failures once extraction started
    pub fn install(
        &self,
        authority: &PathAuthority,
        request: InstallRequest<'_>,
    ) -> ForgeResult<InstallOutcome> {
        let mut attempt = Attempt::new(request.package);

        if !self.approvals.consume(request.package) {
            return Err(attempt.fail(ForgeError::access_denied(format!(
                "package was not selected or its approval was already used: {}",
                request.package.display()
            ))));
        }

        if !request.registry.is_writable() {
            return Err(attempt.fail(ForgeError::access_denied(format!(
                "{} is not authorized for writing",
                request.registry.path().display()
            ))));
        }

        let (mut archive, validated, manifest) =
            open_validated(request.package).map_err(|e| attempt.fail(e))?;
        attempt.advance(InstallStage::Validated);

        let extensions_root = authority.extensions_root();
        let install_dir = authority
            .authorize_child(&extensions_root, &extensions_root.join(&manifest.name))
            .map_err(|e| attempt.fail(e))?
            .into_path();

        let registered = self.extract_and_register(
            authority,
            &request,
            &mut archive,
            &validated,
            &manifest,
            &install_dir,
            &mut attempt,
        );

        match registered {
            Ok(outcome) => {
                attempt.advance(InstallStage::Committed);
                tracing::info!(
                    "Installed {} into {}",
                    outcome.server_name,
                    outcome.install_dir.display()
                );
                Ok(outcome)
            }
            Err(e) => Err(attempt.fail(ForgeError::InstallFailed {
                install_dir,
                source: Box::new(e),
            })),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_and_register(
        &self,
        authority: &PathAuthority,
        request: &InstallRequest<'_>,
        archive: &mut PackageArchive,
        validated: &ValidatedEntries,
        manifest: &PackageManifest,
        install_dir: &Path,
        attempt: &mut Attempt<'_>,
    ) -> ForgeResult<InstallOutcome> {
        let files = archive.extract_to(validated, install_dir)?;
        attempt.advance(InstallStage::Extracted);

        let context = SubstitutionContext::new(install_dir, authority.home())
            .with_user_values(request.user_values.clone());
        let server = manifest.to_server_entry(&context)?;
        let server_name = edit_registry(request.registry, true, |document| {
            document.add_server(&RegistryScope::Root, &manifest.name, &server)
        })?;
        attempt.advance(InstallStage::Registered);

        Ok(InstallOutcome {
            server_name,
            install_dir: install_dir.to_path_buf(),
            registry: request.registry.path().to_path_buf(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessIntent;
    use crate::test_utils::{PackageFixture, TestHome, init_test_logging};
    use serde_json::{Value, json};
    use std::fs;

    struct Setup {
        env: TestHome,
        authority: PathAuthority,
        registry: AuthorizedPath,
        coordinator: InstallCoordinator,
    }

    fn setup() -> Setup {
        init_test_logging(None);
        let env = TestHome::new().unwrap();
        let authority = PathAuthority::new(&env.config(), &env.home);
        let registry = authority.authorize_registry(&env.registry(), AccessIntent::Write).unwrap();
        Setup {
            env,
            authority,
            registry,
            coordinator: InstallCoordinator::default(),
        }
    }

    fn request<'a>(package: &'a Path, registry: &'a AuthorizedPath) -> InstallRequest<'a> {
        InstallRequest {
            package,
            registry,
            user_values: HashMap::new(),
        }
    }

    fn registry_json(setup: &Setup) -> Value {
        serde_json::from_str(&fs::read_to_string(setup.env.registry()).unwrap()).unwrap()
    }

    #[test]
    fn test_install_substitutes_and_registers() {
        let s = setup();
        let package = PackageFixture::basic("my-tool")
            .with_file("server/", "")
            .with_file("server/index.js", "console.log(1)")
            .write_to(&s.env.temp.path().join("my-tool.dxt"))
            .unwrap();
        s.coordinator.approvals().approve(&package);

        let outcome = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap();

        let install_dir = outcome.install_dir.clone();
        assert_eq!(outcome.server_name, "my-tool");
        assert_eq!(
            crate::access::canonicalize(&install_dir),
            crate::access::canonicalize(&s.env.home.join(".claude/extensions/my-tool"))
        );
        assert_eq!(outcome.files, 3);
        assert!(install_dir.join("server/index.js").is_file());
        assert!(s.coordinator.approvals().is_empty());

        let run = install_dir.join("run.sh").to_string_lossy().into_owned();
        let home_arg = format!("--home={}", s.env.home.display());
        assert_eq!(
            registry_json(&s)["mcpServers"]["my-tool"],
            json!({"command": run, "args": [home_arg]})
        );
    }

    #[test]
    fn test_reinstall_overwrites_previous_version() {
        let s = setup();
        let v1 = PackageFixture::basic("my-tool")
            .with_file("lib/v1.js", "1")
            .write_to(&s.env.temp.path().join("my-tool-1.dxt"))
            .unwrap();
        s.coordinator.approvals().approve(&v1);
        let first = s.coordinator.install(&s.authority, request(&v1, &s.registry)).unwrap();

        let v2 = PackageFixture::new(
            r#"{"name": "my-tool", "version": "2.0.0",
                "server": {"mcp_config": {"command": "${__dirname}/run.sh", "args": ["--v2"]}}}"#,
        )
        .with_file("run.sh", "#!/bin/sh\necho v2\n")
        .write_to(&s.env.temp.path().join("my-tool-2.dxt"))
        .unwrap();
        s.coordinator.approvals().approve(&v2);
        let second = s.coordinator.install(&s.authority, request(&v2, &s.registry)).unwrap();

        assert_eq!(first.install_dir, second.install_dir);
        assert_eq!(fs::read_to_string(second.install_dir.join("run.sh")).unwrap(), "#!/bin/sh\necho v2\n");
        let run = second.install_dir.join("run.sh").to_string_lossy().into_owned();
        assert_eq!(registry_json(&s)["mcpServers"], json!({"my-tool": {"command": run, "args": ["--v2"]}}));
    }

    #[test]
    fn test_dot_name_cannot_target_extensions_root() {
        let s = setup();
        let victim = s.env.home.join(".claude/extensions/victim");
        fs::create_dir_all(&victim).unwrap();
        fs::write(victim.join("run.sh"), "original").unwrap();

        for name in [".", ".."] {
            let package = PackageFixture::new(format!(
                r#"{{"name": "{name}", "server": {{"mcp_config": {{"command": "x"}}}}}}"#
            ))
            .with_file("victim/run.sh", "clobbered")
            .write_to(&s.env.temp.path().join("dots.dxt"))
            .unwrap();
            s.coordinator.approvals().approve(&package);

            let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
            assert!(matches!(err, ForgeError::NameInvalid { .. }), "{name}: {err:?}");
        }

        assert_eq!(fs::read_to_string(victim.join("run.sh")).unwrap(), "original");
        assert_eq!(registry_json(&s), json!({}));
    }

    #[test]
    fn test_unapproved_package_is_denied() {
        let s = setup();
        let package = PackageFixture::basic("tool").write_to(&s.env.temp.path().join("tool.dxt")).unwrap();

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        assert!(err.is_access_denied());
        assert!(!s.env.home.join(".claude/extensions").exists());

        let err = s.coordinator.inspect(&package).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_approval_is_single_use_even_on_failure() {
        let s = setup();
        let package = s.env.write("bad.dxt", "definitely not a zip").unwrap();
        s.coordinator.approvals().approve(&package);

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArchive { .. }));

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_static_checks_run_before_archive() {
        let s = setup();
        let package = PackageFixture::basic("tool").write_to(&s.env.temp.path().join("tool.exe")).unwrap();
        s.coordinator.approvals().approve(&package);

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidPackageFile { .. }));
    }

    #[test]
    fn test_traversal_entry_rejected_before_extraction() {
        let s = setup();
        let package = PackageFixture::basic("tool")
            .with_file("../../escape.txt", "x")
            .write_to(&s.env.temp.path().join("tool.mcpb"))
            .unwrap();
        s.coordinator.approvals().approve(&package);

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArchive { .. }));
        assert!(!s.env.home.join(".claude/extensions").exists());
        assert_eq!(registry_json(&s), json!({}));
    }

    #[test]
    fn test_failure_after_extraction_reports_install_dir() {
        let s = setup();
        let package = PackageFixture::new(r#"{"name": "no-launch", "server": {"type": "node"}}"#)
            .with_file("index.js", "1")
            .write_to(&s.env.temp.path().join("no-launch.dxt"))
            .unwrap();
        s.coordinator.approvals().approve(&package);

        let err = s.coordinator.install(&s.authority, request(&package, &s.registry)).unwrap_err();
        let ForgeError::InstallFailed {
            install_dir,
            source,
        } = err
        else {
            panic!("expected InstallFailed, got {err:?}");
        };
        assert!(matches!(*source, ForgeError::ManifestInvalid { .. }));
        assert!(install_dir.join("index.js").is_file());
        assert_eq!(registry_json(&s), json!({}));
    }

    #[test]
    fn test_inspect_keeps_approval() {
        let s = setup();
        let package = PackageFixture::new(
            r#"{"name": "cfg", "server": {"mcp_config": {"command": "node", "env": {"KEY": "${user_config.api_key}"}}},
                "user_config": {"api_key": {"type": "string", "sensitive": true, "required": true}, "dir": {}}}"#,
        )
        .write_to(&s.env.temp.path().join("cfg.dxt"))
        .unwrap();
        s.coordinator.approvals().approve(&package);

        let inspection = s.coordinator.inspect(&package).unwrap();
        assert_eq!(inspection.manifest.name, "cfg");
        assert_eq!(inspection.entry_count, 1);
        let keys: Vec<_> = inspection.user_config.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["api_key", "dir"]);
        assert!(inspection.user_config[0].sensitive);
        assert_eq!(inspection.user_config[1].title, "dir");
        assert!(s.coordinator.approvals().is_approved(&package));

        let mut install = request(&package, &s.registry);
        install.user_values.insert("api_key".to_string(), "secret".to_string());
        s.coordinator.install(&s.authority, install).unwrap();
        assert_eq!(registry_json(&s)["mcpServers"]["cfg"]["env"]["KEY"], "secret");
    }

    #[test]
    fn test_registry_must_be_writable() {
        let s = setup();
        let read_only = s.authority.authorize_registry(&s.env.registry(), AccessIntent::Read).unwrap();
        let package = PackageFixture::basic("tool").write_to(&s.env.temp.path().join("tool.dxt")).unwrap();
        s.coordinator.approvals().approve(&package);

        let err = s.coordinator.install(&s.authority, request(&package, &read_only)).unwrap_err();
        assert!(err.is_access_denied());
        assert!(!s.env.home.join(".claude/extensions").exists());
        assert!(!s.coordinator.approvals().is_approved(&package));
    }
}
