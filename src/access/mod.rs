//! Scoped path authorization.
//!
//! [`PathAuthority`] decides whether a filesystem path may be read or written
//! by comparing its canonical form against the roots declared in a
//! [`ScopeConfig`]. Every check canonicalizes both sides first, so symlinks,
//! `.`/`..` segments and case-folding on case-insensitive filesystems cannot
//! be used to step outside a root.
//!
//! # Rules
//!
//! - **Skill files**: the basename is `SKILL.md` (any case) and the path lies
//!   within a skill root, or within a project root under `.claude/skills/`.
//! - **Registry files**: the path equals a configured registry path, or it is
//!   a `.mcp.json` inside the plugin cache, or a `.mcp.json` inside a project
//!   root. Plugin cache registries are read-only.
//! - **Project paths**: anything within a project root.
//!
//! A denial is an [`ForgeError::AccessDenied`]; there is no fallback to an
//! unscoped path.

pub mod approval;

pub use approval::ApprovalTokenSet;

use crate::config::ScopeConfig;
use crate::core::{ForgeError, ForgeResult};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

const SKILL_FILE_NAME: &str = "SKILL.md";
const PROJECT_REGISTRY_FILE_NAME: &str = ".mcp.json";

static PROJECT_SKILL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(^|/)\.claude/skills/(?:.+/)?SKILL\.md$").ok());

/// How a path was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationKind {
    /// A `SKILL.md` inside a skill root or a project skills directory.
    Skill,
    /// A registry file.
    Registry,
    /// Any path within a project root.
    ProjectPath,
    /// Outside every scope.
    Denied,
}

/// Whether the caller intends to read or write the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessIntent {
    Read,
    Write,
}

/// A canonical path that passed an authorization check.
///
/// Only [`PathAuthority`] creates these, so holding one proves the check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPath {
    path: PathBuf,
    kind: AuthorizationKind,
    intent: AccessIntent,
}

impl AuthorizedPath {
    /// The canonical path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> AuthorizationKind {
        self.kind
    }

    #[must_use]
    pub const fn intent(&self) -> AccessIntent {
        self.intent
    }

    /// Returns `true` if the path was authorized for writing.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.intent == AccessIntent::Write
    }

    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Canonicalize a path, tolerating a target that does not exist yet.
///
/// The nearest existing ancestor is fully resolved and the missing tail is
/// re-appended with `.` and `..` applied lexically, so a symlinked ancestor of
/// a file about to be created is still resolved. With no resolvable ancestor
/// the absolute, lexically normalized path is returned.
#[must_use]
pub fn canonicalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    for ancestor in absolute.ancestors() {
        if let Ok(resolved) = std::fs::canonicalize(ancestor) {
            return match absolute.strip_prefix(ancestor) {
                Ok(tail) if tail.as_os_str().is_empty() => resolved,
                Ok(tail) => normalize_lexically(&resolved.join(tail)),
                Err(_) => resolved,
            };
        }
    }
    normalize_lexically(&absolute)
}

/// Remove `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Decides which paths fall inside the configured scopes.
#[derive(Debug, Clone)]
pub struct PathAuthority {
    home: PathBuf,
    skill_roots: Vec<PathBuf>,
    registry_paths: Vec<PathBuf>,
    project_roots: Vec<PathBuf>,
    case_insensitive: bool,
}

impl PathAuthority {
    /// Build an authority for `config`, expanding `~` against `home`.
    #[must_use]
    pub fn new(config: &ScopeConfig, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            skill_roots: config.skill_roots(&home),
            registry_paths: config.registry_files(&home),
            project_roots: config.project_dirs(&home),
            home,
            case_insensitive: crate::utils::is_case_insensitive_fs(),
        }
    }

    /// Override case folding (defaults to the platform's filesystem behavior).
    #[must_use]
    pub const fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn skill_roots(&self) -> &[PathBuf] {
        &self.skill_roots
    }

    #[must_use]
    pub fn registry_paths(&self) -> &[PathBuf] {
        &self.registry_paths
    }

    #[must_use]
    pub fn project_roots(&self) -> &[PathBuf] {
        &self.project_roots
    }

    /// The externally managed plugin cache (`~/.claude/plugins/cache`).
    #[must_use]
    pub fn plugin_cache_dir(&self) -> PathBuf {
        self.home.join(".claude").join("plugins").join("cache")
    }

    /// Where packages are extracted (`~/.claude/extensions`).
    #[must_use]
    pub fn extensions_root(&self) -> PathBuf {
        self.home.join(".claude").join("extensions")
    }

    fn fold(&self, path: &Path) -> PathBuf {
        if self.case_insensitive {
            PathBuf::from(path.to_string_lossy().to_lowercase())
        } else {
            path.to_path_buf()
        }
    }

    fn same_path(&self, a: &Path, b: &Path) -> bool {
        self.fold(a) == self.fold(b)
    }

    fn name_matches(&self, path: &Path, expected: &str) -> bool {
        path.file_name().is_some_and(|name| {
            let name = name.to_string_lossy();
            if self.case_insensitive {
                name.eq_ignore_ascii_case(expected)
            } else {
                name == expected
            }
        })
    }

    /// Returns `true` iff `target` equals `root` or descends from it, after
    /// canonicalizing both.
    ///
    /// The comparison is per path component, so `/a/bc` is never within `/a/b`.
    #[must_use]
    pub fn is_within(&self, root: &Path, target: &Path) -> bool {
        let root = self.fold(&canonicalize(root));
        let target = self.fold(&canonicalize(target));
        target.starts_with(&root)
    }

    fn within_any<'a>(&self, roots: &'a [PathBuf], target: &Path) -> Option<&'a PathBuf> {
        roots.iter().find(|root| self.is_within(root, target))
    }

    /// Classify a skill file without raising.
    #[must_use]
    pub fn classify_skill(&self, target: &Path) -> AuthorizationKind {
        let canonical = canonicalize(target);
        let is_skill_name = canonical
            .file_name()
            .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(SKILL_FILE_NAME));
        if !is_skill_name {
            return AuthorizationKind::Denied;
        }

        if self.within_any(&self.skill_roots, &canonical).is_some() {
            return AuthorizationKind::Skill;
        }

        let in_project_skills = self.project_roots.iter().any(|root| {
            let root = canonicalize(root);
            if !self.fold(&canonical).starts_with(self.fold(&root)) {
                return false;
            }
            let relative: Vec<String> = canonical
                .components()
                .skip(root.components().count())
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            PROJECT_SKILL_RE.as_ref().is_some_and(|re| re.is_match(&relative.join("/")))
        });

        if in_project_skills {
            AuthorizationKind::Skill
        } else {
            AuthorizationKind::Denied
        }
    }

    /// Classify a registry file for the given intent without raising.
    #[must_use]
    pub fn classify_registry(&self, target: &Path, intent: AccessIntent) -> AuthorizationKind {
        let canonical = canonicalize(target);
        let in_plugin_cache = self.is_within(&self.plugin_cache_dir(), &canonical);

        if in_plugin_cache && intent == AccessIntent::Write {
            return AuthorizationKind::Denied;
        }

        if self.registry_paths.iter().any(|p| self.same_path(&canonicalize(p), &canonical)) {
            return AuthorizationKind::Registry;
        }

        if !self.name_matches(&canonical, PROJECT_REGISTRY_FILE_NAME) {
            return AuthorizationKind::Denied;
        }

        if in_plugin_cache || self.within_any(&self.project_roots, &canonical).is_some() {
            AuthorizationKind::Registry
        } else {
            AuthorizationKind::Denied
        }
    }

    /// Returns `true` if `target` lies inside the read-only plugin cache.
    #[must_use]
    pub fn is_plugin_registry(&self, target: &Path) -> bool {
        self.is_within(&self.plugin_cache_dir(), target)
    }

    /// Authorize a skill file for reading or writing.
    pub fn authorize_skill(&self, target: &Path, intent: AccessIntent) -> ForgeResult<AuthorizedPath> {
        match self.classify_skill(target) {
            AuthorizationKind::Denied => {
                Err(self.deny(target, "skill path is outside configured scope"))
            }
            kind => Ok(self.grant(target, kind, intent)),
        }
    }

    /// Authorize a registry file for reading or writing.
    pub fn authorize_registry(
        &self,
        target: &Path,
        intent: AccessIntent,
    ) -> ForgeResult<AuthorizedPath> {
        match self.classify_registry(target, intent) {
            AuthorizationKind::Denied
                if intent == AccessIntent::Write && self.is_plugin_registry(target) =>
            {
                Err(self.deny(target, "plugin registries are read-only"))
            }
            AuthorizationKind::Denied => {
                Err(self.deny(target, "MCP config path is outside configured scope"))
            }
            kind => Ok(self.grant(target, kind, intent)),
        }
    }

    /// Authorize any path within a configured project root.
    pub fn authorize_project_path(
        &self,
        target: &Path,
        intent: AccessIntent,
    ) -> ForgeResult<AuthorizedPath> {
        if self.within_any(&self.project_roots, target).is_some() {
            Ok(self.grant(target, AuthorizationKind::ProjectPath, intent))
        } else {
            Err(self.deny(target, "path is outside configured project roots"))
        }
    }

    /// Authorize a path for opening in a file explorer: an allowed skill file,
    /// an allowed registry file, or anything within a project root.
    pub fn authorize_explorer(&self, target: &Path) -> ForgeResult<AuthorizedPath> {
        let kind = match self.classify_skill(target) {
            AuthorizationKind::Denied => self.classify_registry(target, AccessIntent::Read),
            kind => kind,
        };
        if kind != AuthorizationKind::Denied {
            return Ok(self.grant(target, kind, AccessIntent::Read));
        }
        self.authorize_project_path(target, AccessIntent::Read)
    }

    /// Authorize `target` for writing if it is a direct child of `root`.
    ///
    /// Used for directories derived from untrusted names, such as a package's
    /// install directory under the extensions root. `root` itself is refused.
    pub fn authorize_child(&self, root: &Path, target: &Path) -> ForgeResult<AuthorizedPath> {
        let root = canonicalize(root);
        let canonical = canonicalize(target);
        let is_child = canonical.parent().is_some_and(|parent| self.same_path(parent, &root))
            && !self.same_path(&canonical, &root);
        if is_child {
            Ok(self.grant(target, AuthorizationKind::ProjectPath, AccessIntent::Write))
        } else {
            Err(self.deny(target, &format!("path is not a directory directly under {}", root.display())))
        }
    }

    fn grant(&self, target: &Path, kind: AuthorizationKind, intent: AccessIntent) -> AuthorizedPath {
        AuthorizedPath {
            path: canonicalize(target),
            kind,
            intent,
        }
    }

    fn deny(&self, target: &Path, reason: &str) -> ForgeError {
        tracing::warn!("Denied access to {}: {}", target.display(), reason);
        ForgeError::access_denied(format!("{reason}: {}", target.display()))
    }
}
