//! Skill discovery and scoped editing.
//!
//! A skill is a directory holding a `SKILL.md` file. Skills are found in three
//! places:
//!
//! - configured skill roots (source [`SkillSource::User`])
//! - skill roots that are plugin marketplaces, recognized by a
//!   `/plugins/marketplaces` path segment and scanned deeper
//!   ([`SkillSource::Marketplace`])
//! - `.claude/skills` inside each project root and inside each non-hidden
//!   immediate sub-directory of a project root ([`SkillSource::Project`])
//!
//! Front-matter is not parsed here; [`read_skill`] hands the raw content to
//! the caller.

use crate::access::{AccessIntent, PathAuthority};
use crate::constants::{MARKETPLACE_SKILL_SCAN_DEPTH, SCAN_SKIP_DIRS, SKILL_SCAN_DEPTH};
use crate::core::{ForgeError, ForgeResult};
use crate::utils::find_files_named;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

const SKILL_FILE_NAME: &str = "SKILL.md";
const MARKETPLACE_MARKER: &str = "/plugins/marketplaces";

/// Where a skill was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    User,
    Project,
    Marketplace,
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
            Self::Marketplace => write!(f, "marketplace"),
        }
    }
}

/// A discovered `SKILL.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillFile {
    /// The file path with `\ / :` replaced by `_`.
    pub id: String,
    pub path: PathBuf,
    pub dir: PathBuf,
    pub source: SkillSource,
    pub label: String,
    /// `/<skill directory name>`
    pub slash_command: String,
}

impl SkillFile {
    fn new(path: PathBuf, source: SkillSource, label: String) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let id = path
            .to_string_lossy()
            .chars()
            .map(|c| if matches!(c, '\\' | '/' | ':') { '_' } else { c })
            .collect();
        Self {
            id,
            slash_command: format!("/{dir_name}"),
            path,
            dir,
            source,
            label,
        }
    }
}

fn is_marketplace_root(root: &Path) -> bool {
    root.to_string_lossy().replace('\\', "/").contains(MARKETPLACE_MARKER)
}

fn marketplace_label(root: &Path, file: &Path) -> String {
    let marketplace = file
        .strip_prefix(root)
        .ok()
        .and_then(|relative| relative.components().next())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_else(|| "marketplace".to_string());
    format!("Marketplace: {marketplace}")
}

fn project_skill_files(project_dir: &Path) -> Vec<PathBuf> {
    let skills_dir = project_dir.join(".claude").join("skills");
    if !skills_dir.is_dir() {
        return Vec::new();
    }
    find_files_named(&skills_dir, SKILL_FILE_NAME, SKILL_SCAN_DEPTH, SCAN_SKIP_DIRS)
}

/// Non-hidden immediate sub-directories of a project root, sorted.
fn project_subdirs(root: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name == "node_modules" {
                return None;
            }
            let path = entry.path();
            path.is_dir().then_some((name, path))
        })
        .collect();
    dirs.sort();
    dirs
}

/// Discover every skill in scope. The first occurrence of a file wins.
#[must_use]
pub fn scan_skills(authority: &PathAuthority) -> Vec<SkillFile> {
    let mut skills = Vec::new();
    let mut seen = HashSet::new();

    for root in authority.skill_roots() {
        if !root.exists() {
            continue;
        }
        let marketplace = is_marketplace_root(root);
        let depth = if marketplace { MARKETPLACE_SKILL_SCAN_DEPTH } else { SKILL_SCAN_DEPTH };

        for file in find_files_named(root, SKILL_FILE_NAME, depth, SCAN_SKIP_DIRS) {
            if !seen.insert(file.clone()) {
                continue;
            }
            let skill = if marketplace {
                let label = marketplace_label(root, &file);
                SkillFile::new(file, SkillSource::Marketplace, label)
            } else {
                SkillFile::new(file, SkillSource::User, "User".to_string())
            };
            skills.push(skill);
        }
    }

    for root in authority.project_roots() {
        if !root.exists() {
            continue;
        }
        let root_name = root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let mut candidates: Vec<(String, PathBuf)> =
            project_skill_files(root).into_iter().map(|f| (root_name.clone(), f)).collect();
        for (name, dir) in project_subdirs(root) {
            candidates.extend(project_skill_files(&dir).into_iter().map(|f| (name.clone(), f)));
        }

        for (project, file) in candidates {
            if seen.insert(file.clone()) {
                skills.push(SkillFile::new(file, SkillSource::Project, format!("Project: {project}")));
            }
        }
    }

    tracing::debug!("Found {} skills", skills.len());
    skills
}

/// Read a skill file after authorizing it.
///
/// # Errors
///
/// [`ForgeError::AccessDenied`] if the path is not an allowed skill file, or
/// an I/O error.
pub fn read_skill(authority: &PathAuthority, path: &Path) -> ForgeResult<String> {
    let authorized = authority.authorize_skill(path, AccessIntent::Read)?;
    Ok(std::fs::read_to_string(authorized.path())?)
}

/// Atomically replace the content of a skill file after authorizing it.
///
/// # Errors
///
/// [`ForgeError::AccessDenied`] if the path is not an allowed skill file, or
/// an I/O error.
pub fn save_skill(authority: &PathAuthority, path: &Path, content: &str) -> ForgeResult<()> {
    let authorized = authority.authorize_skill(path, AccessIntent::Write)?;
    crate::utils::safe_write(authorized.path(), content)
        .map_err(|e| ForgeError::IoError(std::io::Error::other(format!("{e:#}"))))?;
    tracing::info!("Saved skill {}", authorized.path().display());
    Ok(())
}
