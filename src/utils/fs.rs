//! File system helpers shared by the registry, skill and install layers.
//!
//! Every content write in forge goes through [`atomic_write`], so readers
//! never observe a half-written registry or skill file.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ensures a directory exists, creating it and its parents if necessary.
///
/// # Errors
///
/// Returns an error if the path exists but is not a directory, or creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    let safe_path = crate::utils::platform::windows_long_path(path);

    if !safe_path.exists() {
        fs::create_dir_all(&safe_path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars or that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };

            format!("Failed to create directory: {}\n\n{}", path.display(), platform_help)
        })?;
    } else if !safe_path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content is written to a temporary file in the same directory, synced
/// to disk, and then renamed over the target, so the file either holds the old
/// content or the new content. Parent directories are created when missing.
///
/// # Errors
///
/// Returns an error if any step of the write fails; the target is untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let safe_path = crate::utils::platform::windows_long_path(path);
    let parent = match safe_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    ensure_dir(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(&safe_path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", safe_path.display()))?;

    Ok(())
}

/// Atomically writes a string to a file. See [`atomic_write`].
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Reads a UTF-8 text file with a contextual error message.
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Find files named exactly `file_name` under `root`.
///
/// Directories are visited breadth-first with an explicit queue; `root` is
/// depth 0 and directories deeper than `max_depth` are not read. Directory
/// names in `skip` are never entered. Unreadable directories are skipped.
/// Results are sorted.
#[must_use]
pub fn find_files_named(root: &Path, file_name: &str, max_depth: usize, skip: &[&str]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([(root.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let entry_name = entry.file_name();
            let name = entry_name.to_string_lossy();
            if skip.contains(&name.as_ref()) {
                continue;
            }

            let path = entry.path();
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            if metadata.is_file() && name == file_name {
                found.push(path);
            } else if metadata.is_dir() && depth < max_depth {
                queue.push_back((path, depth + 1));
            }
        }
    }

    found.sort();
    found
}
