//! Platform helpers: home directory resolution, tilde expansion and
//! filesystem case-sensitivity.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Returns `true` when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns `true` on platforms whose default filesystems compare names
/// case-insensitively (Windows, macOS).
#[must_use]
pub const fn is_case_insensitive_fs() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

/// Get the user's home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Expands a leading `~` against the given home directory.
///
/// Only the home shorthand is expanded; environment variables are left as-is
/// so a configured path cannot be redirected by the environment.
#[must_use]
pub fn expand_home(input: &str, home: &Path) -> PathBuf {
    let home = home.to_string_lossy().into_owned();
    PathBuf::from(shellexpand::tilde_with_context(input, || Some(home)).into_owned())
}

/// Adds the `\\?\` prefix to long Windows paths.
#[cfg(windows)]
pub fn windows_long_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str.len() > 260 && !path_str.starts_with(r"\\?\") {
        let absolute_path = if path.is_relative() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(path)
        } else {
            path.to_path_buf()
        };

        let absolute_str = absolute_path.to_string_lossy();
        if absolute_str.len() > 260 {
            if let Some(stripped) = absolute_str.strip_prefix(r"\\") {
                PathBuf::from(format!(r"\\?\UNC\{stripped}"))
            } else {
                PathBuf::from(format!(r"\\?\{absolute_str}"))
            }
        } else {
            absolute_path
        }
    } else {
        path.to_path_buf()
    }
}

/// No-op on non-Windows platforms.
#[cfg(not(windows))]
#[must_use]
pub fn windows_long_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/alice");
        assert_eq!(expand_home("~/.claude.json", home), PathBuf::from("/home/alice/.claude.json"));
        assert_eq!(expand_home("~", home), PathBuf::from("/home/alice"));
        assert_eq!(expand_home("/etc/x", home), PathBuf::from("/etc/x"));
        // Only a leading tilde expands
        assert_eq!(expand_home("/a/~/b", home), PathBuf::from("/a/~/b"));
        // Environment variables are not expanded
        assert_eq!(expand_home("$HOME/x", home), PathBuf::from("$HOME/x"));
    }
}
