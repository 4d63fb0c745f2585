//! Placeholder substitution in manifest launch specifications.
//!
//! Recognized placeholders:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `${__dirname}` | install directory |
//! | `${HOME}` | home directory |
//! | `${DESKTOP}`, `${DOCUMENTS}`, `${DOWNLOADS}` | the matching folder under home |
//! | `${pathSeparator}`, `${/}` | platform path separator |
//! | `${user_config.KEY}` | caller-supplied value, empty when absent |
//!
//! Anything else is left untouched.

use std::collections::HashMap;
use std::path::{MAIN_SEPARATOR_STR, PathBuf};

/// Values available to [`substitute`].
#[derive(Debug, Clone)]
pub struct SubstitutionContext {
    pub install_dir: PathBuf,
    pub home: PathBuf,
    pub user_values: HashMap<String, String>,
}

impl SubstitutionContext {
    #[must_use]
    pub fn new(install_dir: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            home: home.into(),
            user_values: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_user_values(mut self, values: HashMap<String, String>) -> Self {
        self.user_values = values;
        self
    }

    fn resolve(&self, key: &str) -> Option<String> {
        let home_child = |name: &str| self.home.join(name).to_string_lossy().into_owned();
        match key {
            "__dirname" => Some(self.install_dir.to_string_lossy().into_owned()),
            "HOME" => Some(self.home.to_string_lossy().into_owned()),
            "DESKTOP" => Some(home_child("Desktop")),
            "DOCUMENTS" => Some(home_child("Documents")),
            "DOWNLOADS" => Some(home_child("Downloads")),
            "pathSeparator" | "/" => Some(MAIN_SEPARATOR_STR.to_string()),
            _ => key
                .strip_prefix("user_config.")
                .map(|name| self.user_values.get(name).cloned().unwrap_or_default()),
        }
    }
}

/// Replace every recognized `${...}` placeholder in `template`.
///
/// Substituted values are not rescanned.
#[must_use]
pub fn substitute(template: &str, context: &SubstitutionContext) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &after[..end];
        match context.resolve(key) {
            Some(value) => output.push_str(&value),
            None => output.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SubstitutionContext {
        SubstitutionContext::new("/x/extensions/my-tool", "/home/alice")
    }

    #[test]
    fn test_install_dir_and_home() {
        let ctx = context();
        assert_eq!(substitute("${__dirname}/run.sh", &ctx), "/x/extensions/my-tool/run.sh");
        assert_eq!(substitute("--home=${HOME}", &ctx), "--home=/home/alice");
    }

    #[cfg(unix)]
    #[test]
    fn test_well_known_folders_and_separator() {
        let ctx = context();
        assert_eq!(substitute("${DESKTOP}", &ctx), "/home/alice/Desktop");
        assert_eq!(substitute("${DOCUMENTS}${/}a", &ctx), "/home/alice/Documents/a");
        assert_eq!(substitute("${DOWNLOADS}${pathSeparator}b", &ctx), "/home/alice/Downloads/b");
    }

    #[test]
    fn test_user_config_values() {
        let mut values = HashMap::new();
        values.insert("api_key".to_string(), "secret".to_string());
        let ctx = context().with_user_values(values);

        assert_eq!(substitute("KEY=${user_config.api_key}", &ctx), "KEY=secret");
        assert_eq!(substitute("[${user_config.missing}]", &ctx), "[]");
    }

    #[test]
    fn test_unknown_and_unterminated_placeholders_are_kept() {
        let ctx = context();
        assert_eq!(substitute("${UNKNOWN}/${}", &ctx), "${UNKNOWN}/${}");
        assert_eq!(substitute("a ${HOME", &ctx), "a ${HOME");
        assert_eq!(substitute("$HOME", &ctx), "$HOME");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut values = HashMap::new();
        values.insert("v".to_string(), "${HOME}".to_string());
        let ctx = context().with_user_values(values);
        assert_eq!(substitute("${user_config.v}", &ctx), "${HOME}");
    }
}
