use crate::access::{AccessIntent, AuthorizedPath, PathAuthority};
use crate::config::ScopeConfig;
use std::path::Path;

/// Authorize `path` for writing through a scope whose only registry is `path`.
pub(crate) fn writable(home: &Path, path: &Path) -> AuthorizedPath {
    let config = ScopeConfig::new(
        vec![],
        vec![path.to_string_lossy().into_owned()],
        vec![home.join("projects").to_string_lossy().into_owned()],
    );
    PathAuthority::new(&config, home).authorize_registry(path, AccessIntent::Write).unwrap()
}
