//! Fixtures for package archives and a throwaway home directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Builds a `.dxt`/`.mcpb` zip archive in-process.
#[derive(Clone, Debug, Default)]
pub struct PackageFixture {
    entries: Vec<(String, Vec<u8>)>,
}

impl PackageFixture {
    /// A package whose `manifest.json` holds `manifest`.
    pub fn new(manifest: impl Into<String>) -> Self {
        Self::default().with_file("manifest.json", manifest.into())
    }

    /// A runnable package named `name` with a launch script:
    /// `${__dirname}/run.sh --home=${HOME}`.
    pub fn basic(name: &str) -> Self {
        Self::new(format!(
            r#"{{
  // generated fixture
  "name": "{name}",
  "version": "1.0.0",
  "server": {{
    "type": "binary",
    "mcp_config": {{
      "command": "${{__dirname}}/run.sh",
      "args": ["--home=${{HOME}}"]
    }}
  }}
}}"#
        ))
        .with_file("run.sh", "#!/bin/sh\necho ok\n")
    }

    /// Add a file entry. Names ending in `/` become directory entries.
    pub fn with_file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.push((name.to_string(), content.into()));
        self
    }

    /// Write the archive to `path`.
    pub fn write_to(&self, path: &Path) -> Result<PathBuf> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create package fixture: {}", path.display()))?;
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in &self.entries {
            if name.ends_with('/') {
                zip.add_directory(name.as_str(), SimpleFileOptions::default())?;
            } else {
                zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                zip.write_all(content)?;
            }
        }
        zip.finish()?;
        Ok(path.to_path_buf())
    }
}

/// A temporary home holding `~/.claude.json` and a `work/` project root.
///
/// [`TestHome::config`] scopes the registry path and project root to it.
pub struct TestHome {
    pub temp: TempDir,
    pub home: PathBuf,
    pub work: PathBuf,
}

impl TestHome {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let home = temp.path().join("home");
        let work = temp.path().join("work");
        fs::create_dir_all(home.join(".claude").join("skills"))?;
        fs::create_dir_all(&work)?;
        fs::write(home.join(".claude.json"), "{}\n")?;
        Ok(Self {
            temp,
            home,
            work,
        })
    }

    /// `~/.claude.json`
    pub fn registry(&self) -> PathBuf {
        self.home.join(".claude.json")
    }

    pub fn config(&self) -> crate::config::ScopeConfig {
        crate::config::ScopeConfig::new(
            vec!["~/.claude/skills".to_string()],
            vec!["~/.claude.json".to_string()],
            vec![self.work.to_string_lossy().into_owned()],
        )
    }

    /// Write a file relative to the temp root, creating parents.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }
}
