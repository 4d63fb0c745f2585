//! Shared helpers for the integration suite.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use forge_cli::config::ScopeConfig;
use forge_cli::test_utils::TestHome;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// A temporary home plus a forge configuration scoped to it.
pub struct ForgeEnv {
    pub env: TestHome,
    pub config_path: PathBuf,
}

impl ForgeEnv {
    pub fn new() -> Result<Self> {
        let env = TestHome::new()?;
        let config_path = env.temp.path().join("forge").join("config.toml");
        let config = ScopeConfig::new(
            vec![path_string(&env.home.join(".claude").join("skills"))],
            vec![path_string(&env.registry())],
            vec![path_string(&env.work)],
        );
        config.save_to(&config_path)?;
        Ok(Self {
            env,
            config_path,
        })
    }

    /// The binary with an isolated environment.
    pub fn forge(&self) -> Command {
        let mut cmd = Command::cargo_bin("forge").expect("forge binary is built");
        cmd.env("HOME", &self.env.home)
            .env("FORGE_CONFIG_PATH", &self.config_path)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .current_dir(self.env.temp.path());
        cmd
    }

    /// Run the binary, assert success, return stdout.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.forge().args(args).output().expect("forge runs");
        assert!(
            output.status.success(),
            "forge {args:?} failed with {:?}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Run the binary, assert failure, return stderr.
    pub fn run_err(&self, args: &[&str]) -> String {
        let output = self.forge().args(args).output().expect("forge runs");
        assert!(
            !output.status.success(),
            "forge {args:?} unexpectedly succeeded\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    pub fn registry(&self) -> PathBuf {
        self.env.registry()
    }

    pub fn registry_arg(&self) -> String {
        path_string(&self.registry())
    }

    pub fn registry_json(&self) -> Value {
        read_json(&self.registry())
    }
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("file is readable");
    serde_json::from_str(&text).expect("file is JSON")
}
