//! End-to-end tests for the `forge` binary and the install pipeline.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! CLI tests run the real binary with `HOME` pointed at a temporary
//! directory and `FORGE_CONFIG_PATH` pointed at a generated configuration, so
//! nothing outside the temp directory is read or written. `dirs` only honors
//! `HOME` on Unix, so those modules are Unix-only.

mod common;

#[cfg(unix)]
mod config_cmd;
#[cfg(unix)]
mod mcp_cmd;
#[cfg(unix)]
mod package_cmd;
#[cfg(unix)]
mod skills_cmd;

mod concurrent_install;
