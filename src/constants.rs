//! Global constants used throughout the forge codebase.
//!
//! Size ceilings, scan depths, timeouts and list caps live here so the limits
//! enforced by the access, archive and discovery layers are discoverable in
//! one place.

use std::time::Duration;

/// Smallest accepted package file (1 byte).
pub const MIN_PACKAGE_FILE_BYTES: u64 = 1;

/// Largest accepted package file on disk (50 MiB).
pub const MAX_PACKAGE_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Package file extensions accepted by the static file check (lowercase, no dot).
pub const PACKAGE_EXTENSIONS: &[&str] = &["dxt", "mcpb"];

/// Maximum number of entries in a package archive.
pub const MAX_ARCHIVE_ENTRIES: usize = 3000;

/// Maximum declared uncompressed size of a single archive entry (50 MiB).
pub const MAX_ARCHIVE_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum declared uncompressed size of all archive entries together (200 MiB).
pub const MAX_ARCHIVE_TOTAL_BYTES: u64 = 200 * 1024 * 1024;

/// Name of the manifest entry at the root of a package archive.
pub const PACKAGE_MANIFEST_ENTRY: &str = "manifest.json";

/// Maximum number of entries kept per scope configuration list.
pub const MAX_CONFIG_LIST_ENTRIES: usize = 200;

/// Maximum length of a server name.
pub const MAX_SERVER_NAME_LENGTH: usize = 80;

/// Server names that would collide with object-prototype identifiers.
pub const RESERVED_SERVER_NAMES: &[&str] = &["__proto__", "prototype", "constructor"];

/// Depth bound for skill discovery under a regular skill root.
pub const SKILL_SCAN_DEPTH: usize = 3;

/// Depth bound for skill discovery under a plugin marketplace root.
pub const MARKETPLACE_SKILL_SCAN_DEPTH: usize = 6;

/// Depth bound for `.mcp.json` discovery under a project root.
pub const REGISTRY_SCAN_DEPTH: usize = 2;

/// Directory names never descended into during discovery.
pub const SCAN_SKIP_DIRS: &[&str] = &["node_modules", ".git", "out", "dist"];

/// Timeout for a single reachability probe (3 seconds).
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Maximum number of retained activity log entries.
pub const MAX_ACTIVITY_ENTRIES: usize = 200;

/// Maximum length of a generated server description.
pub const MAX_DESCRIPTION_CHARS: usize = 100;
