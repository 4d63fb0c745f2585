//! Reachability probing for registered servers.
//!
//! HTTP servers are probed with a `HEAD` request; any response counts as
//! reachable. Command servers are reachable when their binary resolves: an
//! explicit path must exist, a bare name must be found on `PATH`. Every probe
//! runs concurrently under its own timeout, and a probe that times out is
//! reported as failed without holding up the others.

use crate::constants::HEALTH_PROBE_TIMEOUT;
use crate::registry::scan::ServerListing;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Result of probing one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Connected,
    Failed,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(command: &str) -> &str {
    let trimmed = command.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

/// Resolve a command's binary.
#[must_use]
pub fn probe_command(command: &str) -> HealthStatus {
    let binary = unquote(command);
    if binary.is_empty() {
        return HealthStatus::Unknown;
    }

    if binary.contains('/') || binary.contains('\\') {
        return if Path::new(binary).exists() {
            HealthStatus::Connected
        } else {
            HealthStatus::Failed
        };
    }

    match which::which(binary) {
        Ok(_) => HealthStatus::Connected,
        Err(e) => {
            tracing::debug!("Command {} not found on PATH: {}", binary, e);
            HealthStatus::Failed
        }
    }
}

async fn probe_http(client: &reqwest::Client, url: &str) -> HealthStatus {
    match client.head(url).send().await {
        Ok(_) => HealthStatus::Connected,
        Err(e) => {
            tracing::debug!("HEAD {} failed: {}", url, e);
            HealthStatus::Failed
        }
    }
}

async fn probe(client: &reqwest::Client, server: &ServerListing) -> HealthStatus {
    match server.url.as_deref() {
        Some(url) if server.is_http() => probe_http(client, url).await,
        _ if !server.command.trim().is_empty() => {
            let command = server.command.clone();
            tokio::task::spawn_blocking(move || probe_command(&command))
                .await
                .unwrap_or(HealthStatus::Failed)
        }
        _ => HealthStatus::Unknown,
    }
}

/// Probe every server with the default per-probe timeout.
pub async fn check_health(servers: &[ServerListing]) -> BTreeMap<String, HealthStatus> {
    check_health_with_timeout(servers, HEALTH_PROBE_TIMEOUT).await
}

/// Probe every server concurrently, each bounded by `timeout`.
///
/// Results are keyed by server id.
pub async fn check_health_with_timeout(
    servers: &[ServerListing],
    timeout: Duration,
) -> BTreeMap<String, HealthStatus> {
    let client = reqwest::Client::new();
    let client = &client;

    let probes = servers.iter().map(|server| async move {
        let status = tokio::time::timeout(timeout, probe(client, server))
            .await
            .unwrap_or_else(|_| {
                tracing::debug!("Health probe for {} timed out", server.name);
                HealthStatus::Failed
            });
        (server.id.clone(), status)
    });

    let results: BTreeMap<String, HealthStatus> = join_all(probes).await.into_iter().collect();
    tracing::debug!("Probed {} servers", results.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::scan::{ListingContext, RegistrySource, list_server_map};
    use serde_json::json;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn listings(servers: serde_json::Value) -> Vec<ServerListing> {
        let context = ListingContext {
            config_path: Path::new("/c.json"),
            source: RegistrySource::User,
            label: "User",
            project: None,
        };
        list_server_map(servers.as_object().unwrap(), context, false)
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("  \"/usr/bin/node\" "), "/usr/bin/node");
        assert_eq!(unquote("'node'"), "node");
        assert_eq!(unquote("\"node"), "\"node");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_probe_command() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        assert_eq!(probe_command(""), HealthStatus::Unknown);
        assert_eq!(probe_command("''"), HealthStatus::Unknown);
        assert_eq!(probe_command(&format!("\"{}\"", script.display())), HealthStatus::Connected);
        assert_eq!(
            probe_command(&temp.path().join("missing.sh").to_string_lossy()),
            HealthStatus::Failed
        );
        assert_eq!(probe_command("forge-test-binary-that-does-not-exist"), HealthStatus::Failed);
        #[cfg(unix)]
        assert_eq!(probe_command("sh"), HealthStatus::Connected);
    }

    #[tokio::test]
    async fn test_check_health_collects_by_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });

        // Bind then drop to get a port with nothing listening
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

        let servers = listings(json!({
            "up": {"type": "http", "url": format!("http://{addr}/mcp")},
            "down": {"type": "http", "url": format!("http://{closed}/mcp")},
            "missing": {"command": "forge-test-binary-that-does-not-exist"},
            "empty": {}
        }));

        let results = check_health(&servers).await;
        let by_name: BTreeMap<&str, HealthStatus> = servers
            .iter()
            .map(|s| (s.name.as_str(), results[&s.id]))
            .collect();

        assert_eq!(results.len(), 4);
        assert_eq!(by_name["up"], HealthStatus::Connected);
        assert_eq!(by_name["down"], HealthStatus::Failed);
        assert_eq!(by_name["missing"], HealthStatus::Failed);
        assert_eq!(by_name["empty"], HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_slow_probe_times_out_as_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let servers = listings(json!({
            "slow": {"type": "http", "url": format!("http://{addr}/")},
            "unknown": {"type": "http"}
        }));

        let started = Instant::now();
        let results = check_health_with_timeout(&servers, Duration::from_millis(200)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(results[&servers[0].id], HealthStatus::Failed);
        assert_eq!(results[&servers[1].id], HealthStatus::Unknown);
    }
}
