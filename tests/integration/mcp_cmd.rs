use crate::common::{ForgeEnv, path_string};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;

#[test]
fn test_add_toggle_remove() {
    let forge = ForgeEnv::new().unwrap();
    let registry = forge.registry_arg();

    let stdout = forge.run_ok(&[
        "mcp", "add", &registry, "fs", "--command", "npx", "--arg", "-y", "--arg", "server-fs", "--env",
        "ROOT=/data",
    ]);
    assert!(stdout.contains("Added 'fs'"));
    assert_eq!(
        forge.registry_json()["mcpServers"]["fs"],
        json!({"command": "npx", "args": ["-y", "server-fs"], "env": {"ROOT": "/data"}})
    );

    forge.run_ok(&["mcp", "toggle", &registry, "fs", "--disable"]);
    let doc = forge.registry_json();
    assert!(doc["mcpServers"].get("fs").is_none());
    assert_eq!(doc["_disabled_mcpServers"]["fs"]["command"], "npx");

    let stdout = forge.run_ok(&["mcp", "toggle", &registry, "fs", "--disable"]);
    assert!(stdout.contains("No active server named 'fs'"));

    forge.run_ok(&["mcp", "toggle", &registry, "fs", "--enable"]);
    assert_eq!(forge.registry_json()["mcpServers"]["fs"]["command"], "npx");
    assert!(forge.registry_json().get("_disabled_mcpServers").is_none());

    forge.run_ok(&["mcp", "remove", &registry, "fs"]);
    assert_eq!(forge.registry_json()["mcpServers"], json!({}));

    let stderr = forge.run_err(&["mcp", "remove", &registry, "fs"]);
    assert!(stderr.contains("Server 'fs' not found"));
}

#[test]
fn test_add_http_server_in_project_scope() {
    let forge = ForgeEnv::new().unwrap();
    let registry = forge.registry_arg();

    forge.run_ok(&[
        "mcp", "add", &registry, "remote", "--url", "https://example.com/mcp", "--project", "/work/app",
    ]);
    assert_eq!(
        forge.registry_json()["projects"]["/work/app"]["mcpServers"]["remote"],
        json!({"type": "http", "url": "https://example.com/mcp"})
    );
}

#[test]
fn test_import_and_allow_tools() {
    let forge = ForgeEnv::new().unwrap();
    let registry = forge.registry_arg();
    let snippet = forge
        .env
        .write("servers.json", r#"{"mcpServers": {"a": {"command": "a"}, "b": {"command": "b"}}}"#)
        .unwrap();

    let stdout = forge.run_ok(&["mcp", "import", &registry, &path_string(&snippet)]);
    assert!(stdout.contains("Imported 2 server(s): a, b"));

    forge.run_ok(&["mcp", "allow-tools", &registry, "a", "read", "write", "read"]);
    assert_eq!(forge.registry_json()["mcpServers"]["a"]["allowedTools"], json!(["read", "write"]));

    forge.run_ok(&["mcp", "allow-tools", &registry, "a"]);
    assert!(forge.registry_json()["mcpServers"]["a"].get("allowedTools").is_none());

    let stderr = forge.run_err(&["mcp", "allow-tools", &registry, "missing", "read"]);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_list_json_includes_project_registries() {
    let forge = ForgeEnv::new().unwrap();
    fs::write(forge.registry(), r#"{"mcpServers": {"fs": {"command": "node", "args": ["fs.js"]}}}"#).unwrap();
    forge.env.write("work/app/.mcp.json", r#"{"mcpServers": {"db": {"type": "http", "url": "http://x"}}}"#).unwrap();

    let stdout = forge.run_ok(&["mcp", "list", "--json"]);
    let files: Value = serde_json::from_str(&stdout).unwrap();
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["label"], "User");
    assert_eq!(files[0]["servers"][0]["name"], "fs");
    assert_eq!(files[1]["label"], "Project: app");
    assert_eq!(files[1]["servers"][0]["type"], "http");

    forge
        .forge()
        .args(["mcp", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fs").and(predicate::str::contains("Project: app")));
}

#[test]
fn test_registry_outside_scope_is_denied() {
    let forge = ForgeEnv::new().unwrap();
    let outside = forge.env.write("elsewhere/.claude.json", "{}").unwrap();
    let outside = path_string(&outside);

    let stderr = forge.run_err(&["mcp", "add", &outside, "fs", "--command", "node"]);
    assert!(stderr.contains("Access denied"));
    assert_eq!(fs::read_to_string(&outside).unwrap(), "{}");

    forge.forge().args(["mcp", "show", &outside]).assert().failure();
}

#[test]
fn test_malformed_registry_is_left_untouched() {
    let forge = ForgeEnv::new().unwrap();
    fs::write(forge.registry(), "{ not json").unwrap();

    let stderr = forge.run_err(&["mcp", "add", &forge.registry_arg(), "fs", "--command", "node"]);
    assert!(stderr.contains("Failed to parse MCP config"));
    assert_eq!(fs::read_to_string(forge.registry()).unwrap(), "{ not json");
}

#[test]
fn test_show_and_save() {
    let forge = ForgeEnv::new().unwrap();
    let registry = forge.registry_arg();
    let replacement = forge.env.write("new.json", "{\"mcpServers\": {}}").unwrap();
    let invalid = forge.env.write("bad.json", "[]").unwrap();

    forge.run_ok(&["mcp", "save", &registry, "--from", &path_string(&replacement)]);
    assert_eq!(forge.run_ok(&["mcp", "show", &registry]), "{\"mcpServers\": {}}");

    forge.run_err(&["mcp", "save", &registry, "--from", &path_string(&invalid)]);
    assert_eq!(forge.run_ok(&["mcp", "show", &registry]), "{\"mcpServers\": {}}");
}

#[test]
fn test_health_json() {
    let forge = ForgeEnv::new().unwrap();
    fs::write(
        forge.registry(),
        r#"{"mcpServers": {"shell": {"command": "sh"}, "gone": {"command": "forge-missing-binary"}}}"#,
    )
    .unwrap();

    let stdout = forge.run_ok(&["mcp", "health", "--json"]);
    let rows: Value = serde_json::from_str(&stdout).unwrap();
    let status = |name: &str| {
        rows.as_array()
            .unwrap()
            .iter()
            .find(|row| row["name"] == name)
            .map(|row| row["status"].clone())
            .unwrap()
    };
    assert_eq!(status("shell"), "connected");
    assert_eq!(status("gone"), "failed");
}
