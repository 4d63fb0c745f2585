use crate::common::{ForgeEnv, path_string};
use forge_cli::test_utils::PackageFixture;
use serde_json::Value;

#[test]
fn test_inspect_and_install() {
    let forge = ForgeEnv::new().unwrap();
    let package = PackageFixture::basic("weather")
        .write_to(&forge.env.temp.path().join("weather.dxt"))
        .unwrap();
    let package = path_string(&package);

    let stdout = forge.run_ok(&["package", "inspect", &package, "--json"]);
    let inspection: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(inspection["manifest"]["name"], "weather");
    assert_eq!(inspection["entry_count"], 2);

    let stdout = forge.run_ok(&["package", "install", &package, "--registry", &forge.registry_arg()]);
    assert!(stdout.contains("Installed 'weather'"));

    let install_dir = forge.env.home.join(".claude").join("extensions").join("weather");
    assert!(install_dir.join("run.sh").is_file());

    let server = &forge.registry_json()["mcpServers"]["weather"];
    let command = server["command"].as_str().unwrap();
    assert!(command.ends_with("weather/run.sh"), "unexpected command {command}");
    assert_eq!(server["args"][0], format!("--home={}", forge.env.home.display()));
}

#[test]
fn test_install_requires_declared_settings() {
    let forge = ForgeEnv::new().unwrap();
    let manifest = r#"{
        "name": "keyed",
        "server": {"mcp_config": {"command": "node", "env": {"KEY": "${user_config.api_key}"}}},
        "user_config": {"api_key": {"type": "string", "required": true, "sensitive": true}}
    }"#;
    let package = PackageFixture::new(manifest)
        .write_to(&forge.env.temp.path().join("keyed.mcpb"))
        .unwrap();
    let package = path_string(&package);

    let stderr = forge.run_err(&["package", "install", &package, "--registry", &forge.registry_arg()]);
    assert!(stderr.contains("api_key"));
    assert!(forge.registry_json().get("mcpServers").is_none());

    forge.run_ok(&[
        "package", "install", &package, "--registry", &forge.registry_arg(), "--set", "api_key=secret",
    ]);
    assert_eq!(forge.registry_json()["mcpServers"]["keyed"]["env"]["KEY"], "secret");
}

#[test]
fn test_rejected_packages_leave_no_trace() {
    let forge = ForgeEnv::new().unwrap();
    let traversal = PackageFixture::basic("evil")
        .with_file("../escape.txt", "x")
        .write_to(&forge.env.temp.path().join("evil.dxt"))
        .unwrap();
    let wrong_type = forge.env.write("tool.zip", "PK").unwrap();

    let stderr =
        forge.run_err(&["package", "install", &path_string(&traversal), "--registry", &forge.registry_arg()]);
    assert!(stderr.contains("Invalid archive"));
    assert!(!forge.env.home.join(".claude").join("extensions").exists());

    let stderr = forge.run_err(&["package", "inspect", &path_string(&wrong_type)]);
    assert!(stderr.contains("Invalid package file"));
}
