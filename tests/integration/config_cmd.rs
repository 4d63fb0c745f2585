use crate::common::{ForgeEnv, path_string};
use forge_cli::config::ScopeConfig;

#[test]
fn test_path_honors_env_and_flag() {
    let forge = ForgeEnv::new().unwrap();
    let stdout = forge.run_ok(&["config", "path"]);
    assert_eq!(stdout.trim(), path_string(&forge.config_path));

    let other = forge.env.temp.path().join("other.toml");
    let stdout = forge.run_ok(&["--config", &path_string(&other), "config", "path"]);
    assert_eq!(stdout.trim(), path_string(&other));
}

#[test]
fn test_init_and_show() {
    let forge = ForgeEnv::new().unwrap();
    let fresh = forge.env.temp.path().join("fresh").join("config.toml");
    let fresh_arg = path_string(&fresh);

    forge.run_ok(&["--config", &fresh_arg, "config", "init"]);
    assert_eq!(ScopeConfig::load_from(&fresh).unwrap(), ScopeConfig::default());

    let stderr = forge.run_err(&["--config", &fresh_arg, "config", "init"]);
    assert!(stderr.contains("--force"));
    forge.run_ok(&["--config", &fresh_arg, "config", "init", "--force"]);

    let stdout = forge.run_ok(&["config", "show"]);
    assert!(stdout.contains("project_roots"));
    assert!(stdout.contains(&path_string(&forge.env.work)));
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let forge = ForgeEnv::new().unwrap();
    std::fs::write(&forge.config_path, "skill_paths = [").unwrap();

    let stdout = forge.run_ok(&["config", "show"]);
    assert!(stdout.contains("~/.claude.json"));
}
