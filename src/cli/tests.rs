//! Argument parsing tests for the forge CLI.

use super::*;
use clap::CommandFactory;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("forge").chain(args.iter().copied()))
}

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_global_flags() {
    let cli = parse(&["--verbose", "mcp", "list"]).unwrap();
    assert!(cli.verbose);

    let cli = parse(&["skills", "list", "--quiet"]).unwrap();
    assert!(cli.quiet);

    let cli = parse(&["--config", "/tmp/forge.toml", "config", "path"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/forge.toml")));

    assert!(parse(&["--verbose", "--quiet", "mcp"]).is_err());
}

#[test]
fn test_log_directive() {
    assert_eq!(log_directive(true, false, Some("trace".to_string())), "debug");
    assert_eq!(log_directive(false, true, None), "error");
    assert_eq!(log_directive(false, false, Some("forge_cli=trace".to_string())), "forge_cli=trace");
    assert_eq!(log_directive(false, false, Some("  ".to_string())), "warn");
    assert_eq!(log_directive(false, false, None), "warn");
}

#[test]
fn test_all_commands_parse() {
    let commands: &[&[&str]] = &[
        &["skills"],
        &["skills", "list", "--json"],
        &["skills", "show", "/s/SKILL.md"],
        &["skills", "save", "/s/SKILL.md", "--from", "new.md"],
        &["mcp"],
        &["mcp", "list", "--json"],
        &["mcp", "show", "/c.json"],
        &["mcp", "save", "/c.json", "--from", "new.json"],
        &["mcp", "toggle", "/c.json", "fs", "--disable"],
        &["mcp", "toggle", "/c.json", "fs", "--enable", "--project", "/work/app"],
        &["mcp", "add", "/c.json", "fs", "--command", "npx", "--arg", "-y", "--arg", "pkg"],
        &["mcp", "add", "/c.json", "remote", "--url", "https://x/mcp", "--env", "TOKEN=a=b"],
        &["mcp", "remove", "/c.json", "fs"],
        &["mcp", "import", "/c.json", "servers.json"],
        &["mcp", "allow-tools", "/c.json", "fs", "read", "write"],
        &["mcp", "allow-tools", "/c.json", "fs"],
        &["mcp", "health", "--json"],
        &["package", "inspect", "tool.dxt"],
        &["package", "install", "tool.mcpb", "--registry", "/c.json", "--set", "api_key=k"],
        &["config"],
        &["config", "show"],
        &["config", "path"],
        &["config", "init", "--force"],
    ];

    for args in commands {
        assert!(parse(args).is_ok(), "failed to parse {args:?}");
    }
}

#[test]
fn test_invalid_argument_combinations() {
    let invalid: &[&[&str]] = &[
        &["mcp", "toggle", "/c.json", "fs"],
        &["mcp", "toggle", "/c.json", "fs", "--enable", "--disable"],
        &["mcp", "add", "/c.json", "fs"],
        &["mcp", "add", "/c.json", "fs", "--command", "a", "--url", "http://x"],
        &["mcp", "add", "/c.json", "fs", "--url", "http://x", "--arg", "a"],
        &["mcp", "add", "/c.json", "fs", "--command", "a", "--env", "NOEQUALS"],
        &["package", "install", "tool.dxt"],
        &["package"],
    ];

    for args in invalid {
        assert!(parse(args).is_err(), "unexpectedly parsed {args:?}");
    }
}
