use crate::common::{ForgeEnv, path_string};
use serde_json::Value;
use std::fs;

#[test]
fn test_list_show_save() {
    let forge = ForgeEnv::new().unwrap();
    let skill = forge.env.write("home/.claude/skills/review/SKILL.md", "---\nname: review\n---\n").unwrap();
    forge.env.write("work/app/.claude/skills/deploy/SKILL.md", "# deploy\n").unwrap();

    let stdout = forge.run_ok(&["skills", "list", "--json"]);
    let skills: Value = serde_json::from_str(&stdout).unwrap();
    let commands: Vec<&str> =
        skills.as_array().unwrap().iter().map(|s| s["slash_command"].as_str().unwrap()).collect();
    assert_eq!(commands, ["/review", "/deploy"]);
    assert_eq!(skills[1]["label"], "Project: app");
    assert_eq!(skills[1]["source"], "project");

    let skill_arg = path_string(&skill);
    assert_eq!(forge.run_ok(&["skills", "show", &skill_arg]), "---\nname: review\n---\n");

    let update = forge.env.write("update.md", "updated\n").unwrap();
    forge.run_ok(&["skills", "save", &skill_arg, "--from", &path_string(&update)]);
    assert_eq!(fs::read_to_string(&skill).unwrap(), "updated\n");
}

#[test]
fn test_skill_outside_scope_is_denied() {
    let forge = ForgeEnv::new().unwrap();
    let outside = forge.env.write("elsewhere/SKILL.md", "secret").unwrap();
    let update = forge.env.write("update.md", "x").unwrap();

    let stderr = forge.run_err(&["skills", "show", &path_string(&outside)]);
    assert!(stderr.contains("Access denied"));

    forge.run_err(&["skills", "save", &path_string(&outside), "--from", &path_string(&update)]);
    assert_eq!(fs::read_to_string(&outside).unwrap(), "secret");
}

#[test]
fn test_empty_listing() {
    let forge = ForgeEnv::new().unwrap();
    let stdout = forge.run_ok(&["skills"]);
    assert!(stdout.contains("No skills found"));
}
