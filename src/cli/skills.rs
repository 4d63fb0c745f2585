//! `forge skills`: list, print and overwrite skill files.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use super::common::{ForgeCommand, print_json};
use crate::service::Forge;
use crate::skills::SkillFile;
use crate::utils::read_text_file;

#[derive(Args)]
pub struct SkillsCommand {
    /// Defaults to `list`
    #[command(subcommand)]
    command: Option<SkillsSubcommands>,
}

#[derive(Subcommand)]
enum SkillsSubcommands {
    /// List every skill in scope
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print a skill file
    Show {
        /// Path to a SKILL.md file
        path: PathBuf,
    },

    /// Replace a skill file's content
    Save {
        /// Path to a SKILL.md file inside a skill root or project root
        path: PathBuf,

        /// File holding the new content
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },
}

impl ForgeCommand for SkillsCommand {
    async fn execute(self, forge: &Forge) -> Result<()> {
        match self.command.unwrap_or(SkillsSubcommands::List { json: false }) {
            SkillsSubcommands::List { json } => list(forge, json),
            SkillsSubcommands::Show { path } => {
                print!("{}", forge.read_skill(&path)?);
                Ok(())
            }
            SkillsSubcommands::Save { path, from } => {
                let content = read_text_file(&from)?;
                forge.save_skill(&path, &content)?;
                println!("{} Saved {}", "✅".green(), path.display());
                Ok(())
            }
        }
    }
}

fn list(forge: &Forge, json: bool) -> Result<()> {
    let skills = forge.scan_skills();
    if json {
        return print_json(&skills);
    }

    if skills.is_empty() {
        println!("No skills found.");
        println!("Add directories to skill_paths or project_roots in the file shown by 'forge config path'.");
        return Ok(());
    }

    println!("{} ({})", "Skills".bold(), skills.len());
    let mut current_label: Option<&str> = None;
    for skill in &skills {
        if current_label != Some(skill.label.as_str()) {
            println!("\n{}", skill.label.cyan().bold());
            current_label = Some(&skill.label);
        }
        print_skill(skill);
    }
    Ok(())
}

fn print_skill(skill: &SkillFile) {
    println!("  {:<28} {}", skill.slash_command.green(), skill.path.display().to_string().dimmed());
}
