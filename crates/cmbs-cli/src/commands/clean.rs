//! Clean command - remove generated artifacts.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use cmbs_core::export::{clean_artifacts, find_artifacts};
use cmbs_core::CmbsConfig;

#[derive(Args)]
pub struct CleanArgs {
    /// Confirm deletion
    #[arg(long)]
    pub confirm: bool,
}

pub fn execute(args: CleanArgs, config: &CmbsConfig) -> Result<()> {
    let dir = config.output_dir();

    if !args.confirm {
        let artifacts = find_artifacts(&dir)?;
        if artifacts.is_empty() {
            println!("{}", "No generated artifacts found.".dimmed());
            return Ok(());
        }
        println!("{}", "This will permanently delete:".red().bold());
        for path in &artifacts {
            println!("  {} {}", "•".red(), path.display());
        }
        println!();
        println!("Run with {} to confirm.", "--confirm".bold());
        return Ok(());
    }

    let removed = clean_artifacts(&dir)?;
    for path in &removed {
        println!("  {} Removed {}", "✓".green(), path.display());
    }
    println!();
    println!("{} artifact(s) removed", removed.len().to_string().green().bold());
    Ok(())
}
