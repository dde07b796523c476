//! Export command.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use cmbs_core::export::{self, ExportOutcome};
use cmbs_core::CmbsConfig;

use crate::output;

#[derive(Args)]
pub struct ExportArgs {
    /// CUSIP of the security to export
    pub cusip: Option<String>,

    /// Export every security listed in account_holding
    #[arg(long, conflicts_with = "cusip")]
    pub all: bool,
}

pub fn execute(args: ExportArgs, config: &CmbsConfig) -> Result<()> {
    let db = super::open_source(config)?;
    let out_dir = config.output_dir();

    if args.all {
        return export_all(&db, config);
    }
    let Some(cusip) = args.cusip else {
        bail!("Provide a CUSIP or --all");
    };

    match export::export_security(&db, &cusip, &out_dir)? {
        ExportOutcome::Exported { deal_id, paths, nodes, statements, .. } => {
            println!(
                "{} {} {}",
                "✓".green(),
                cusip.cyan().bold(),
                format!("(deal {})", deal_id).dimmed()
            );
            println!("  Nodes:      {}", nodes.to_string().cyan());
            println!("  Statements: {}", statements.to_string().cyan());
            for path in paths.all() {
                println!("  {} {}", "→".dimmed(), path.display());
            }
        }
        ExportOutcome::NotApplicable { reason, .. } => {
            println!("{} {} {}", "–".yellow(), cusip.cyan(), format!("skipped: {}", reason).yellow());
        }
    }
    Ok(())
}

fn export_all(db: &cmbs_db::SourceDb, config: &CmbsConfig) -> Result<()> {
    let out_dir = config.output_dir();
    println!("{} {}", "Exporting all securities to".bold(), out_dir.display());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = export::export_all(db, &out_dir, |done, total, cusip| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
        pb.set_message(cusip.to_string());
    })?;
    pb.finish_and_clear();

    output::print_batch_report(&report);
    if report.has_failures() {
        bail!("{} export(s) failed", report.failed.len());
    }
    Ok(())
}
