//! Inspect command: node listing of an exported document.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cmbs_core::export::{describe_document, ArtifactPaths};
use cmbs_core::{jsonld, CmbsConfig};

#[derive(Args)]
pub struct InspectArgs {
    /// CUSIP whose exported JSON-LD document to read
    pub cusip: String,
}

pub fn execute(args: InspectArgs, config: &CmbsConfig) -> Result<()> {
    let paths = ArtifactPaths::for_security(&config.output_dir(), &args.cusip);
    let doc = jsonld::read_document(&paths.jsonld)
        .with_context(|| format!("Could not read {} (run 'cmbs export {}' first)", paths.jsonld.display(), args.cusip))?;

    println!("{} {}", "--- Node Information for CUSIP:".bold(), args.cusip.cyan().bold());
    if doc.is_empty() {
        println!("{}", "No graph data found in the JSON-LD file.".dimmed());
        return Ok(());
    }
    print!("{}", describe_document(&doc));
    Ok(())
}
