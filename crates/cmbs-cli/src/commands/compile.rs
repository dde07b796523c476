//! Compile command: JSON-LD document to Cypher script.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cmbs_core::{cypher, jsonld};

#[derive(Args)]
pub struct CompileArgs {
    /// JSON-LD document to compile
    pub input: PathBuf,

    /// Output script (defaults to the input path with a .cypher extension)
    pub output: Option<PathBuf>,
}

pub fn execute(args: CompileArgs) -> Result<()> {
    let doc = jsonld::read_document(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    doc.check_closure()?;

    let statements = cypher::compile(&doc);
    let output = args.output.unwrap_or_else(|| args.input.with_extension("cypher"));
    cypher::write_script(&statements, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} {} statements written to {}",
        "✓".green(),
        statements.len().to_string().cyan(),
        output.display()
    );
    Ok(())
}
