//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cmbs_core::CmbsConfig;
use cmbs_db::SourceDb;

pub mod clean;
pub mod compile;
pub mod export;
pub mod graph;
pub mod inspect;
pub mod source;

/// CMBS snapshot to knowledge graph exporter
#[derive(Parser)]
#[command(name = "cmbs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./cmbs.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite snapshot to read
    #[arg(long, global = true, env = "CMBS_SOURCE_DB")]
    pub db: Option<PathBuf>,

    /// Directory for generated artifacts
    #[arg(short, long, global = true, env = "CMBS_OUTPUT_DIR")]
    pub out: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export one security, or all held securities, to graph artifacts
    Export(export::ExportArgs),

    /// Print node information from an exported JSON-LD document
    Inspect(inspect::InspectArgs),

    /// Compile a JSON-LD document into a Cypher script
    Compile(compile::CompileArgs),

    /// Read-only queries against the source snapshot
    #[command(subcommand)]
    Source(source::SourceCommands),

    /// Neo4j graph store commands
    #[command(subcommand)]
    Graph(graph::GraphCommands),

    /// Remove generated artifacts
    Clean(clean::CleanArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.resolve_config()?;

        match self.command {
            Commands::Export(args) => export::execute(args, &config),
            Commands::Inspect(args) => inspect::execute(args, &config),
            Commands::Compile(args) => compile::execute(args),
            Commands::Source(cmd) => source::execute(cmd, &config),
            Commands::Graph(cmd) => graph::execute(cmd, &config).await,
            Commands::Clean(args) => clean::execute(args, &config),
        }
    }

    /// Config file and environment, then command-line flags on top.
    fn resolve_config(&self) -> Result<CmbsConfig> {
        let mut config = CmbsConfig::load_or_default(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config.source.db = Some(db.clone());
        }
        if let Some(out) = &self.out {
            config.output.dir = Some(out.clone());
        }
        Ok(config)
    }
}

/// Open the configured snapshot.
pub(crate) fn open_source(config: &CmbsConfig) -> Result<SourceDb> {
    let path = config.source_db()?;
    Ok(SourceDb::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_graph_load() {
        let cli = Cli::try_parse_from(["cmbs", "graph", "load", "out.cypher", "--transactional"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Graph(graph::GraphCommands::Load { transactional: true, .. })
        ));
    }

    #[test]
    fn test_export_requires_one_target() {
        assert!(Cli::try_parse_from(["cmbs", "export", "05591XAE1", "--all"]).is_err());
        let cli = Cli::try_parse_from(["cmbs", "--db", "snap.db", "export", "--all"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.source.db.as_deref(), Some(std::path::Path::new("snap.db")));
    }
}
