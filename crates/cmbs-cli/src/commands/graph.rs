//! Neo4j graph store CLI commands.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use cmbs_core::{CmbsConfig, LoadMode};
use cmbs_graph::{admin, queries, schema, GraphClient};

use crate::output;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Load a compiled Cypher script
    Load {
        /// Script file (.cypher)
        file: PathBuf,
        /// Apply the whole script in one transaction
        #[arg(long)]
        transactional: bool,
    },

    /// Show graph status
    Status,

    /// Create uniqueness constraints and indexes
    Schema,

    /// Execute a Cypher query
    Query {
        /// Cypher query string
        query: String,
    },

    /// Named database administration
    #[command(subcommand)]
    Db(DbCommands),

    /// Delete every node and relationship in the configured database
    Clean {
        /// Confirm deletion
        #[arg(long)]
        confirm: bool,
    },

    /// Display (Bloomberg) name of a deal
    DisplayName {
        deal_id: String,
    },

    /// Deals with a property at an address, e.g. "100 Main St, TX"
    DealsByAddress {
        address: String,
    },

    /// Properties of a deal
    Properties {
        deal_id: String,
    },

    /// List loaded deals
    Deals,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// List databases
    List,
    /// Create a database if it does not exist
    Create { name: String },
    /// Drop a database
    Drop {
        name: String,
        /// Confirm deletion
        #[arg(long)]
        confirm: bool,
    },
}

pub async fn execute(cmd: GraphCommands, config: &CmbsConfig) -> Result<()> {
    let graph_config = &config.graph;

    match cmd {
        GraphCommands::Db(db_cmd) => cmd_db(db_cmd, config).await?,
        GraphCommands::Clean { confirm: false } => {
            println!(
                "{} {}",
                "This will delete every node and relationship in database".red().bold(),
                graph_config.database.yellow()
            );
            println!("Run with {} to confirm.", "--confirm".bold());
        }
        GraphCommands::Clean { confirm: true } => {
            let client = GraphClient::connect(graph_config).await?;
            let before = admin::clean_database(&client).await?;
            println!(
                "{} Removed {} nodes and {} relationships",
                "✓".green(),
                before.nodes,
                before.relationships
            );
        }
        GraphCommands::Load { file, transactional } => {
            let client = GraphClient::connect(graph_config).await?;
            let mode = if transactional { LoadMode::Transactional } else { graph_config.load_mode };
            println!("{} {} ({:?})", "Loading".bold(), file.display(), mode);
            let report = cmbs_graph::load_script_file(&client, &file, mode).await?;
            output::print_load_report(&report);
            if !report.is_complete() {
                bail!("Script was not fully applied");
            }
        }
        GraphCommands::Status => {
            let client = GraphClient::connect(graph_config).await?;
            println!("{}", "Knowledge Graph Status".bold());
            println!("{}", "─".repeat(40));
            let counts = client.get_counts().await?;
            println!("  Database:      {}", client.database().cyan());
            println!("  Nodes:         {}", counts.nodes.to_string().cyan());
            println!("  Relationships: {}", counts.relationships.to_string().cyan());
            println!("  Deals:         {}", counts.deals.to_string().cyan());
            println!("{}", "─".repeat(40));
        }
        GraphCommands::Schema => {
            let client = GraphClient::connect(graph_config).await?;
            let n = schema::initialize_schema(&client).await?;
            println!("{} {} schema statements applied", "✓".green(), n);
        }
        GraphCommands::Query { query } => {
            let client = GraphClient::connect(graph_config).await?;
            let rows = queries::raw_query(&client, &query).await?;
            if rows.is_empty() {
                println!("{}", "No results.".dimmed());
            }
            for (i, row) in rows.iter().enumerate() {
                println!("{}: {}", (i + 1).to_string().dimmed(), row);
            }
        }
        GraphCommands::DisplayName { deal_id } => {
            let client = GraphClient::connect(graph_config).await?;
            match queries::display_name_by_deal_id(&client, &deal_id).await? {
                Some(name) => println!("{}", name),
                None => println!("{}", format!("No display name found for deal {}", deal_id).dimmed()),
            }
        }
        GraphCommands::DealsByAddress { address } => {
            let client = GraphClient::connect(graph_config).await?;
            let ids = queries::deal_ids_by_address(&client, &address).await?;
            if ids.is_empty() {
                println!("{}", format!("No deals found for address '{}'.", address).dimmed());
            }
            for id in ids {
                println!("{}", id);
            }
        }
        GraphCommands::Properties { deal_id } => {
            let client = GraphClient::connect(graph_config).await?;
            let properties = queries::properties_by_deal_id(&client, &deal_id).await?;
            output::print_properties(&properties);
        }
        GraphCommands::Deals => {
            let client = GraphClient::connect(graph_config).await?;
            let deals = queries::list_deals(&client).await?;
            output::print_deals(&deals);
        }
    }

    Ok(())
}

async fn cmd_db(cmd: DbCommands, config: &CmbsConfig) -> Result<()> {
    match cmd {
        DbCommands::List => {
            for name in admin::list_databases(&config.graph).await? {
                let marker = if name == config.graph.database { "*".green() } else { " ".normal() };
                println!("{} {}", marker, name);
            }
        }
        DbCommands::Create { name } => {
            if admin::create_database(&config.graph, &name).await? {
                println!("{} Database '{}' created", "✓".green(), name);
            } else {
                println!("{}", format!("Database '{}' already exists. Skipping creation.", name).dimmed());
            }
        }
        DbCommands::Drop { name, confirm } => {
            if !confirm {
                println!("{} {}", "This will drop database".red().bold(), name.yellow());
                println!("Run with {} to confirm.", "--confirm".bold());
                return Ok(());
            }
            admin::drop_database(&config.graph, &name).await?;
            println!("{} Database '{}' dropped (if it existed)", "✓".green(), name);
        }
    }
    Ok(())
}
