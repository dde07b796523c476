//! Read-only queries against the source snapshot.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use cmbs_core::CmbsConfig;
use cmbs_db::queries::{deals, holdings, raw};
use cmbs_db::{Fetch, Table};

use crate::output;

#[derive(Subcommand)]
pub enum SourceCommands {
    /// List held CUSIPs
    Cusips,

    /// Show account holdings
    Holdings {
        /// Only this CUSIP
        #[arg(long)]
        cusip: Option<String>,
    },

    /// Show deals
    Deals,

    /// Show collateral
    Collateral {
        /// Only this deal
        #[arg(long)]
        deal_id: Option<String>,
    },

    /// Run a custom SQL query
    Sql {
        /// SQL query string
        query: String,
    },
}

pub fn execute(cmd: SourceCommands, config: &CmbsConfig) -> Result<()> {
    let db = super::open_source(config)?;

    match cmd {
        SourceCommands::Cusips => {
            let cusips = holdings::list_all_security_identifiers(&db)?;
            if let Some(drift) = cusips.drift() {
                println!("{}", drift.to_string().yellow());
            }
            let cusips = cusips.into_rows();
            for cusip in &cusips {
                println!("{}", cusip);
            }
            println!();
            println!("{} CUSIP(s) total", cusips.len());
        }
        SourceCommands::Holdings { cusip } => {
            print_fetch(holdings::list_account_holdings(&db, cusip.as_deref())?);
        }
        SourceCommands::Deals => print_fetch(deals::list_deals(&db)?),
        SourceCommands::Collateral { deal_id } => {
            print_fetch(deals::list_collateral(&db, deal_id.as_deref())?);
        }
        SourceCommands::Sql { query } => {
            let table = raw::select_rows(&db, &query, &[])?;
            output::print_table(&table);
        }
    }
    Ok(())
}

fn print_fetch(fetch: Fetch<Table>) {
    match fetch {
        Fetch::Found(table) => output::print_table(&table),
        Fetch::NotFound => println!("{}", "No rows found.".dimmed()),
        Fetch::SchemaMismatch(drift) => println!("{}", drift.to_string().yellow()),
    }
}
