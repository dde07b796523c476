//! # CMBS Graph
//!
//! Neo4j integration for the CMBS pipeline: loading compiled Cypher scripts,
//! schema setup, named-database administration and the read queries used to
//! explore a loaded graph.

pub mod admin;
pub mod client;
pub mod load;
pub mod queries;
pub mod schema;

pub use client::{GraphClient, GraphCounts};
pub use load::{load_in_transaction, load_script, load_script_file, load_statements, LoadReport, StatementRunner};
