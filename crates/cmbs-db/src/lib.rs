//! # CMBS DB
//!
//! Read-only access layer over an Intex-style CMBS SQLite snapshot.
//!
//! Every lookup returns a [`Fetch`] so callers branch on a closed set of
//! outcomes (found, not found, schema mismatch) instead of inspecting error
//! text. Connectivity and malformed-query faults surface as [`DbError`].

pub mod pool;
pub mod queries;
pub mod table;

pub use pool::{DbError, DbResult, Fetch, SchemaDrift, SourceDb};
pub use table::{SqlValue, Table};
