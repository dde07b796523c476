//! Source database handle and lookup outcomes.
//!
//! The snapshot is opened read-only, one connection per query. A connection
//! never outlives the closure passed to [`SourceDb::with_conn`], so a failing
//! query cannot leak it.

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::warn;

/// Fatal data-access faults.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database file not found at: {}", .0.display())]
    NotFound(PathBuf),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for source database operations.
pub type DbResult<T> = Result<T, DbError>;

/// A table or column the current snapshot does not have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDrift {
    MissingTable { table: String },
    MissingColumn { table: String, column: String },
}

impl SchemaDrift {
    pub fn table(&self) -> &str {
        match self {
            SchemaDrift::MissingTable { table } | SchemaDrift::MissingColumn { table, .. } => table,
        }
    }

    pub fn is_missing_table(&self) -> bool {
        matches!(self, SchemaDrift::MissingTable { .. })
    }
}

impl fmt::Display for SchemaDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDrift::MissingTable { table } => write!(f, "The '{}' table was not found.", table),
            SchemaDrift::MissingColumn { table, column } => {
                write!(f, "The '{}' column was not found in the {} table.", column, table)
            }
        }
    }
}

/// Outcome of a lookup that reached the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    Found(T),
    NotFound,
    SchemaMismatch(SchemaDrift),
}

impl<T> Fetch<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Fetch::Found(v),
            None => Fetch::NotFound,
        }
    }

    /// The found value, discarding the reason for its absence.
    pub fn found(self) -> Option<T> {
        match self {
            Fetch::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetch::Found(_))
    }

    pub fn drift(&self) -> Option<&SchemaDrift> {
        match self {
            Fetch::SchemaMismatch(d) => Some(d),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        match self {
            Fetch::Found(v) => Fetch::Found(f(v)),
            Fetch::NotFound => Fetch::NotFound,
            Fetch::SchemaMismatch(d) => Fetch::SchemaMismatch(d),
        }
    }
}

impl<T> Fetch<Vec<T>> {
    /// `NotFound` for an empty row set.
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Fetch::NotFound
        } else {
            Fetch::Found(rows)
        }
    }

    /// Rows when found, otherwise an empty list.
    pub fn into_rows(self) -> Vec<T> {
        self.found().unwrap_or_default()
    }
}

/// Handle to a CMBS SQLite snapshot.
#[derive(Debug, Clone)]
pub struct SourceDb {
    path: PathBuf,
}

impl SourceDb {
    /// Validate the path and create a handle. No connection is held.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DbError::NotFound(path.to_path_buf()));
        }
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a fresh read-only connection, closed when `f` returns.
    pub fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let result = f(&conn);
        drop(conn);
        result.map_err(DbError::from)
    }

    /// Run `f` only if `table` exists with every one of `columns`; otherwise
    /// report the first unmet requirement as a schema mismatch.
    pub(crate) fn guarded<T, F>(&self, table: &str, columns: &[&str], f: F) -> DbResult<Fetch<T>>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<Fetch<T>>,
    {
        self.with_conn(|conn| {
            if let Some(drift) = check_columns(conn, table, columns)? {
                warn!(table, "{}", drift);
                return Ok(Fetch::SchemaMismatch(drift));
            }
            f(conn)
        })
    }
}

/// Column names of `table`, lowercased. Empty when the table does not exist.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    let columns = names
        .map(|name| name.map(|n| n.to_lowercase()))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// First missing table or column among `columns` of `table`.
pub(crate) fn check_columns(
    conn: &Connection,
    table: &str,
    columns: &[&str],
) -> rusqlite::Result<Option<SchemaDrift>> {
    let present = table_columns(conn, table)?;
    if present.is_empty() {
        return Ok(Some(SchemaDrift::MissingTable { table: table.to_string() }));
    }
    let missing = columns
        .iter()
        .find(|c| !present.iter().any(|p| p == &c.to_lowercase()));
    Ok(missing.map(|column| SchemaDrift::MissingColumn {
        table: table.to_string(),
        column: column.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn test_open_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceDb::open(dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_check_columns_reports_drift() {
        let (_dir, db) = fixtures::sample_db();
        db.with_conn(|conn| {
            assert_eq!(check_columns(conn, "deals", &["deal_id", "bloomberg_name"])?, None);
            assert_eq!(
                check_columns(conn, "deals", &["deal_id", "nope"])?,
                Some(SchemaDrift::MissingColumn { table: "deals".into(), column: "nope".into() })
            );
            assert_eq!(
                check_columns(conn, "ghost", &[])?,
                Some(SchemaDrift::MissingTable { table: "ghost".into() })
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_connection_is_read_only() {
        let (_dir, db) = fixtures::sample_db();
        let err = db
            .with_conn(|conn| conn.execute("DELETE FROM deals", []))
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[test]
    fn test_drift_messages() {
        let table = SchemaDrift::MissingTable { table: "account_holding".into() };
        assert_eq!(table.to_string(), "The 'account_holding' table was not found.");
        let column = SchemaDrift::MissingColumn { table: "deals".into(), column: "bloomberg_name".into() };
        assert_eq!(column.to_string(), "The 'bloomberg_name' column was not found in the deals table.");
    }
}
