//! Ad-hoc queries.
//!
//! No schema introspection happens here: a statement naming a table the
//! snapshot lacks fails like any other malformed query.

use rusqlite::ToSql;

use crate::pool::{DbResult, SourceDb};
use crate::table::{read_table, Table};

/// Run an arbitrary read-only statement.
pub fn select_rows(db: &SourceDb, sql: &str, params: &[&dyn ToSql]) -> DbResult<Table> {
    db.with_conn(|conn| read_table(conn, sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use crate::{DbError, SqlValue};

    #[test]
    fn test_select_rows_with_params() {
        let (_dir, db) = fixtures::sample_db();
        let table = select_rows(
            &db,
            "SELECT bloomberg_name FROM deals WHERE deal_id = ?1",
            &[&14i64],
        )
        .unwrap();
        assert_eq!(table.rows, vec![vec![SqlValue::Text("SAMPLE CMBS 2014-1".into())]]);
    }

    #[test]
    fn test_malformed_query_is_fatal() {
        let (_dir, db) = fixtures::sample_db();
        let err = select_rows(&db, "SELEC nonsense", &[]).unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
    }
}
