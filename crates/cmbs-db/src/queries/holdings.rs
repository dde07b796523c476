//! Queries over `account_holding`.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension};

use crate::pool::{DbResult, Fetch, SourceDb};
use crate::table::{read_table, text_at, Table};

/// All CUSIPs held, in table order with duplicates removed.
///
/// A snapshot without `account_holding` yields a schema mismatch, which
/// callers treat as an empty list.
pub fn list_all_security_identifiers(db: &SourceDb) -> DbResult<Fetch<Vec<String>>> {
    db.guarded("account_holding", &["cusip"], |conn| {
        let mut stmt = conn.prepare("SELECT cusip FROM account_holding ORDER BY rowid")?;
        let mut rows = stmt.query([])?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut cusips: Vec<String> = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(cusip) = text_at(row, 0)? {
                if seen.insert(cusip.clone()) {
                    cusips.push(cusip);
                }
            }
        }
        Ok(Fetch::from_rows(cusips))
    })
}

/// Ultimate issuer name recorded for a CUSIP.
pub fn find_issuer_name_for_security(db: &SourceDb, cusip: &str) -> DbResult<Fetch<String>> {
    db.guarded("account_holding", &["cusip", "ult_issuer_name"], |conn| {
        let name = conn
            .query_row(
                "SELECT ult_issuer_name FROM account_holding WHERE cusip = ?1 LIMIT 1",
                params![cusip],
                |row| text_at(row, 0),
            )
            .optional()?
            .flatten();
        Ok(Fetch::from_option(name))
    })
}

/// Raw holding rows, optionally for a single CUSIP.
pub fn list_account_holdings(db: &SourceDb, cusip: Option<&str>) -> DbResult<Fetch<Table>> {
    let columns: &[&str] = if cusip.is_some() { &["cusip"] } else { &[] };
    db.guarded("account_holding", columns, |conn| {
        let table = match cusip {
            Some(c) => read_table(conn, "SELECT * FROM account_holding WHERE cusip = ?1", params![c])?,
            None => read_table(conn, "SELECT * FROM account_holding", [])?,
        };
        Ok(if table.is_empty() { Fetch::NotFound } else { Fetch::Found(table) })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use crate::SchemaDrift;

    #[test]
    fn test_list_cusips_dedupes_in_order() {
        let (_dir, db) = fixtures::sample_db();
        let cusips = list_all_security_identifiers(&db).unwrap().into_rows();
        assert_eq!(cusips, vec!["05591XAE1", "NODEAL001"]);
    }

    #[test]
    fn test_list_cusips_many_repeats() {
        let mut sql = String::from("CREATE TABLE account_holding (cusip TEXT, ult_issuer_name TEXT, deal_id INTEGER);");
        for i in 0..2000 {
            sql.push_str(&format!("INSERT INTO account_holding VALUES ('C{:03}', 'ISSUER', 1);", i % 500));
        }
        let (_dir, db) = fixtures::db_from_sql(&sql);
        let cusips = list_all_security_identifiers(&db).unwrap().into_rows();
        assert_eq!(cusips.len(), 500);
        assert_eq!(cusips[0], "C000");
        assert_eq!(cusips[499], "C499");
    }

    #[test]
    fn test_missing_holding_table_is_empty_not_fault() {
        let (_dir, db) = fixtures::db_from_sql("CREATE TABLE deals (deal_id INTEGER, bloomberg_name TEXT);");
        let fetch = list_all_security_identifiers(&db).unwrap();
        assert_eq!(
            fetch.drift(),
            Some(&SchemaDrift::MissingTable { table: "account_holding".into() })
        );
        assert!(fetch.into_rows().is_empty());
    }

    #[test]
    fn test_issuer_name_lookup() {
        let (_dir, db) = fixtures::sample_db();
        assert_eq!(
            find_issuer_name_for_security(&db, "05591XAE1").unwrap(),
            Fetch::Found("SAMPLE ISSUER LLC".to_string())
        );
        assert_eq!(find_issuer_name_for_security(&db, "UNKNOWN00").unwrap(), Fetch::NotFound);
    }

    #[test]
    fn test_issuer_name_missing_column() {
        let (_dir, db) = fixtures::db_from_sql("CREATE TABLE account_holding (cusip TEXT);");
        let fetch = find_issuer_name_for_security(&db, "05591XAE1").unwrap();
        assert_eq!(
            fetch,
            Fetch::SchemaMismatch(SchemaDrift::MissingColumn {
                table: "account_holding".into(),
                column: "ult_issuer_name".into(),
            })
        );
    }

    #[test]
    fn test_list_account_holdings_filtered() {
        let (_dir, db) = fixtures::sample_db();
        let table = list_account_holdings(&db, Some("NODEAL001")).unwrap().found().unwrap();
        assert_eq!(table.len(), 1);
        let all = list_account_holdings(&db, None).unwrap().found().unwrap();
        assert_eq!(all.len(), 3);
    }
}
