//! Deal resolution and deal-level queries (`deal_tranche`, `deals`, `collateral`).

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::pool::{check_columns, DbResult, Fetch, SourceDb};
use crate::queries::DEAL_ID_MATCHES;
use crate::table::{read_table, text_at, Table};

/// Resolve the deal id for a tranche CUSIP.
///
/// The primary path is `deal_tranche.tr_cusip`. When a snapshot ships without
/// `deal_tranche`, the holding's own `deal_id` is joined against `deals`
/// instead. Only a missing table triggers the alternative path.
pub fn find_deal_id_for_security(db: &SourceDb, cusip: &str) -> DbResult<Fetch<String>> {
    let primary = db.guarded("deal_tranche", &["deal_id", "tr_cusip"], |conn| {
        let deal_id = conn
            .query_row(
                "SELECT deal_id FROM deal_tranche WHERE tr_cusip = ?1 LIMIT 1",
                params![cusip],
                |row| text_at(row, 0),
            )
            .optional()?
            .flatten();
        Ok(Fetch::from_option(deal_id))
    })?;

    match primary {
        Fetch::SchemaMismatch(drift) if drift.is_missing_table() => {
            warn!(cusip, "Attempting to find deal_id through the holding join");
            let alternative = db.with_conn(|conn| deal_id_via_holding(conn, cusip))?;
            if let Fetch::SchemaMismatch(alt_drift) = &alternative {
                warn!(cusip, "Could not find deal_id using the alternative path: {}", alt_drift);
                return Ok(Fetch::SchemaMismatch(drift));
            }
            Ok(alternative)
        }
        Fetch::NotFound => {
            debug!(cusip, "No deal_id found");
            Ok(Fetch::NotFound)
        }
        other => Ok(other),
    }
}

fn deal_id_via_holding(conn: &Connection, cusip: &str) -> rusqlite::Result<Fetch<String>> {
    for (table, columns) in [("account_holding", &["cusip", "deal_id"][..]), ("deals", &["deal_id"][..])] {
        if let Some(drift) = check_columns(conn, table, columns)? {
            return Ok(Fetch::SchemaMismatch(drift));
        }
    }

    let deal_id = conn
        .query_row(
            "SELECT d.deal_id
             FROM deals d
             JOIN account_holding ah ON ah.deal_id = d.deal_id
             WHERE ah.cusip = ?1
             LIMIT 1",
            params![cusip],
            |row| text_at(row, 0),
        )
        .optional()?
        .flatten();
    Ok(Fetch::from_option(deal_id))
}

/// Display (Bloomberg) name of a deal.
pub fn find_display_name_for_deal(db: &SourceDb, deal_id: &str) -> DbResult<Fetch<String>> {
    db.guarded("deals", &["deal_id", "bloomberg_name"], |conn| {
        let sql = format!("SELECT bloomberg_name FROM deals WHERE {} LIMIT 1", DEAL_ID_MATCHES);
        let name = conn
            .query_row(
                &sql,
                params![deal_id],
                |row| text_at(row, 0),
            )
            .optional()?
            .flatten();
        Ok(Fetch::from_option(name))
    })
}

/// Every row of `deals`.
pub fn list_deals(db: &SourceDb) -> DbResult<Fetch<Table>> {
    db.guarded("deals", &[], |conn| {
        let table = read_table(conn, "SELECT * FROM deals", [])?;
        Ok(if table.is_empty() { Fetch::NotFound } else { Fetch::Found(table) })
    })
}

/// Collateral rows, optionally for a single deal.
pub fn list_collateral(db: &SourceDb, deal_id: Option<&str>) -> DbResult<Fetch<Table>> {
    let columns: &[&str] = if deal_id.is_some() { &["deal_id"] } else { &[] };
    db.guarded("collateral", columns, |conn| {
        let table = match deal_id {
            Some(id) => {
                let sql = format!("SELECT * FROM collateral WHERE {}", DEAL_ID_MATCHES);
                read_table(conn, &sql, params![id])?
            }
            None => read_table(conn, "SELECT * FROM collateral", [])?,
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
    fn test_find_deal_id_primary_path() {
        let (_dir, db) = fixtures::sample_db();
        assert_eq!(
            find_deal_id_for_security(&db, "05591XAE1").unwrap(),
            Fetch::Found("14".to_string())
        );
        assert_eq!(find_deal_id_for_security(&db, "NODEAL001").unwrap(), Fetch::NotFound);
    }

    #[test]
    fn test_find_deal_id_falls_back_without_deal_tranche() {
        let (_dir, db) = fixtures::db_from_sql(
            "CREATE TABLE account_holding (cusip TEXT, ult_issuer_name TEXT, deal_id INTEGER);
             CREATE TABLE deals (deal_id INTEGER, bloomberg_name TEXT);
             INSERT INTO account_holding VALUES ('05591XAE1', 'ISSUER', 14);
             INSERT INTO deals VALUES (14, 'SAMPLE CMBS 2014-1');",
        );
        assert_eq!(
            find_deal_id_for_security(&db, "05591XAE1").unwrap(),
            Fetch::Found("14".to_string())
        );
    }

    #[test]
    fn test_find_deal_id_reports_primary_drift_when_fallback_fails() {
        let (_dir, db) = fixtures::db_from_sql("CREATE TABLE deals (deal_id INTEGER);");
        assert_eq!(
            find_deal_id_for_security(&db, "05591XAE1").unwrap(),
            Fetch::SchemaMismatch(SchemaDrift::MissingTable { table: "deal_tranche".into() })
        );
    }

    #[test]
    fn test_display_name_matches_text_and_integer_ids() {
        let (_dir, db) = fixtures::db_from_sql(
            "CREATE TABLE deals (deal_id TEXT, bloomberg_name TEXT);
             INSERT INTO deals VALUES ('14', 'SAMPLE CMBS 2014-1');
             INSERT INTO deals VALUES ('ABC', 'LETTERED DEAL');",
        );
        assert_eq!(
            find_display_name_for_deal(&db, "14").unwrap(),
            Fetch::Found("SAMPLE CMBS 2014-1".to_string())
        );
        assert_eq!(
            find_display_name_for_deal(&db, "ABC").unwrap(),
            Fetch::Found("LETTERED DEAL".to_string())
        );

        let (_dir2, db2) = fixtures::sample_db();
        assert_eq!(
            find_display_name_for_deal(&db2, "14").unwrap(),
            Fetch::Found("SAMPLE CMBS 2014-1".to_string())
        );
        assert_eq!(find_display_name_for_deal(&db2, "99").unwrap(), Fetch::NotFound);
    }

    #[test]
    fn test_list_collateral() {
        let (_dir, db) = fixtures::sample_db();
        let table = list_collateral(&db, Some("14")).unwrap().found().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(list_collateral(&db, Some("99")).unwrap(), Fetch::NotFound);
        assert!(list_deals(&db).unwrap().is_found());
    }
}
