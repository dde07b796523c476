//! Read queries against the CMBS snapshot, grouped by source table.

pub mod deals;
pub mod holdings;
pub mod propinfo;
pub mod raw;

/// `WHERE` predicate matching `deal_id` against the text bound at `?1`.
///
/// Numeric columns convert the text by affinity; TEXT columns compare it as
/// stored, so `'014'` never matches `'14'`. The cast handles untyped columns.
pub(crate) const DEAL_ID_MATCHES: &str = "(deal_id = ?1 OR CAST(deal_id AS TEXT) = ?1)";

/// Snapshot fixtures shared with downstream crates' tests.
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use crate::SourceDb;

    pub const FULL_SCHEMA: &str = "
        CREATE TABLE account_holding (cusip TEXT, ult_issuer_name TEXT, deal_id INTEGER);
        CREATE TABLE deal_tranche (deal_id INTEGER, tr_cusip TEXT);
        CREATE TABLE deals (deal_id INTEGER, bloomberg_name TEXT);
        CREATE TABLE collateral (deal_id INTEGER, loan_id TEXT, balance REAL);
        CREATE TABLE propinfo (
            deal_id INTEGER, address TEXT, year_built REAL, trustee_prop_type_full TEXT,
            state TEXT, msa_name TEXT, prop_name TEXT, owner_name TEXT, owner_type TEXT
        );
    ";

    pub const SAMPLE_ROWS: &str = "
        INSERT INTO account_holding VALUES ('05591XAE1', 'SAMPLE ISSUER LLC', 14);
        INSERT INTO account_holding VALUES ('NODEAL001', 'ORPHAN TRUST', NULL);
        INSERT INTO account_holding VALUES ('05591XAE1', 'SAMPLE ISSUER LLC', 14);
        INSERT INTO deal_tranche VALUES (14, '05591XAE1');
        INSERT INTO deals VALUES (14, 'SAMPLE CMBS 2014-1');
        INSERT INTO collateral VALUES (14, 'L-1', 1250000.0);
        INSERT INTO propinfo VALUES (14, '100 Main St', 1999.0, 'Office', 'TX', 'Dallas', 'Main Tower', 'Main Owner LP', 'Private');
        INSERT INTO propinfo VALUES (14, '200 Elm St', NULL, 'Retail', NULL, NULL, NULL, NULL, NULL);
    ";

    /// Create a snapshot from arbitrary SQL and open it.
    pub fn db_from_sql(sql: &str) -> (TempDir, SourceDb) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
        drop(conn);
        let db = SourceDb::open(&path).unwrap();
        (dir, db)
    }

    pub fn sample_db() -> (TempDir, SourceDb) {
        db_from_sql(&format!("{}{}", FULL_SCHEMA, SAMPLE_ROWS))
    }
}
