//! Property and ownership queries over `propinfo`.

use rusqlite::params;
use serde::Serialize;
use tracing::warn;

use crate::pool::{table_columns, DbResult, Fetch, SourceDb};
use crate::queries::DEAL_ID_MATCHES;
use crate::table::text_at;

/// Property row from `propinfo`. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyInfoRow {
    pub address: Option<String>,
    pub year_built: Option<String>,
    pub property_type: Option<String>,
    pub state: Option<String>,
    pub msa: Option<String>,
    pub property_name: Option<String>,
}

/// Ownership row from `propinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnerInfoRow {
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
}

const REQUIRED_PROPERTY_COLUMNS: &[&str] =
    &["deal_id", "address", "year_built", "trustee_prop_type_full", "state"];

/// Columns some snapshots lack; read as NULL when absent.
const OPTIONAL_PROPERTY_COLUMNS: &[&str] = &["msa_name", "prop_name"];

/// Property rows of a deal in table order.
pub fn list_property_info_for_deal(db: &SourceDb, deal_id: &str) -> DbResult<Fetch<Vec<PropertyInfoRow>>> {
    db.guarded("propinfo", REQUIRED_PROPERTY_COLUMNS, |conn| {
        let present = table_columns(conn, "propinfo")?;
        let optional: Vec<String> = OPTIONAL_PROPERTY_COLUMNS
            .iter()
            .map(|col| {
                if present.iter().any(|p| p.as_str() == *col) {
                    col.to_string()
                } else {
                    warn!(deal_id, column = *col, "propinfo has no such column, reading as empty");
                    format!("NULL AS {}", col)
                }
            })
            .collect();

        let sql = format!(
            "SELECT address, year_built, trustee_prop_type_full, state, {}
             FROM propinfo
             WHERE {}
             ORDER BY rowid",
            optional.join(", "),
            DEAL_ID_MATCHES
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![deal_id], |row| {
            Ok(PropertyInfoRow {
                address: text_at(row, 0)?,
                year_built: text_at(row, 1)?,
                property_type: text_at(row, 2)?,
                state: text_at(row, 3)?,
                msa: text_at(row, 4)?,
                property_name: text_at(row, 5)?,
            })
        })?;
        let properties = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Fetch::from_rows(properties))
    })
}

/// Owner rows of a deal, in the same order as [`list_property_info_for_deal`].
pub fn list_owner_info_for_deal(db: &SourceDb, deal_id: &str) -> DbResult<Fetch<Vec<OwnerInfoRow>>> {
    db.guarded("propinfo", &["deal_id", "owner_name", "owner_type"], |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT owner_name, owner_type FROM propinfo WHERE {} ORDER BY rowid",
            DEAL_ID_MATCHES
        ))?;
        let rows = stmt.query_map(params![deal_id], |row| {
            Ok(OwnerInfoRow {
                owner_name: text_at(row, 0)?,
                owner_type: text_at(row, 1)?,
            })
        })?;
        let owners = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Fetch::from_rows(owners))
    })
}
