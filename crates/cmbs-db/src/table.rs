//! Uniform tabular results.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Params, Row};
use serde::Serialize;

/// A single cell as read from SQLite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Normalized text form of the cell, or `None` for NULL and blank text.
    ///
    /// Reals with no fractional part render as integers, which is how year
    /// and id columns come out of snapshots written through dataframes.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Blob(_) => None,
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => {
                Some((*r as i64).to_string())
            }
            SqlValue::Real(r) => Some(r.to_string()),
            SqlValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(r) => SqlValue::Real(r),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Normalized text of column `idx` in `row`.
pub(crate) fn text_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(SqlValue::from(row.get_ref(idx)?).as_text())
}

/// Ordered column names plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell at `row` under column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&SqlValue> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Rows as (column, value) pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &SqlValue)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}

/// Run `sql` and collect every row into a [`Table`].
pub(crate) fn read_table<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Table> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let cells = (0..width)
            .map(|i| row.get_ref(i).map(SqlValue::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(cells);
    }

    Ok(Table { columns, rows: out })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text_normalization() {
        assert_eq!(SqlValue::Integer(14).as_text(), Some("14".to_string()));
        assert_eq!(SqlValue::Real(1999.0).as_text(), Some("1999".to_string()));
        assert_eq!(SqlValue::Real(2.5).as_text(), Some("2.5".to_string()));
        assert_eq!(SqlValue::Text("  Dallas ".into()).as_text(), Some("Dallas".to_string()));
        assert_eq!(SqlValue::Text("   ".into()).as_text(), None);
        assert_eq!(SqlValue::Null.as_text(), None);
    }

    #[test]
    fn test_read_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a INTEGER, b TEXT);
             INSERT INTO t VALUES (1, 'x'), (2, NULL);",
        )
        .unwrap();

        let table = read_table(&conn, "SELECT a, b FROM t ORDER BY a", []).unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "B"), Some(&SqlValue::Text("x".into())));
        assert_eq!(table.get(1, "b"), Some(&SqlValue::Null));

        let records: Vec<_> = table.records().collect();
        assert_eq!(records[1][0], ("a", &SqlValue::Integer(2)));
    }
}
