//! Named read operations over a loaded CMBS graph.

use anyhow::{Context, Result};
use neo4rs::{query, Row};
use serde::Serialize;

use crate::GraphClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub cusip: Option<String>,
    pub properties: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    pub id: String,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub year_built: Option<String>,
    pub msa: Option<String>,
    pub name: Option<String>,
}

fn text(row: &Row, field: &str) -> Option<String> {
    // Attribute values may be stored as integers (year built) or strings.
    if let Ok(s) = row.get::<Option<String>>(field) {
        return s;
    }
    row.get::<Option<i64>>(field).ok().flatten().map(|n| n.to_string())
}

/// Display (Bloomberg) name recorded on a Deal node.
pub async fn display_name_by_deal_id(client: &GraphClient, deal_id: &str) -> Result<Option<String>> {
    let q = query("MATCH (d:Deal {id: $id}) RETURN d.displayName AS name").param("id", deal_id);
    let rows = client.query(q).await?;
    Ok(rows.first().and_then(|row| text(row, "name")))
}

/// Deals holding a property at the given address key (exact match).
pub async fn deal_ids_by_address(client: &GraphClient, address: &str) -> Result<Vec<String>> {
    let q = query(
        "MATCH (d:Deal)-[:HASPROPERTY]->(:Property)-[:LOCATEDAT]->(a:Address)
         WHERE a.id = $address
         RETURN DISTINCT d.id AS deal_id
         ORDER BY deal_id",
    )
    .param("address", address);

    let rows = client.query(q).await?;
    Ok(rows.iter().filter_map(|row| text(row, "deal_id")).collect())
}

pub async fn properties_by_deal_id(client: &GraphClient, deal_id: &str) -> Result<Vec<PropertySummary>> {
    let q = query(
        "MATCH (p:Property)-[:PARTOFDEAL]->(:Deal {id: $id})
         OPTIONAL MATCH (p)-[:LOCATEDAT]->(a:Address)
         OPTIONAL MATCH (p)-[:PROPERTYTYPE]->(t:PropertyType)
         OPTIONAL MATCH (p)-[:BUILTAT]->(y:YearBuilt)
         OPTIONAL MATCH (p)-[:INMSA]->(m:MSA)
         OPTIONAL MATCH (p)-[:NAMEDAS]->(n:PropertyName)
         RETURN p.id AS id, a.id AS address, t.value AS property_type,
                y.value AS year_built, m.value AS msa, n.value AS name
         ORDER BY id",
    )
    .param("id", deal_id);

    let rows = client.query(q).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(PropertySummary {
                id: text(row, "id")?,
                address: text(row, "address"),
                property_type: text(row, "property_type"),
                year_built: text(row, "year_built"),
                msa: text(row, "msa"),
                name: text(row, "name"),
            })
        })
        .collect())
}

pub async fn list_deals(client: &GraphClient) -> Result<Vec<DealSummary>> {
    let q = query(
        "MATCH (d:Deal)
         OPTIONAL MATCH (d)-[:HASPROPERTY]->(p:Property)
         RETURN d.id AS id, d.displayName AS display_name, d.cusip AS cusip,
                count(DISTINCT p) AS properties
         ORDER BY id",
    );

    let rows = client.query(q).await?;
    let mut deals = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(id) = text(row, "id") else { continue };
        let mut deal = DealSummary {
            id,
            display_name: text(row, "display_name"),
            cusip: text(row, "cusip"),
            properties: 0,
        };
        deal.properties = property_count(&deal.id, row.get::<i64>("properties"))?;
        deals.push(deal);
    }
    Ok(deals)
}

fn property_count<E>(deal_id: &str, decoded: std::result::Result<i64, E>) -> Result<usize>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let count = decoded.with_context(|| format!("Reading property count of deal {}", deal_id))?;
    Ok(count.max(0) as usize)
}

/// Run an arbitrary Cypher query, rendering each row for display.
pub async fn raw_query(client: &GraphClient, cypher: &str) -> Result<Vec<String>> {
    let rows = client.query(query(cypher)).await?;
    Ok(rows.iter().map(|row| format!("{:?}", row)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_count_decode_error_is_reported() {
        let bad: std::result::Result<i64, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected integer"));
        let err = property_count("14", bad).unwrap_err();
        assert!(err.to_string().contains("deal 14"));

        assert_eq!(property_count::<std::io::Error>("14", Ok(3)).unwrap(), 3);
        assert_eq!(property_count::<std::io::Error>("14", Ok(-1)).unwrap(), 0);
    }
}
