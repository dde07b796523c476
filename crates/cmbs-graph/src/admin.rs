//! Named-database administration and store reset.
//!
//! Database commands run against the `system` database, so they take the
//! connection settings rather than an open client.

use anyhow::{bail, Result};
use neo4rs::Query;
use tracing::{info, warn};

use cmbs_core::cypher::quote_identifier;
use cmbs_core::GraphConfig;

use crate::{GraphClient, GraphCounts};

const SYSTEM_DATABASE: &str = "system";

/// Neo4j database names: ASCII letters, digits, dots and dashes, starting
/// with a letter.
pub fn validate_database_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && name.len() >= 3
        && name.len() <= 63;
    if !valid {
        bail!("Invalid database name '{}'", name);
    }
    Ok(())
}

pub async fn list_databases(config: &GraphConfig) -> Result<Vec<String>> {
    let client = GraphClient::connect_to(config, SYSTEM_DATABASE).await?;
    let rows = client
        .query(Query::new("SHOW DATABASES YIELD name RETURN DISTINCT name ORDER BY name".to_string()))
        .await?;

    let mut names = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row
            .get("name")
            .map_err(|e| anyhow::anyhow!("Failed to read database name: {:?}", e))?;
        names.push(name);
    }
    Ok(names)
}

/// Create a database unless it already exists. Returns whether it was created.
pub async fn create_database(config: &GraphConfig, name: &str) -> Result<bool> {
    validate_database_name(name)?;
    if list_databases(config).await?.iter().any(|n| n == name) {
        info!(database = name, "Database already exists. Skipping creation.");
        return Ok(false);
    }

    let client = GraphClient::connect_to(config, SYSTEM_DATABASE).await?;
    client
        .execute(Query::new(format!("CREATE DATABASE {}", quote_identifier(name))))
        .await?;
    info!(database = name, "Database created");
    Ok(true)
}

pub async fn drop_database(config: &GraphConfig, name: &str) -> Result<()> {
    validate_database_name(name)?;
    if name == SYSTEM_DATABASE {
        bail!("Refusing to drop the system database");
    }
    let client = GraphClient::connect_to(config, SYSTEM_DATABASE).await?;
    client
        .execute(Query::new(format!("DROP DATABASE {} IF EXISTS", quote_identifier(name))))
        .await?;
    warn!(database = name, "Database dropped (if it existed)");
    Ok(())
}

/// Remove every node and relationship. Returns the counts before deletion.
pub async fn clean_database(client: &GraphClient) -> Result<GraphCounts> {
    let before = client.get_counts().await?;
    client
        .execute(Query::new("MATCH (n) DETACH DELETE n".to_string()))
        .await?;
    warn!(
        database = client.database(),
        nodes = before.nodes,
        relationships = before.relationships,
        "Database cleaned"
    );
    Ok(before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_names() {
        assert!(validate_database_name("gi-cmbs").is_ok());
        assert!(validate_database_name("cmbs.v2").is_ok());
        assert!(validate_database_name("neo4j").is_ok());
        assert!(validate_database_name("9lives").is_err());
        assert!(validate_database_name("ab").is_err());
        assert!(validate_database_name("x`; DROP").is_err());
        assert!(validate_database_name("").is_err());
    }
}
