//! Neo4j schema initialization.

use anyhow::Result;
use neo4rs::Query;
use tracing::info;

use cmbs_core::cypher::quote_identifier;
use cmbs_core::NodeKind;

use crate::GraphClient;

/// Uniqueness constraint on `id` for every node label, plus a full-text
/// index over addresses for the address lookup.
pub fn schema_statements() -> Vec<String> {
    let mut statements: Vec<String> = NodeKind::ALL
        .iter()
        .map(|kind| {
            format!(
                "CREATE CONSTRAINT {}_id IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
                kind.label().to_lowercase(),
                quote_identifier(kind.label())
            )
        })
        .collect();
    statements.push("CREATE FULLTEXT INDEX address_search IF NOT EXISTS FOR (a:Address) ON EACH [a.id]".to_string());
    statements
}

/// Safe to run repeatedly; every statement uses `IF NOT EXISTS`.
pub async fn initialize_schema(client: &GraphClient) -> Result<usize> {
    info!(database = client.database(), "Initializing Neo4j schema...");

    let statements = schema_statements();
    for statement in &statements {
        client.execute(Query::new(statement.clone())).await?;
    }

    info!("Neo4j schema initialized ({} statements)", statements.len());
    Ok(statements.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_constraint_per_label() {
        let statements = schema_statements();
        assert_eq!(statements.len(), NodeKind::ALL.len() + 1);
        assert!(statements.contains(
            &"CREATE CONSTRAINT msa_id IF NOT EXISTS FOR (n:MSA) REQUIRE n.id IS UNIQUE".to_string()
        ));
        assert!(statements.iter().all(|s| s.contains("IF NOT EXISTS")));
    }
}
