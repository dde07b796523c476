//! Applies compiled mutation scripts to the graph store.
//!
//! Two modes: per statement, where a failing statement is logged and the
//! rest still run, and transactional, where the whole script commits or
//! rolls back as one unit.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::Query;
use tracing::{debug, error, info, warn};

use cmbs_core::cypher::split_script;
use cmbs_core::LoadMode;

use crate::GraphClient;

/// Something that can run Cypher statements.
#[async_trait]
pub trait StatementRunner: Send + Sync {
    async fn run_statement(&self, statement: &str) -> Result<()>;

    /// Run all statements in one transaction, committing only if all succeed.
    async fn run_in_transaction(&self, statements: &[String]) -> Result<()>;
}

#[async_trait]
impl StatementRunner for GraphClient {
    async fn run_statement(&self, statement: &str) -> Result<()> {
        self.execute(Query::new(statement.to_string())).await
    }

    async fn run_in_transaction(&self, statements: &[String]) -> Result<()> {
        let mut txn = self.inner().start_txn().await.context("Failed to start transaction")?;

        let mut failure = None;
        for (idx, statement) in statements.iter().enumerate() {
            if let Err(e) = txn.run(Query::new(statement.clone())).await {
                failure = Some(anyhow::anyhow!("statement {} failed: {}", idx + 1, e));
                break;
            }
        }

        match failure {
            None => {
                txn.commit().await.context("Failed to commit transaction")?;
                Ok(())
            }
            Some(e) => {
                warn!("Error during transactional load, rolling back: {}", e);
                txn.rollback().await.context("Failed to rollback transaction")?;
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStatement {
    /// 1-based position in the script.
    pub index: usize,
    pub statement: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total: usize,
    pub applied: usize,
    pub failed: Vec<FailedStatement>,
    pub rolled_back: bool,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.rolled_back && self.applied == self.total
    }
}

/// Run statements one by one in order; a failure is recorded and the load
/// continues. The store may be left partially updated.
pub async fn load_statements<R>(runner: &R, statements: &[String]) -> LoadReport
where
    R: StatementRunner + ?Sized,
{
    let total = statements.len();
    let mut report = LoadReport {
        total,
        ..Default::default()
    };

    for (idx, statement) in statements.iter().enumerate() {
        match runner.run_statement(statement).await {
            Ok(()) => {
                report.applied += 1;
                debug!(index = idx + 1, total, "Statement applied");
            }
            Err(e) => {
                error!(index = idx + 1, total, error = %e, "Statement failed");
                report.failed.push(FailedStatement {
                    index: idx + 1,
                    statement: statement.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    info!(applied = report.applied, failed = report.failed.len(), total, "Load finished");
    report
}

/// Run all statements in a single transaction. A failure rolls back every
/// statement and is reported, not returned as an error.
pub async fn load_in_transaction<R>(runner: &R, statements: &[String]) -> LoadReport
where
    R: StatementRunner + ?Sized,
{
    let total = statements.len();
    match runner.run_in_transaction(statements).await {
        Ok(()) => {
            info!(total, "Transaction committed");
            LoadReport {
                total,
                applied: total,
                ..Default::default()
            }
        }
        Err(e) => {
            error!(total, error = %e, "Transaction rolled back");
            LoadReport {
                total,
                applied: 0,
                failed: vec![FailedStatement {
                    index: 0,
                    statement: String::new(),
                    error: format!("{:#}", e),
                }],
                rolled_back: true,
            }
        }
    }
}

/// Split a script into statements and load it in the given mode.
pub async fn load_script<R>(runner: &R, script: &str, mode: LoadMode) -> LoadReport
where
    R: StatementRunner + ?Sized,
{
    let statements = split_script(script);
    match mode {
        LoadMode::PerStatement => load_statements(runner, &statements).await,
        LoadMode::Transactional => load_in_transaction(runner, &statements).await,
    }
}

pub async fn load_script_file<R>(runner: &R, path: &Path, mode: LoadMode) -> Result<LoadReport>
where
    R: StatementRunner + ?Sized,
{
    let script = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!(path = %path.display(), ?mode, "Loading Cypher script");
    Ok(load_script(runner, &script, mode).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records statements and fails any containing `FAIL`.
    #[derive(Default)]
    struct RecordingRunner {
        committed: Mutex<Vec<String>>,
        transactions: Mutex<usize>,
    }

    #[async_trait]
    impl StatementRunner for RecordingRunner {
        async fn run_statement(&self, statement: &str) -> Result<()> {
            if statement.contains("FAIL") {
                anyhow::bail!("syntax error");
            }
            self.committed.lock().unwrap().push(statement.to_string());
            Ok(())
        }

        async fn run_in_transaction(&self, statements: &[String]) -> Result<()> {
            *self.transactions.lock().unwrap() += 1;
            if statements.iter().any(|s| s.contains("FAIL")) {
                anyhow::bail!("syntax error");
            }
            self.committed.lock().unwrap().extend(statements.iter().cloned());
            Ok(())
        }
    }

    fn statements(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_per_statement_continues_after_failure() {
        let runner = RecordingRunner::default();
        let report = load_statements(&runner, &statements(&["MERGE (a)", "FAIL", "MERGE (b)"])).await;

        assert_eq!(report.applied, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 2);
        assert!(!report.is_complete());
        assert_eq!(*runner.committed.lock().unwrap(), statements(&["MERGE (a)", "MERGE (b)"]));
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_everything() {
        let runner = RecordingRunner::default();
        let report = load_in_transaction(&runner, &statements(&["MERGE (a)", "FAIL"])).await;

        assert!(report.rolled_back);
        assert_eq!(report.applied, 0);
        assert!(runner.committed.lock().unwrap().is_empty());
        assert_eq!(*runner.transactions.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_script_modes() {
        let runner = RecordingRunner::default();
        let script = "MERGE (n:Deal {id: '14'});\nMERGE (n:Address {id: 'a;b'});\n";

        let report = load_script(&runner, script, LoadMode::Transactional).await;
        assert!(report.is_complete());
        assert_eq!(report.total, 2);

        let report = load_script(&runner, script, LoadMode::PerStatement).await;
        assert!(report.is_complete());
        assert_eq!(runner.committed.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_load_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmbs_graph_X.cypher");
        std::fs::write(&path, "MERGE (n:Deal {id: '1'});\n").unwrap();

        let runner = RecordingRunner::default();
        let report = load_script_file(&runner, &path, LoadMode::PerStatement).await.unwrap();
        assert_eq!(report.applied, 1);

        assert!(load_script_file(&runner, &dir.path().join("missing.cypher"), LoadMode::PerStatement)
            .await
            .is_err());
    }
}
