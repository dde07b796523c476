//! Pipeline configuration.
//!
//! Loaded from a TOML file with every section optional, then overridden by
//! environment variables. The configuration is passed explicitly to each
//! component; nothing reads it globally.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CmbsError, CmbsResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cmbs.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmbsConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path of the SQLite snapshot.
    pub db: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for generated artifacts; the snapshot's directory when unset.
    pub dir: Option<PathBuf>,
}

/// How a mutation script is applied to the graph store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Statement by statement; failures are logged and skipped.
    #[default]
    PerStatement,
    /// One transaction per script, rolled back on the first failure.
    Transactional,
}

/// Connection settings for the Neo4j graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub load_mode: LoadMode,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            load_mode: LoadMode::PerStatement,
        }
    }
}

impl CmbsConfig {
    pub fn from_toml_str(text: &str) -> CmbsResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> CmbsResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CmbsError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` when given, else `cmbs.toml` when present, else defaults.
    /// Environment overrides are applied in every case.
    pub fn load_or_default(path: Option<&Path>) -> CmbsResult<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CMBS_SOURCE_DB") {
            self.source.db = Some(PathBuf::from(v));
        }
        if let Some(v) = get("CMBS_OUTPUT_DIR") {
            self.output.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("NEO4J_URI") {
            self.graph.uri = v;
        }
        if let Some(v) = get("NEO4J_USER") {
            self.graph.user = v;
        }
        if let Some(v) = get("NEO4J_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = get("NEO4J_DATABASE") {
            self.graph.database = v;
        }
    }

    pub fn source_db(&self) -> CmbsResult<&Path> {
        self.source
            .db
            .as_deref()
            .ok_or_else(|| CmbsError::config("no source database configured (use --db or CMBS_SOURCE_DB)"))
    }

    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output.dir {
            return dir.clone();
        }
        self.source
            .db
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CmbsConfig::from_toml_str("").unwrap();
        assert_eq!(config, CmbsConfig::default());
        assert_eq!(config.graph.uri, "bolt://localhost:7687");
        assert_eq!(config.graph.database, "neo4j");
        assert_eq!(config.graph.load_mode, LoadMode::PerStatement);
        assert!(config.source_db().is_err());
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_partial_toml() {
        let config = CmbsConfig::from_toml_str(
            r#"
            [source]
            db = "/data/intex/snapshot.db"

            [graph]
            database = "cmbs"
            load_mode = "transactional"
            "#,
        )
        .unwrap();
        assert_eq!(config.source_db().unwrap(), Path::new("/data/intex/snapshot.db"));
        assert_eq!(config.output_dir(), PathBuf::from("/data/intex"));
        assert_eq!(config.graph.database, "cmbs");
        assert_eq!(config.graph.user, "neo4j");
        assert_eq!(config.graph.load_mode, LoadMode::Transactional);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            CmbsConfig::from_toml_str("[graph]\nload_mode = \"sometimes\""),
            Err(CmbsError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CMBS_SOURCE_DB", "snap.db"),
            ("CMBS_OUTPUT_DIR", "/tmp/cmbs"),
            ("NEO4J_URI", "bolt://graph:7687"),
            ("NEO4J_PASSWORD", "secret"),
            ("NEO4J_DATABASE", " "),
        ]
        .into_iter()
        .collect();

        let mut config = CmbsConfig::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.source.db, Some(PathBuf::from("snap.db")));
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/cmbs"));
        assert_eq!(config.graph.uri, "bolt://graph:7687");
        assert_eq!(config.graph.password, "secret");
        assert_eq!(config.graph.database, "neo4j");
    }

    #[test]
    fn test_relative_db_outputs_to_cwd() {
        let mut config = CmbsConfig::default();
        config.source.db = Some(PathBuf::from("snap.db"));
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = CmbsConfig::load(Path::new("/nonexistent/cmbs.toml")).unwrap_err();
        assert!(matches!(err, CmbsError::Config(_)));
    }
}
