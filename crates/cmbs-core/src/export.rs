//! Per-security export: build the graph, then write the JSON-LD document,
//! the Cypher script and the flattened sentence/vertex/edge files.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use cmbs_db::queries::holdings;
use cmbs_db::{Fetch, SourceDb};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::builder::{build_graph_for_security, BuildOutcome, NotApplicableReason, SecurityExport};
use crate::cypher;
use crate::error::CmbsResult;
use crate::jsonld;
use crate::model::{GraphDocument, Reference};

/// File name prefix shared by every generated artifact.
pub const ARTIFACT_PREFIX: &str = "cmbs_";

/// Extensions of generated artifacts, as removed by [`clean_artifacts`].
pub const ARTIFACT_EXTENSIONS: &[&str] = &["jsonld", "cypher", "txt", "csv"];

/// Output files of one security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub jsonld: PathBuf,
    pub cypher: PathBuf,
    pub sentences: PathBuf,
    pub vertices: PathBuf,
    pub edges: PathBuf,
}

impl ArtifactPaths {
    pub fn for_security(out_dir: &Path, cusip: &str) -> Self {
        let name = file_component(cusip);
        Self {
            jsonld: out_dir.join(format!("cmbs_graph_{}.jsonld", name)),
            cypher: out_dir.join(format!("cmbs_graph_{}.cypher", name)),
            sentences: out_dir.join(format!("cmbs_rag_{}.txt", name)),
            vertices: out_dir.join(format!("cmbs_vertices_{}.csv", name)),
            edges: out_dir.join(format!("cmbs_edges_{}.csv", name)),
        }
    }

    pub fn all(&self) -> [&Path; 5] {
        [
            self.jsonld.as_path(),
            self.cypher.as_path(),
            self.sentences.as_path(),
            self.vertices.as_path(),
            self.edges.as_path(),
        ]
    }
}

/// CUSIPs are alphanumeric; anything else is replaced so a malformed value
/// cannot escape the output directory.
fn file_component(cusip: &str) -> String {
    cusip
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Exported {
        cusip: String,
        deal_id: String,
        paths: ArtifactPaths,
        nodes: usize,
        statements: usize,
    },
    NotApplicable {
        cusip: String,
        reason: NotApplicableReason,
    },
}

/// Build and write every artifact of one security.
///
/// Nothing is written unless the build succeeds; existing files are replaced.
pub fn export_security(db: &SourceDb, cusip: &str, out_dir: &Path) -> CmbsResult<ExportOutcome> {
    match build_graph_for_security(db, cusip)? {
        BuildOutcome::Built(export) => {
            let paths = ArtifactPaths::for_security(out_dir, cusip);
            let statements = write_artifacts(&export, &paths)?;
            info!(
                cusip,
                deal_id = %export.deal_id,
                nodes = export.document.len(),
                statements,
                "Exported security"
            );
            Ok(ExportOutcome::Exported {
                cusip: export.cusip,
                deal_id: export.deal_id,
                nodes: export.document.len(),
                statements,
                paths,
            })
        }
        BuildOutcome::NotApplicable { cusip, reason } => Ok(ExportOutcome::NotApplicable { cusip, reason }),
    }
}

/// Write all five artifacts and return the number of compiled statements.
pub fn write_artifacts(export: &SecurityExport, paths: &ArtifactPaths) -> CmbsResult<usize> {
    if let Some(parent) = paths.jsonld.parent() {
        fs::create_dir_all(parent)?;
    }

    jsonld::write_document(&export.document, &paths.jsonld)?;

    let statements = cypher::compile(&export.document);
    cypher::write_script(&statements, &paths.cypher)?;

    fs::write(&paths.sentences, export.flat.sentences_text())?;
    fs::write(&paths.vertices, export.flat.vertex_table())?;
    fs::write(&paths.edges, export.flat.edge_table())?;

    Ok(statements.len())
}

/// Outcome of a batch export.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub exported: Vec<String>,
    pub not_applicable: Vec<(String, NotApplicableReason)>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.exported.len() + self.not_applicable.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Export every held security, one after the other.
///
/// A fatal fault while exporting one security is recorded and the batch moves
/// on. `on_progress` is called with (done, total, cusip) before each security.
pub fn export_all<F>(db: &SourceDb, out_dir: &Path, mut on_progress: F) -> CmbsResult<BatchReport>
where
    F: FnMut(usize, usize, &str),
{
    let cusips = match holdings::list_all_security_identifiers(db)? {
        Fetch::SchemaMismatch(drift) => {
            warn!("{}", drift);
            Vec::new()
        }
        fetch => fetch.into_rows(),
    };
    info!(count = cusips.len(), "Exporting securities");

    let mut report = BatchReport::default();
    for (idx, cusip) in cusips.iter().enumerate() {
        on_progress(idx, cusips.len(), cusip);
        match export_security(db, cusip, out_dir) {
            Ok(ExportOutcome::Exported { cusip, .. }) => report.exported.push(cusip),
            Ok(ExportOutcome::NotApplicable { cusip, reason }) => report.not_applicable.push((cusip, reason)),
            Err(e) => {
                error!(cusip = %cusip, error = %e, "Export failed");
                report.failed.push((cusip.clone(), e.to_string()));
            }
        }
    }

    info!(
        exported = report.exported.len(),
        not_applicable = report.not_applicable.len(),
        failed = report.failed.len(),
        "Batch export complete"
    );
    Ok(report)
}

fn is_artifact(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(ARTIFACT_PREFIX));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARTIFACT_EXTENSIONS.contains(&e));
    name_matches && ext_matches
}

/// Artifacts under `dir`, recursively. Symlinked directories are not followed.
pub fn find_artifacts(dir: &Path) -> CmbsResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if is_artifact(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Delete generated artifacts under `dir` and return what was removed.
pub fn clean_artifacts(dir: &Path) -> CmbsResult<Vec<PathBuf>> {
    let artifacts = find_artifacts(dir)?;
    for path in &artifacts {
        fs::remove_file(path)?;
        info!(path = %path.display(), "Deleted artifact");
    }
    Ok(artifacts)
}

/// Human-readable node listing of a document.
pub fn describe_document(doc: &GraphDocument) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        let _ = writeln!(out, "\nNode ID: {}", node.id);
        let _ = writeln!(out, "  Type: {}", node.kind);
        for (name, literal) in &node.literals {
            let _ = writeln!(out, "  {}: {}", name, literal);
        }
        for (name, reference) in &node.references {
            match reference {
                Reference::One(target) => {
                    let _ = writeln!(out, "  {}: -> {}", name, target);
                }
                Reference::Many(targets) => {
                    let _ = writeln!(out, "  {}:", name);
                    for target in targets {
                        let _ = writeln!(out, "    - -> {}", target);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_export_writes_all_artifacts() {
        let (dir, db) = test_support::sample_db();
        let out = dir.path().join("out");
        let outcome = export_security(&db, "05591XAE1", &out).unwrap();

        let paths = match outcome {
            ExportOutcome::Exported { paths, deal_id, .. } => {
                assert_eq!(deal_id, "14");
                paths
            }
            other => panic!("expected export, got {other:?}"),
        };
        for path in paths.all() {
            assert!(path.is_file(), "{} missing", path.display());
        }
        assert!(paths.jsonld.ends_with("cmbs_graph_05591XAE1.jsonld"));

        let sentences = fs::read_to_string(&paths.sentences).unwrap();
        assert_eq!(sentences.lines().count(), 2);
        assert!(sentences.starts_with("the deal 14 has cusip:05591XAE1"));

        let script = fs::read_to_string(&paths.cypher).unwrap();
        assert!(script.lines().all(|l| l.ends_with(';')));

        let doc = jsonld::read_document(&paths.jsonld).unwrap();
        assert!(doc.check_closure().is_ok());
    }

    #[test]
    fn test_not_applicable_writes_nothing() {
        let (dir, db) = test_support::sample_db();
        let out = dir.path().join("out");
        let outcome = export_security(&db, "NODEAL001", &out).unwrap();
        assert!(matches!(outcome, ExportOutcome::NotApplicable { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_export_all_reports_each_security() {
        let (dir, db) = test_support::sample_db();
        let mut seen = Vec::new();
        let report = export_all(&db, dir.path(), |_, total, cusip| seen.push((total, cusip.to_string()))).unwrap();

        assert_eq!(report.exported, vec!["05591XAE1".to_string()]);
        assert_eq!(report.not_applicable.len(), 1);
        assert!(!report.has_failures());
        assert_eq!(report.total(), 2);
        assert_eq!(seen, vec![(2, "05591XAE1".to_string()), (2, "NODEAL001".to_string())]);
    }

    #[test]
    fn test_export_all_without_holdings_is_empty() {
        let (dir, db) = test_support::db_from_sql("CREATE TABLE deals (deal_id INTEGER);");
        let report = export_all(&db, dir.path(), |_, _, _| {}).unwrap();
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_clean_removes_only_artifacts() {
        let (dir, db) = test_support::sample_db();
        export_security(&db, "05591XAE1", dir.path()).unwrap();
        let keep = dir.path().join("notes.txt");
        fs::write(&keep, "keep").unwrap();

        let removed = clean_artifacts(dir.path()).unwrap();
        assert_eq!(removed.len(), 5);
        assert!(keep.exists());
        assert!(dir.path().join("snapshot.db").exists());
        assert!(find_artifacts(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_artifacts_skips_symlinked_directories() {
        let (dir, db) = test_support::sample_db();
        let nested = dir.path().join("nested");
        export_security(&db, "05591XAE1", &nested).unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();

        let found = find_artifacts(dir.path()).unwrap();
        assert_eq!(found.len(), 5);
        assert!(found.iter().all(|p| !p.to_string_lossy().contains("loop")));
    }

    #[test]
    fn test_file_component_is_sanitized() {
        let paths = ArtifactPaths::for_security(Path::new("/tmp/out"), "../x/y");
        assert_eq!(paths.edges, Path::new("/tmp/out/cmbs_edges____x_y.csv"));
    }

    #[test]
    fn test_describe_document() {
        let (_dir, db) = test_support::sample_db();
        let export = match build_graph_for_security(&db, "05591XAE1").unwrap() {
            BuildOutcome::Built(export) => export,
            other => panic!("unexpected {other:?}"),
        };
        let text = describe_document(&export.document);
        assert!(text.contains("Node ID: 14\n  Type: Deal"));
        assert!(text.contains("  hasProperty:\n    - -> property:14:100 Main St, TX"));
        assert!(text.contains("  locatedAt: -> 100 Main St, TX"));
    }
}
