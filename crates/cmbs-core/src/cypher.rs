//! Compiles a [`GraphDocument`] into an ordered Cypher mutation script.
//!
//! Every node becomes one `MERGE` on `(label, id)` that sets its literals;
//! every reference becomes one `MATCH ... MERGE` edge. All node statements
//! come first so edge endpoints always exist when the edges run, and both
//! forms are safe to replay against a store that already holds the document.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::builder::relation_target_kind;
use crate::error::CmbsResult;
use crate::model::{GraphDocument, Literal, NodeKey, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    NodeUpsert,
    EdgeMerge,
}

/// One statement of a compiled script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationStatement {
    pub kind: StatementKind,
    pub text: String,
}

impl fmt::Display for MutationStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Compile a document into node upserts followed by edge merges.
///
/// Nodes sharing a `(label, id)` key produce a single upsert whose literals are
/// merged in document order, later values winning. Duplicate references produce
/// a single edge statement.
pub fn compile(doc: &GraphDocument) -> Vec<MutationStatement> {
    let mut order: Vec<NodeKey> = Vec::new();
    let mut literals: HashMap<NodeKey, BTreeMap<&str, &Literal>> = HashMap::new();
    for node in &doc.nodes {
        let key = node.key();
        let slot = literals.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            BTreeMap::new()
        });
        for (name, literal) in &node.literals {
            slot.insert(name.as_str(), literal);
        }
    }

    let mut statements: Vec<MutationStatement> = order
        .iter()
        .map(|key| MutationStatement {
            kind: StatementKind::NodeUpsert,
            text: node_upsert(key, &literals[key]),
        })
        .collect();

    let kinds = doc.kinds_by_id();
    let mut seen: HashSet<(NodeKey, &str, &str)> = HashSet::new();
    for node in &doc.nodes {
        for (relation, target) in node.edges() {
            if !seen.insert((node.key(), relation, target)) {
                continue;
            }
            let candidates = kinds.get(target).map(Vec::as_slice).unwrap_or_default();
            for target_kind in target_kinds(relation, candidates) {
                statements.push(MutationStatement {
                    kind: StatementKind::EdgeMerge,
                    text: edge_merge(node.kind, &node.id, relation, target_kind, target),
                });
            }
        }
    }

    statements
}

fn node_upsert(key: &NodeKey, literals: &BTreeMap<&str, &Literal>) -> String {
    let mut text = format!(
        "MERGE (n:{} {{id: {}}})",
        quote_identifier(key.kind.label()),
        quote_string(&key.id)
    );
    if !literals.is_empty() {
        let assignments: Vec<String> = literals
            .iter()
            .map(|(name, literal)| format!("n.{} = {}", quote_identifier(name), literal_value(literal)))
            .collect();
        text.push_str(" SET ");
        text.push_str(&assignments.join(", "));
    }
    text
}

/// Labels to match an edge target under.
///
/// An id held by several kinds resolves through the relation's own target
/// kind; failing that, the edge is emitted once per kind so every match stays
/// labeled. Only a target absent from the document is matched by id alone.
fn target_kinds(relation: &str, candidates: &[NodeKind]) -> Vec<Option<NodeKind>> {
    match candidates {
        [] => vec![None],
        [kind] => vec![Some(*kind)],
        _ => match relation_target_kind(relation) {
            Some(kind) if candidates.contains(&kind) => vec![Some(kind)],
            _ => candidates.iter().copied().map(Some).collect(),
        },
    }
}

fn edge_merge(
    source_kind: NodeKind,
    source_id: &str,
    relation: &str,
    target_kind: Option<NodeKind>,
    target_id: &str,
) -> String {
    format!(
        "MATCH (a{} {{id: {}}}), (b{} {{id: {}}}) MERGE (a)-[:{}]->(b)",
        label_suffix(Some(source_kind)),
        quote_string(source_id),
        label_suffix(target_kind),
        quote_string(target_id),
        quote_identifier(&relationship_type(relation)),
    )
}

/// `:Label`, or nothing when the endpoint kind is unknown.
fn label_suffix(kind: Option<NodeKind>) -> String {
    kind.map(|k| format!(":{}", quote_identifier(k.label())))
        .unwrap_or_default()
}

/// Relationship type of a reference property: uppercased, spaces as `_`.
pub fn relationship_type(property: &str) -> String {
    property.to_uppercase().replace(' ', "_")
}

/// Escape a string for a single-quoted Cypher literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Back-quote labels, keys and relationship types that are not plain identifiers.
pub fn quote_identifier(s: &str) -> String {
    if is_plain_identifier(s) {
        s.to_string()
    } else {
        format!("`{}`", s.replace('`', "``"))
    }
}

fn literal_value(literal: &Literal) -> String {
    match literal {
        Literal::Text(s) => quote_string(s),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{:.1}", x),
        Literal::Float(x) if x.is_finite() => x.to_string(),
        Literal::Float(x) => quote_string(&x.to_string()),
        Literal::Boolean(b) => b.to_string(),
        Literal::Missing(sentinel) => quote_string(sentinel.as_str()),
    }
}

/// Script text: one statement per line, each terminated by `;`.
pub fn render_script(statements: &[MutationStatement]) -> String {
    let mut out = String::new();
    for statement in statements {
        out.push_str(&statement.text);
        out.push_str(";\n");
    }
    out
}

/// Write a script, replacing any existing file.
pub fn write_script(statements: &[MutationStatement], path: &Path) -> CmbsResult<()> {
    fs::write(path, render_script(statements))?;
    Ok(())
}

/// Split a script into statements on `;` outside quoted strings and
/// back-quoted names. Blank statements are dropped.
pub fn split_script(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = script.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' && q != '`' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                }
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                _ => current.push(c),
            },
        }
    }
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{assemble, DealFacts};
    use crate::model::{Node, Sentinel};
    use cmbs_db::queries::propinfo::PropertyInfoRow;

    fn row(address: &str, year: &str) -> PropertyInfoRow {
        PropertyInfoRow {
            address: Some(address.into()),
            year_built: Some(year.into()),
            property_type: Some("Office".into()),
            state: Some("TX".into()),
            msa: Some("Dallas".into()),
            property_name: None,
        }
    }

    fn deal() -> DealFacts {
        DealFacts {
            deal_id: "14".into(),
            cusip: "05591XAE1".into(),
            display_name: Some("SAMPLE CMBS 2014-1".into()),
            issuer_name: None,
        }
    }

    #[test]
    fn test_nodes_precede_edges() {
        let doc = assemble(&deal(), &[row("100 Main St", "1999"), row("9 Pine Rd", "2001")], &[])
            .unwrap()
            .document;
        let statements = compile(&doc);
        let first_edge = statements
            .iter()
            .position(|s| s.kind == StatementKind::EdgeMerge)
            .unwrap();
        assert!(statements[..first_edge].iter().all(|s| s.kind == StatementKind::NodeUpsert));
        assert!(statements[first_edge..].iter().all(|s| s.kind == StatementKind::EdgeMerge));
    }

    #[test]
    fn test_duplicate_address_gives_one_property_upsert() {
        let doc = assemble(&deal(), &[row("100 Main St", "1999"), row("100 Main St", "2005")], &[])
            .unwrap()
            .document;
        let statements = compile(&doc);
        let upserts: Vec<_> = statements
            .iter()
            .filter(|s| s.text.starts_with("MERGE (n:Property "))
            .collect();
        assert_eq!(upserts.len(), 1);
        assert!(upserts[0].text.contains("{id: 'property:14:100 Main St, TX'}"));

        let has_property = statements
            .iter()
            .filter(|s| s.text.contains("[:HASPROPERTY]"))
            .count();
        assert_eq!(has_property, 1);
    }

    #[test]
    fn test_upsert_text() {
        let mut doc = GraphDocument::new();
        doc.push(
            Node::new(NodeKind::Deal, "14")
                .with_literal("dealId", Literal::Text("14".into()))
                .with_literal("displayName", Literal::Missing(Sentinel::None)),
        );
        doc.push(Node::new(NodeKind::YearBuilt, "yearbuilt:1999").with_literal("value", Literal::Integer(1999)));
        let statements = compile(&doc);
        assert_eq!(
            statements[0].text,
            "MERGE (n:Deal {id: '14'}) SET n.dealId = '14', n.displayName = 'None'"
        );
        assert_eq!(
            statements[1].text,
            "MERGE (n:YearBuilt {id: 'yearbuilt:1999'}) SET n.value = 1999"
        );
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut doc = GraphDocument::new();
        doc.push(Node::new(NodeKind::Msa, "msa:Dallas").with_literal("value", Literal::Text("old".into())));
        doc.push(Node::new(NodeKind::Msa, "msa:Dallas").with_literal("value", Literal::Text("new".into())));
        let statements = compile(&doc);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].text.ends_with("SET n.value = 'new'"));
    }

    #[test]
    fn test_edge_text_uses_labels_and_merge() {
        let mut doc = GraphDocument::new();
        doc.push(Node::new(NodeKind::Address, "O'Hare Plaza, IL"));
        let mut property = Node::new(NodeKind::Property, "property:3:O'Hare Plaza, IL");
        property.link("locatedAt", "O'Hare Plaza, IL");
        doc.push(property);

        let statements = compile(&doc);
        assert_eq!(
            statements[2].text,
            "MATCH (a:Property {id: 'property:3:O''Hare Plaza, IL'}), (b:Address {id: 'O''Hare Plaza, IL'}) \
             MERGE (a)-[:LOCATEDAT]->(b)"
        );
    }

    #[test]
    fn test_shared_target_id_resolves_through_relation() {
        let mut doc = GraphDocument::new();
        doc.push(Node::new(NodeKind::Address, "7"));
        doc.push(Node::new(NodeKind::Deal, "7"));
        let mut property = Node::new(NodeKind::Property, "p");
        property.link("partOfDeal", "7");
        doc.push(property);
        let edges: Vec<_> = compile(&doc)
            .into_iter()
            .filter(|s| s.kind == StatementKind::EdgeMerge)
            .collect();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].text.contains("(b:Deal {id: '7'})"));
    }

    #[test]
    fn test_shared_target_id_with_unknown_relation_stays_labeled() {
        let mut doc = GraphDocument::new();
        doc.push(Node::new(NodeKind::Address, "7"));
        doc.push(Node::new(NodeKind::Deal, "7"));
        let mut property = Node::new(NodeKind::Property, "p");
        property.link("seeAlso", "7");
        doc.push(property);
        let edges: Vec<String> = compile(&doc)
            .into_iter()
            .filter(|s| s.kind == StatementKind::EdgeMerge)
            .map(|s| s.text)
            .collect();
        assert_eq!(edges.len(), 2);
        assert!(edges[0].contains("(b:Address {id: '7'})"));
        assert!(edges[1].contains("(b:Deal {id: '7'})"));
        assert!(edges.iter().all(|e| !e.contains("(b {id:")));
    }

    #[test]
    fn test_escaping_and_quoting() {
        assert_eq!(escape_string("O'Brien"), "O''Brien");
        assert_eq!(escape_string(r"C:\dir"), r"C:\\dir");
        assert_eq!(relationship_type("owned by"), "OWNED_BY");
        assert_eq!(quote_identifier("MSA"), "MSA");
        assert_eq!(quote_identifier("year-built"), "`year-built`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(literal_value(&Literal::Float(2.0)), "2.0");
        assert_eq!(literal_value(&Literal::Boolean(true)), "true");
    }

    #[test]
    fn test_render_and_split_round_trip() {
        let doc = assemble(&deal(), &[row("12; Semicolon Ave", "1999"), row("O'Neil St", "1980")], &[])
            .unwrap()
            .document;
        let statements = compile(&doc);
        let script = render_script(&statements);
        assert!(script.ends_with(";\n"));

        let split = split_script(&script);
        let texts: Vec<_> = statements.iter().map(|s| s.text.clone()).collect();
        assert_eq!(split, texts);
    }

    #[test]
    fn test_split_script_handles_quotes() {
        let script = "RETURN 'a;b';\n\nRETURN \"c;d\";RETURN `e;f`;RETURN 'x\\';y';  ";
        assert_eq!(
            split_script(script),
            vec!["RETURN 'a;b'", "RETURN \"c;d\"", "RETURN `e;f`", "RETURN 'x\\';y'"]
        );
    }
}
