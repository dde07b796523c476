//! JSON-LD rendering and parsing of [`GraphDocument`]s.
//!
//! Layout: `{"@context": {...}, "@graph": [node, ...]}`. A node carries
//! `@type`, `@id`, its literals, single references as `{"@id": ...}` and
//! reference lists as `[{"@id": ...}, ...]`.

use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{CmbsError, CmbsResult};
use crate::model::{GraphDocument, Literal, Node, NodeKind, Reference, Sentinel};

/// Render a document as a JSON value.
pub fn to_json(doc: &GraphDocument) -> Value {
    let graph: Vec<Value> = doc.nodes.iter().map(node_to_json).collect();
    json!({
        "@context": doc.context,
        "@graph": graph,
    })
}

pub fn to_string_pretty(doc: &GraphDocument) -> CmbsResult<String> {
    Ok(serde_json::to_string_pretty(&to_json(doc))?)
}

/// Write a document, replacing any existing file.
pub fn write_document(doc: &GraphDocument, path: &Path) -> CmbsResult<()> {
    let mut text = to_string_pretty(doc)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

pub fn read_document(path: &Path) -> CmbsResult<GraphDocument> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}

fn node_to_json(node: &Node) -> Value {
    let mut obj = Map::new();
    obj.insert("@type".into(), Value::String(node.kind.label().to_string()));
    obj.insert("@id".into(), Value::String(node.id.clone()));

    for (name, literal) in &node.literals {
        obj.insert(name.clone(), literal_to_json(literal));
    }
    for (name, reference) in &node.references {
        let value = match reference {
            Reference::One(id) => json!({ "@id": id }),
            Reference::Many(ids) => Value::Array(ids.iter().map(|id| json!({ "@id": id })).collect()),
        };
        obj.insert(name.clone(), value);
    }
    Value::Object(obj)
}

fn literal_to_json(literal: &Literal) -> Value {
    match literal {
        Literal::Text(s) => Value::String(s.clone()),
        Literal::Integer(i) => json!(i),
        Literal::Float(x) => json!(x),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Missing(sentinel) => Value::String(sentinel.as_str().to_string()),
    }
}

/// Parse a JSON-LD document produced by [`to_json`].
///
/// Node order is preserved. A missing `@context` falls back to the standard
/// one; a missing `@graph` is an error.
pub fn parse_document(text: &str) -> CmbsResult<GraphDocument> {
    let value: Value = serde_json::from_str(text)?;
    let root = value
        .as_object()
        .ok_or_else(|| CmbsError::invalid_document("top level is not an object"))?;

    let mut doc = GraphDocument::new();
    if let Some(context) = root.get("@context").and_then(Value::as_object) {
        doc.context = context
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|uri| (k.clone(), uri.to_string())))
            .collect();
    }

    let graph = root
        .get("@graph")
        .and_then(Value::as_array)
        .ok_or_else(|| CmbsError::invalid_document("missing @graph array"))?;

    for (idx, item) in graph.iter().enumerate() {
        doc.push(parse_node(idx, item)?);
    }
    Ok(doc)
}

fn parse_node(idx: usize, item: &Value) -> CmbsResult<Node> {
    let obj = item
        .as_object()
        .ok_or_else(|| CmbsError::invalid_document(format!("node {} is not an object", idx)))?;

    let label = obj
        .get("@type")
        .and_then(Value::as_str)
        .ok_or_else(|| CmbsError::invalid_document(format!("node {} has no @type", idx)))?;
    let kind = NodeKind::from_label(label)
        .ok_or_else(|| CmbsError::invalid_document(format!("node {} has unknown type '{}'", idx, label)))?;
    let id = obj
        .get("@id")
        .and_then(Value::as_str)
        .ok_or_else(|| CmbsError::invalid_document(format!("node {} has no @id", idx)))?;

    let mut node = Node::new(kind, id);
    for (name, value) in obj {
        if name.starts_with('@') {
            continue;
        }
        if let Some(reference) = parse_reference(value) {
            node.references.insert(name.clone(), reference);
            continue;
        }
        let literal = parse_literal(value).ok_or_else(|| {
            CmbsError::invalid_document(format!("node '{}' has unsupported value for '{}'", id, name))
        })?;
        node.literals.insert(name.clone(), literal);
    }
    Ok(node)
}

fn reference_id(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("@id")?.as_str()
}

fn parse_reference(value: &Value) -> Option<Reference> {
    match value {
        Value::Object(_) => reference_id(value).map(|id| Reference::One(id.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|item| reference_id(item).map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Reference::Many),
        _ => None,
    }
}

fn parse_literal(value: &Value) -> Option<Literal> {
    match value {
        Value::String(s) => Some(match Sentinel::parse(s) {
            Some(sentinel) => Literal::Missing(sentinel),
            None => Literal::Text(s.clone()),
        }),
        Value::Number(n) => n
            .as_i64()
            .map(Literal::Integer)
            .or_else(|| n.as_f64().map(Literal::Float)),
        Value::Bool(b) => Some(Literal::Boolean(*b)),
        _ => None,
    }
}
