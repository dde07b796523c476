//! The linked-data graph document.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CmbsError, CmbsResult};
use crate::model::node::{Node, NodeKey, NodeKind};

/// Prefix-to-URI mapping written at the top of every document.
pub const CONTEXT: &[(&str, &str)] = &[
    ("cusip", "http://schema.org/identifier"),
    ("deal", "http://schema.org/Product"),
    ("property", "http://schema.org/Place"),
    ("issuer", "http://schema.org/Organization"),
    ("dealId", "http://schema.org/productID"),
    ("displayName", "http://schema.org/alternateName"),
    ("issuerName", "http://schema.org/issuedBy"),
    ("address", "http://schema.org/address"),
    ("value", "http://schema.org/value"),
    ("ownerName", "http://schema.org/name"),
    ("ownerType", "http://schema.org/additionalType"),
    ("hasProperty", "http://schema.org/location"),
    ("partOfDeal", "http://schema.org/isPartOf"),
    ("locatedAt", "http://schema.org/address"),
    ("builtAt", "http://schema.org/dateCreated"),
    ("propertyType", "http://schema.org/additionalType"),
    ("inMsa", "http://schema.org/containedInPlace"),
    ("namedAs", "http://schema.org/name"),
    ("ownedBy", "http://schema.org/owner"),
];

/// A context block plus an ordered node list.
///
/// Documents produced by the builder always end with their Deal node, after
/// every Property the Deal refers to. Consumers may rely on that order.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDocument {
    pub context: BTreeMap<String, String>,
    pub nodes: Vec<Node>,
}

impl Default for GraphDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed reference between two nodes of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: NodeKey,
    pub relation: String,
    pub target: String,
}

impl GraphDocument {
    /// Empty document with the standard context.
    pub fn new() -> Self {
        Self {
            context: standard_context(),
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node with the given label and identifier.
    pub fn find(&self, kind: NodeKind, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == kind && n.id == id)
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// The Deal node, which the builder places last.
    pub fn deal(&self) -> Option<&Node> {
        self.nodes.iter().rev().find(|n| n.kind == NodeKind::Deal)
    }

    /// Labels under which each identifier appears.
    pub fn kinds_by_id(&self) -> HashMap<&str, Vec<NodeKind>> {
        let mut index: HashMap<&str, Vec<NodeKind>> = HashMap::new();
        for node in &self.nodes {
            let kinds = index.entry(node.id.as_str()).or_default();
            if !kinds.contains(&node.kind) {
                kinds.push(node.kind);
            }
        }
        index
    }

    /// Every reference of every node, in document order.
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.edges().map(move |(relation, target)| Edge {
                    source: node.key(),
                    relation: relation.to_string(),
                    target: target.to_string(),
                })
            })
            .collect()
    }

    /// Fail on the first reference whose target is not a node of this document.
    pub fn check_closure(&self) -> CmbsResult<()> {
        let index = self.kinds_by_id();
        for node in &self.nodes {
            for (relation, target) in node.edges() {
                if !index.contains_key(target) {
                    return Err(CmbsError::DanglingReference {
                        from: node.id.clone(),
                        relation: relation.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

pub fn standard_context() -> BTreeMap<String, String> {
    CONTEXT
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
