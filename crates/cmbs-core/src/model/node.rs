//! Typed graph nodes.

use std::collections::BTreeMap;
use std::fmt;

/// Node types of the CMBS graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Deal,
    Property,
    Address,
    YearBuilt,
    PropertyType,
    Owner,
    Msa,
    PropertyName,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Deal,
        NodeKind::Property,
        NodeKind::Address,
        NodeKind::YearBuilt,
        NodeKind::PropertyType,
        NodeKind::Owner,
        NodeKind::Msa,
        NodeKind::PropertyName,
    ];

    /// The `@type` of the node and its label in the graph store.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Deal => "Deal",
            NodeKind::Property => "Property",
            NodeKind::Address => "Address",
            NodeKind::YearBuilt => "YearBuilt",
            NodeKind::PropertyType => "PropertyType",
            NodeKind::Owner => "Owner",
            NodeKind::Msa => "MSA",
            NodeKind::PropertyName => "PropertyName",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }

    /// Identifier used when the attribute value is absent.
    pub fn unknown(&self) -> Option<Sentinel> {
        match self {
            NodeKind::Address => Some(Sentinel::UnknownAddress),
            NodeKind::YearBuilt => Some(Sentinel::UnknownYearBuilt),
            NodeKind::PropertyType => Some(Sentinel::UnknownPropertyType),
            NodeKind::Owner => Some(Sentinel::UnknownOwner),
            NodeKind::Msa => Some(Sentinel::UnknownMsa),
            NodeKind::PropertyName => Some(Sentinel::UnknownPropertyName),
            NodeKind::Deal | NodeKind::Property => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The de-duplication key of a node: (label, identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// Placeholder strings written in place of absent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    None,
    UnknownAddress,
    UnknownYearBuilt,
    UnknownPropertyType,
    UnknownMsa,
    UnknownPropertyName,
    UnknownOwner,
    UnknownType,
}

impl Sentinel {
    pub const ALL: [Sentinel; 8] = [
        Sentinel::None,
        Sentinel::UnknownAddress,
        Sentinel::UnknownYearBuilt,
        Sentinel::UnknownPropertyType,
        Sentinel::UnknownMsa,
        Sentinel::UnknownPropertyName,
        Sentinel::UnknownOwner,
        Sentinel::UnknownType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentinel::None => "None",
            Sentinel::UnknownAddress => "UnknownAddress",
            Sentinel::UnknownYearBuilt => "UnknownYearBuilt",
            Sentinel::UnknownPropertyType => "UnknownPropertyType",
            Sentinel::UnknownMsa => "UnknownMsa",
            Sentinel::UnknownPropertyName => "UnknownPropertyName",
            Sentinel::UnknownOwner => "UnknownOwner",
            Sentinel::UnknownType => "UnknownType",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

/// A literal (non-reference) property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Looked up and absent; rendered as the sentinel string.
    Missing(Sentinel),
}

impl Literal {
    /// Text when present, otherwise the given sentinel.
    pub fn text_or(value: Option<&str>, sentinel: Sentinel) -> Self {
        match value {
            Some(v) => Literal::Text(v.to_string()),
            None => Literal::Missing(sentinel),
        }
    }

    /// Integer when the value parses as one, text otherwise.
    pub fn number_or_text(value: Option<&str>, sentinel: Sentinel) -> Self {
        match value {
            Some(v) => v
                .parse::<i64>()
                .map(Literal::Integer)
                .unwrap_or_else(|_| Literal::Text(v.to_string())),
            None => Literal::Missing(sentinel),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Literal::Missing(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => f.write_str(s),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Missing(s) => f.write_str(s.as_str()),
        }
    }
}

/// A reference-valued property.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    One(String),
    Many(Vec<String>),
}

impl Reference {
    pub fn targets(&self) -> &[String] {
        match self {
            Reference::One(id) => std::slice::from_ref(id),
            Reference::Many(ids) => ids,
        }
    }
}

/// A typed node with literal and reference properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub id: String,
    pub literals: BTreeMap<String, Literal>,
    pub references: BTreeMap<String, Reference>,
}

impl Node {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            literals: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.kind, self.id.clone())
    }

    pub fn with_literal(mut self, name: &str, value: Literal) -> Self {
        self.literals.insert(name.to_string(), value);
        self
    }

    /// Single reference; replaces any previous target.
    pub fn link(&mut self, relation: &str, target: impl Into<String>) {
        self.references
            .insert(relation.to_string(), Reference::One(target.into()));
    }

    /// Append to a reference list, ignoring targets already present.
    pub fn push_link(&mut self, relation: &str, target: impl Into<String>) {
        let target = target.into();
        let entry = self
            .references
            .entry(relation.to_string())
            .or_insert_with(|| Reference::Many(Vec::new()));
        let upgraded = match &mut *entry {
            Reference::Many(ids) => {
                if !ids.contains(&target) {
                    ids.push(target);
                }
                None
            }
            Reference::One(existing) if *existing != target => {
                Some(Reference::Many(vec![existing.clone(), target]))
            }
            Reference::One(_) => None,
        };
        if let Some(reference) = upgraded {
            *entry = reference;
        }
    }

    /// Merge `other` into this node; `other` wins on conflicting literals and
    /// single references, reference lists are unioned.
    pub fn merge_from(&mut self, other: Node) {
        self.literals.extend(other.literals);
        for (relation, reference) in other.references {
            match reference {
                Reference::One(target) => self.link(&relation, target),
                Reference::Many(targets) => {
                    for target in targets {
                        self.push_link(&relation, target);
                    }
                }
            }
        }
    }

    /// Outgoing (relation, target id) pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.references.iter().flat_map(|(relation, reference)| {
            reference
                .targets()
                .iter()
                .map(move |target| (relation.as_str(), target.as_str()))
        })
    }
}
