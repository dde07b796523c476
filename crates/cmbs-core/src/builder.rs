//! Builds the per-security graph from snapshot rows.
//!
//! One CUSIP resolves to at most one Deal. Each `propinfo` row of that deal
//! becomes a Property node, keyed by deal id and address, linked to shared
//! attribute nodes (Address, YearBuilt, PropertyType, MSA, PropertyName,
//! Owner). The Deal node goes last, once its `hasProperty` list is complete.

use std::collections::HashMap;
use std::fmt;

use cmbs_db::queries::propinfo::{self, OwnerInfoRow, PropertyInfoRow};
use cmbs_db::queries::{deals, holdings};
use cmbs_db::{Fetch, SchemaDrift, SourceDb};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{debug, info, warn};

use crate::error::CmbsResult;
use crate::flatten::{FlatView, PropertyFacts};
use crate::model::{GraphDocument, Literal, Node, NodeKey, NodeKind, Sentinel};

pub const REL_HAS_PROPERTY: &str = "hasProperty";
pub const REL_PART_OF_DEAL: &str = "partOfDeal";
pub const REL_LOCATED_AT: &str = "locatedAt";
pub const REL_BUILT_AT: &str = "builtAt";
pub const REL_PROPERTY_TYPE: &str = "propertyType";
pub const REL_IN_MSA: &str = "inMsa";
pub const REL_NAMED_AS: &str = "namedAs";
pub const REL_OWNED_BY: &str = "ownedBy";

/// Kind of node a relation built here points at.
pub fn relation_target_kind(relation: &str) -> Option<NodeKind> {
    match relation {
        REL_HAS_PROPERTY => Some(NodeKind::Property),
        REL_PART_OF_DEAL => Some(NodeKind::Deal),
        REL_LOCATED_AT => Some(NodeKind::Address),
        REL_BUILT_AT => Some(NodeKind::YearBuilt),
        REL_PROPERTY_TYPE => Some(NodeKind::PropertyType),
        REL_IN_MSA => Some(NodeKind::Msa),
        REL_NAMED_AS => Some(NodeKind::PropertyName),
        REL_OWNED_BY => Some(NodeKind::Owner),
        _ => None,
    }
}

/// Characters escaped inside Property identifier components.
const ID_COMPONENT: &AsciiSet = &CONTROLS.add(b':').add(b'%');

/// Deal-level facts resolved for one CUSIP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealFacts {
    pub deal_id: String,
    pub cusip: String,
    pub display_name: Option<String>,
    pub issuer_name: Option<String>,
}

/// Why a CUSIP produced no graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NotApplicableReason {
    NoDeal,
    NoneDeal,
    SchemaMismatch(SchemaDrift),
}

impl fmt::Display for NotApplicableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotApplicableReason::NoDeal => f.write_str("no deal_id found"),
            NotApplicableReason::NoneDeal => f.write_str("deal_id is 'none'"),
            NotApplicableReason::SchemaMismatch(drift) => write!(f, "{}", drift),
        }
    }
}

/// The graph and its flattened views for one security.
#[derive(Debug, Clone)]
pub struct SecurityExport {
    pub cusip: String,
    pub deal_id: String,
    pub document: GraphDocument,
    pub flat: FlatView,
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Built(SecurityExport),
    NotApplicable { cusip: String, reason: NotApplicableReason },
}

/// Build the graph of one security from the snapshot.
///
/// A CUSIP without a deal is a normal outcome, not an error. A fatal database
/// fault aborts the build and nothing of it is kept.
pub fn build_graph_for_security(db: &SourceDb, cusip: &str) -> CmbsResult<BuildOutcome> {
    let deal_id = match deals::find_deal_id_for_security(db, cusip)? {
        Fetch::Found(id) if id.eq_ignore_ascii_case("none") => {
            return Ok(not_applicable(cusip, NotApplicableReason::NoneDeal));
        }
        Fetch::Found(id) => id,
        Fetch::NotFound => return Ok(not_applicable(cusip, NotApplicableReason::NoDeal)),
        Fetch::SchemaMismatch(drift) => {
            return Ok(not_applicable(cusip, NotApplicableReason::SchemaMismatch(drift)));
        }
    };

    let issuer_name = holdings::find_issuer_name_for_security(db, cusip)?.found();
    let display_name = deals::find_display_name_for_deal(db, &deal_id)?.found();
    if display_name.is_none() {
        debug!(deal_id = %deal_id, "No display name found for deal");
    }

    let properties = propinfo::list_property_info_for_deal(db, &deal_id)?.into_rows();
    let owners = propinfo::list_owner_info_for_deal(db, &deal_id)?.into_rows();
    if properties.is_empty() {
        warn!(deal_id = %deal_id, "No property information found for deal");
    }

    let facts = DealFacts {
        deal_id,
        cusip: cusip.to_string(),
        display_name,
        issuer_name,
    };

    assemble(&facts, &properties, &owners).map(BuildOutcome::Built)
}

fn not_applicable(cusip: &str, reason: NotApplicableReason) -> BuildOutcome {
    info!(cusip, reason = %reason, "Security has no graph");
    BuildOutcome::NotApplicable {
        cusip: cusip.to_string(),
        reason,
    }
}

/// Assemble the document and flattened views from already-fetched rows.
///
/// Owners pair with property rows by position; a property without a matching
/// owner row is owned by `UnknownOwner`.
pub fn assemble(
    deal: &DealFacts,
    properties: &[PropertyInfoRow],
    owners: &[OwnerInfoRow],
) -> CmbsResult<SecurityExport> {
    let mut graph = Assembler::default();
    let mut flat = FlatView::new();

    let mut deal_node = Node::new(NodeKind::Deal, deal.deal_id.clone())
        .with_literal("dealId", Literal::Text(deal.deal_id.clone()))
        .with_literal("displayName", Literal::text_or(deal.display_name.as_deref(), Sentinel::None))
        .with_literal("cusip", Literal::Text(deal.cusip.clone()))
        .with_literal("issuerName", Literal::text_or(deal.issuer_name.as_deref(), Sentinel::None));

    let no_owner = OwnerInfoRow::default();
    for (idx, row) in properties.iter().enumerate() {
        let owner = owners.get(idx).unwrap_or(&no_owner);
        let address_key = address_key(row);

        let property_id = property_id(&deal.deal_id, address_key.as_deref());
        let address_id = graph.attribute(NodeKind::Address, address_key.as_deref(), None);
        let year_built_id = graph.attribute(
            NodeKind::YearBuilt,
            row.year_built.as_deref(),
            Some(Literal::number_or_text(row.year_built.as_deref(), Sentinel::UnknownYearBuilt)),
        );
        let property_type_id = graph.attribute(NodeKind::PropertyType, row.property_type.as_deref(), None);
        let msa_id = graph.attribute(NodeKind::Msa, row.msa.as_deref(), None);
        let name_id = graph.attribute(NodeKind::PropertyName, row.property_name.as_deref(), None);
        let owner_id = graph.owner(owner);

        let mut property = Node::new(NodeKind::Property, property_id.clone())
            .with_literal("address", Literal::text_or(address_key.as_deref(), Sentinel::UnknownAddress));
        property.link(REL_LOCATED_AT, address_id.clone());
        property.link(REL_BUILT_AT, year_built_id.clone());
        property.link(REL_PROPERTY_TYPE, property_type_id.clone());
        property.link(REL_IN_MSA, msa_id);
        property.link(REL_NAMED_AS, name_id);
        property.link(REL_OWNED_BY, owner_id);
        property.link(REL_PART_OF_DEAL, deal.deal_id.clone());
        graph.upsert(property);

        deal_node.push_link(REL_HAS_PROPERTY, property_id.clone());

        flat.record(&PropertyFacts {
            deal_id: deal.deal_id.clone(),
            cusip: deal.cusip.clone(),
            display_name: or_sentinel(deal.display_name.as_deref(), Sentinel::None),
            property_name: or_sentinel(row.property_name.as_deref(), Sentinel::UnknownPropertyName),
            address: or_sentinel(address_key.as_deref(), Sentinel::UnknownAddress),
            msa: or_sentinel(row.msa.as_deref(), Sentinel::UnknownMsa),
            year_built: or_sentinel(row.year_built.as_deref(), Sentinel::UnknownYearBuilt),
            property_type: or_sentinel(row.property_type.as_deref(), Sentinel::UnknownPropertyType),
            property_id,
            address_id,
            year_built_id,
            property_type_id,
        });
    }

    graph.upsert(deal_node);
    let document = graph.finish();
    document.check_closure()?;

    debug!(
        deal_id = %deal.deal_id,
        nodes = document.len(),
        rows = properties.len(),
        "Assembled security graph"
    );

    Ok(SecurityExport {
        cusip: deal.cusip.clone(),
        deal_id: deal.deal_id.clone(),
        document,
        flat,
    })
}

/// `address, state` when both are present, the address alone otherwise.
pub fn address_key(row: &PropertyInfoRow) -> Option<String> {
    match (&row.address, &row.state) {
        (Some(address), Some(state)) => Some(format!("{}, {}", address, state)),
        (Some(address), None) => Some(address.clone()),
        (None, _) => None,
    }
}

/// `property:<deal>:<address key>` with `:` and `%` escaped in both parts.
pub fn property_id(deal_id: &str, address_key: Option<&str>) -> String {
    let address = address_key.unwrap_or(Sentinel::UnknownAddress.as_str());
    format!(
        "property:{}:{}",
        utf8_percent_encode(deal_id, ID_COMPONENT),
        utf8_percent_encode(address, ID_COMPONENT)
    )
}

/// Identifier of an attribute node. Addresses use the bare value, other
/// kinds a kind prefix; absent values use the kind's `Unknown` sentinel.
pub fn attribute_id(kind: NodeKind, value: Option<&str>) -> String {
    let prefix = match kind {
        NodeKind::YearBuilt => "yearbuilt:",
        NodeKind::PropertyType => "proptype:",
        NodeKind::Msa => "msa:",
        NodeKind::PropertyName => "propname:",
        NodeKind::Owner => "owner:",
        NodeKind::Address | NodeKind::Deal | NodeKind::Property => "",
    };
    match (value, kind.unknown()) {
        (Some(v), _) => format!("{}{}", prefix, v),
        (None, Some(sentinel)) => sentinel.as_str().to_string(),
        (None, None) => Sentinel::None.as_str().to_string(),
    }
}

fn or_sentinel(value: Option<&str>, sentinel: Sentinel) -> String {
    value.unwrap_or(sentinel.as_str()).to_string()
}

/// Node list with (label, id) de-duplication, kept in first-insert order.
#[derive(Default)]
struct Assembler {
    nodes: Vec<Node>,
    index: HashMap<NodeKey, usize>,
}

impl Assembler {
    fn upsert(&mut self, node: Node) {
        let key = node.key();
        match self.index.get(&key) {
            Some(&pos) => self.nodes[pos].merge_from(node),
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Create or reuse an attribute node and return its id.
    fn attribute(&mut self, kind: NodeKind, value: Option<&str>, literal: Option<Literal>) -> String {
        let id = attribute_id(kind, value);
        let sentinel = kind.unknown().unwrap_or(Sentinel::None);
        let literal = literal.unwrap_or_else(|| Literal::text_or(value, sentinel));
        self.upsert(Node::new(kind, id.clone()).with_literal("value", literal));
        id
    }

    fn owner(&mut self, owner: &OwnerInfoRow) -> String {
        let id = attribute_id(NodeKind::Owner, owner.owner_name.as_deref());
        self.upsert(
            Node::new(NodeKind::Owner, id.clone())
                .with_literal(
                    "ownerName",
                    Literal::text_or(owner.owner_name.as_deref(), Sentinel::UnknownOwner),
                )
                .with_literal(
                    "ownerType",
                    Literal::text_or(owner.owner_type.as_deref(), Sentinel::UnknownType),
                ),
        );
        id
    }

    fn finish(self) -> GraphDocument {
        let mut document = GraphDocument::new();
        document.nodes = self.nodes;
        document
    }
}
