//! Flattened views of a security's graph: one sentence per property row and
//! pipe-delimited vertex/edge tables.
//!
//! Rows are recorded by the builder from the same facts it turns into nodes,
//! so the tables always agree with the graph document.

/// Header of the vertex table.
pub const VERTEX_HEADER: [&str; 7] = [
    "deal_id",
    "display_name",
    "cusip",
    "property_id",
    "address_id",
    "year_built_id",
    "property_type_id",
];

/// Header of the edge table.
pub const EDGE_HEADER: [&str; 3] = ["parent", "relation", "child"];

pub const REL_HAS_PROPERTY: &str = "hasProperty";
pub const REL_LOCATED_AT: &str = "locatedAt";
pub const REL_IS_USED_AS: &str = "isUsedAs";

/// Per-property facts, already rendered with sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFacts {
    pub deal_id: String,
    pub cusip: String,
    pub display_name: String,
    pub property_name: String,
    pub address: String,
    pub msa: String,
    pub year_built: String,
    pub property_type: String,
    pub property_id: String,
    pub address_id: String,
    pub year_built_id: String,
    pub property_type_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRow {
    pub parent: String,
    pub relation: &'static str,
    pub child: String,
}

/// Accumulated flattened output of one security.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatView {
    pub sentences: Vec<String>,
    pub vertices: Vec<[String; 7]>,
    pub edges: Vec<EdgeRow>,
}

impl FlatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the sentence, vertex row and edge rows of one property row.
    pub fn record(&mut self, facts: &PropertyFacts) {
        self.sentences.push(sentence(facts));

        self.vertices.push([
            facts.deal_id.clone(),
            facts.display_name.clone(),
            facts.cusip.clone(),
            facts.property_id.clone(),
            facts.address_id.clone(),
            facts.year_built_id.clone(),
            facts.property_type_id.clone(),
        ]);

        self.edges.push(EdgeRow {
            parent: facts.deal_id.clone(),
            relation: REL_HAS_PROPERTY,
            child: facts.property_id.clone(),
        });
        self.edges.push(EdgeRow {
            parent: facts.property_id.clone(),
            relation: REL_LOCATED_AT,
            child: facts.address_id.clone(),
        });
        self.edges.push(EdgeRow {
            parent: facts.property_id.clone(),
            relation: REL_IS_USED_AS,
            child: facts.property_type_id.clone(),
        });
    }

    /// Sentences, one per line.
    pub fn sentences_text(&self) -> String {
        let mut out = String::new();
        for sentence in &self.sentences {
            out.push_str(sentence);
            out.push('\n');
        }
        out
    }

    /// Vertex table with header.
    pub fn vertex_table(&self) -> String {
        let mut out = pipe_row(VERTEX_HEADER.iter().copied());
        for row in &self.vertices {
            out.push_str(&pipe_row(row.iter().map(String::as_str)));
        }
        out
    }

    /// Edge table with header.
    pub fn edge_table(&self) -> String {
        let mut out = pipe_row(EDGE_HEADER.iter().copied());
        for edge in &self.edges {
            out.push_str(&pipe_row([edge.parent.as_str(), edge.relation, edge.child.as_str()].into_iter()));
        }
        out
    }
}

/// The natural-language form of one property row.
pub fn sentence(facts: &PropertyFacts) -> String {
    format!(
        "the deal {} has cusip:{}, the name of this security is {}, the property name is {}, \
         located at {}, in the msa {}, built in {}, used as {}",
        facts.deal_id,
        facts.cusip,
        facts.display_name,
        facts.property_name,
        facts.address,
        facts.msa,
        facts.year_built,
        facts.property_type,
    )
}

fn pipe_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = cells.map(clean_cell).collect::<Vec<_>>().join("|");
    line.push('\n');
    line
}

/// Delimiters and line breaks inside a cell become spaces.
fn clean_cell(cell: &str) -> String {
    cell.chars()
        .map(|c| if matches!(c, '|' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> PropertyFacts {
        PropertyFacts {
            deal_id: "14".into(),
            cusip: "05591XAE1".into(),
            display_name: "SAMPLE CMBS 2014-1".into(),
            property_name: "Main Tower".into(),
            address: "100 Main St, TX".into(),
            msa: "Dallas".into(),
            year_built: "1999".into(),
            property_type: "Office".into(),
            property_id: "property:14:100 Main St, TX".into(),
            address_id: "100 Main St, TX".into(),
            year_built_id: "yearbuilt:1999".into(),
            property_type_id: "proptype:Office".into(),
        }
    }

    #[test]
    fn test_sentence_slot_order() {
        let s = sentence(&facts());
        assert_eq!(
            s,
            "the deal 14 has cusip:05591XAE1, the name of this security is SAMPLE CMBS 2014-1, \
             the property name is Main Tower, located at 100 Main St, TX, in the msa Dallas, \
             built in 1999, used as Office"
        );
    }

    #[test]
    fn test_tables() {
        let mut view = FlatView::new();
        view.record(&facts());

        let vertices = view.vertex_table();
        let lines: Vec<_> = vertices.lines().collect();
        assert_eq!(lines[0], "deal_id|display_name|cusip|property_id|address_id|year_built_id|property_type_id");
        assert_eq!(
            lines[1],
            "14|SAMPLE CMBS 2014-1|05591XAE1|property:14:100 Main St, TX|100 Main St, TX|yearbuilt:1999|proptype:Office"
        );

        let edges = view.edge_table();
        let lines: Vec<_> = edges.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "parent|relation|child");
        assert_eq!(lines[1], "14|hasProperty|property:14:100 Main St, TX");
        assert_eq!(lines[3], "property:14:100 Main St, TX|isUsedAs|proptype:Office");
    }

    #[test]
    fn test_cells_cannot_break_rows() {
        let mut f = facts();
        f.display_name = "A|B\nC".into();
        let mut view = FlatView::new();
        view.record(&f);
        assert!(view.vertex_table().lines().nth(1).unwrap().starts_with("14|A B C|"));
    }
}
