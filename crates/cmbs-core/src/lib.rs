//! CMBS Core Library
//!
//! Turns the rows of a CMBS snapshot into a linked-data graph per security and
//! re-expresses that graph as JSON-LD, as a Cypher mutation script and as
//! flattened sentences and vertex/edge tables.

pub mod builder;
pub mod config;
pub mod cypher;
pub mod error;
pub mod export;
pub mod flatten;
pub mod jsonld;
pub mod model;

pub use builder::{build_graph_for_security, BuildOutcome, NotApplicableReason, SecurityExport};
pub use config::{CmbsConfig, GraphConfig, LoadMode};
pub use error::{CmbsError, CmbsResult};
pub use model::{GraphDocument, Literal, Node, NodeKey, NodeKind, Reference, Sentinel};

#[cfg(test)]
pub(crate) use cmbs_db::queries::fixtures as test_support;
