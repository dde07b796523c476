//! Graph domain model.

pub mod document;
pub mod node;

pub use document::{Edge, GraphDocument, CONTEXT};
pub use node::{Literal, Node, NodeKey, NodeKind, Reference, Sentinel};
