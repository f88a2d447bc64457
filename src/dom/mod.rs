//! DOM Module - Arena-based document tree
//!
//! Implements the parsed tree as:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for parent/child/sibling links
//! - Spans into the document's own text buffer for node values

pub mod document;
pub mod node;

pub use document::{Document, Teardown, ROOT};
pub use node::{Node, NodeId, NodeKind};
