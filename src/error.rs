//! Parse and tree errors
//!
//! Every parse step reports a distinguishable failure kind and, where one
//! applies, the byte offset into the input where it was detected.

use thiserror::Error;

use crate::core::dispatch::Construct;
use crate::dom::NodeId;

/// Failure while linking or unlinking nodes in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("the document root cannot be attached to another node")]
    RootNotAttachable,

    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("attaching node {child} under node {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Failure while parsing a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("{construct} body at byte {offset} is never closed")]
    UnterminatedConstruct { construct: Construct, offset: usize },

    #[error("unrecognized construct at byte {offset}")]
    UnrecognizedConstruct { offset: usize },

    #[error("{construct} at byte {offset} is not supported")]
    UnsupportedConstruct { construct: Construct, offset: usize },

    #[error("could not allocate {requested} bytes for the text buffer")]
    AllocationFailed { requested: usize },

    #[error("input of {len} bytes exceeds the addressable buffer size")]
    InputTooLarge { len: usize },

    #[error("document exceeds the limit of {limit} nodes")]
    TooManyNodes { limit: usize },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ParseError {
    /// Stable snake_case name of the failure kind (used for NIF error atoms)
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::EmptyDocument => "empty_document",
            ParseError::UnexpectedEnd { .. } => "unexpected_end",
            ParseError::UnterminatedConstruct { .. } => "unterminated_construct",
            ParseError::UnrecognizedConstruct { .. } => "unrecognized_construct",
            ParseError::UnsupportedConstruct { .. } => "unsupported_construct",
            ParseError::AllocationFailed { .. } => "allocation_failed",
            ParseError::InputTooLarge { .. } => "input_too_large",
            ParseError::TooManyNodes { .. } => "too_many_nodes",
            ParseError::Tree(_) => "tree",
        }
    }

    /// Byte offset into the input where the failure was detected
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ParseError::UnexpectedEnd { offset }
            | ParseError::UnterminatedConstruct { offset, .. }
            | ParseError::UnrecognizedConstruct { offset }
            | ParseError::UnsupportedConstruct { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_offset() {
        let err = ParseError::UnterminatedConstruct {
            construct: Construct::Comment,
            offset: 3,
        };
        assert_eq!(err.kind(), "unterminated_construct");
        assert_eq!(err.offset(), Some(3));
        assert_eq!(err.to_string(), "comment body at byte 3 is never closed");

        assert_eq!(ParseError::EmptyDocument.offset(), None);
    }

    #[test]
    fn test_tree_error_converts() {
        let err: ParseError = TreeError::AlreadyAttached(4).into();
        assert_eq!(err.kind(), "tree");
        assert_eq!(err.to_string(), "node 4 already has a parent");
    }
}
