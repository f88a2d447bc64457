//! Tree node representation
//!
//! Uses NodeId (u32) for compact references into the document arena. The
//! child-ownership edges are `first_child`/`last_child`; `parent` and the
//! sibling links are plain indices that never own anything.

use crate::core::span::Span;

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root, a pure container
    Document,
    /// Comment; its value aliases the text buffer
    Comment,
}

/// A node in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the root and for detached nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Content span in the text buffer (empty for containers)
    pub value: Span,
}

impl Node {
    fn new(kind: NodeKind, value: Span) -> Self {
        Node {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            value,
        }
    }

    /// Create the document root node
    pub fn document() -> Self {
        Node::new(NodeKind::Document, Span::empty())
    }

    /// Create a detached comment node; its value is filled in by the deep parse
    pub fn comment() -> Self {
        Node::new(NodeKind::Comment, Span::empty())
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Not linked into any tree (the root never counts as detached)
    #[inline]
    pub fn is_detached(&self) -> bool {
        self.kind != NodeKind::Document && self.parent.is_none()
    }
}
