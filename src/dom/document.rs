//! Document - arena-based tree over an owned text buffer
//!
//! The document owns both the text buffer and every node. Nodes refer into
//! the buffer through spans, and the only way to reach a node is through its
//! document, so no node can observe the buffer after it is released:
//! - Arena allocation for nodes, addressed by NodeId
//! - Released slots recycled through a free list
//! - Iterative (explicit stack) traversal and teardown

use std::io::{self, Write};

use log::{debug, trace, warn};

use super::node::{Node, NodeId, NodeKind};
use crate::core::buffer::Buffer;
use crate::core::dispatch::{self, Construct, Identified};
use crate::core::scanner::{self, skip_whitespace};
use crate::core::span::Span;
use crate::error::{ParseError, TreeError};
use crate::options::ParseOptions;

/// NodeId of the document root
pub const ROOT: NodeId = 0;

/// Line prefix written once per depth level
const INDENT: &[u8] = b"    ";

const COMMENT_OPEN: &[u8] = b"<!--";
const COMMENT_CLOSE: &[u8] = b"-->";

/// What a teardown released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Teardown {
    /// Non-root nodes released, each exactly once
    pub nodes_released: usize,
    /// Whether a text buffer was released
    pub buffer_released: bool,
}

/// A parsed document: the text buffer plus the node tree that refers into it
#[derive(Debug)]
pub struct Document {
    options: ParseOptions,
    /// Source text, split in place by the scanner
    buffer: Option<Buffer>,
    /// Arena of nodes; `None` marks a released slot
    nodes: Vec<Option<Node>>,
    /// Released slots available for reuse
    free: Vec<NodeId>,
    /// Live nodes, root included
    live: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: a root node, no buffer
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Document {
            options,
            buffer: None,
            nodes: vec![Some(Node::document())],
            free: Vec::new(),
            live: 1,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// Parse `text` into this document.
    ///
    /// Any previous tree and buffer are released first. Top-level constructs
    /// are parsed in order until only whitespace remains. On failure the
    /// constructs parsed before the failing one stay attached under the root
    /// and the first failure is returned.
    pub fn parse(&mut self, text: impl AsRef<[u8]>) -> Result<(), ParseError> {
        let text = text.as_ref();
        self.clear();

        debug!("parsing {} bytes", text.len());
        self.buffer = Some(Buffer::construct(text)?);

        let result = self.parse_constructs();
        match &result {
            Ok(()) => debug!("parsed {} nodes", self.live - 1),
            Err(err) => warn!(
                "parse failed ({}) at {:?} after {} nodes: {}",
                err.kind(),
                err.offset(),
                self.live - 1,
                err
            ),
        }
        result
    }

    fn parse_constructs(&mut self) -> Result<(), ParseError> {
        let mut pos = 0;
        let mut parsed = 0usize;

        loop {
            match skip_whitespace(self.bytes(), pos) {
                Some(next) => pos = next,
                None => break,
            }

            let (node, found) = self.identify(pos)?;
            let next = match self.parse_deep(node, found.body) {
                Ok(next) => next,
                Err(err) => {
                    self.discard(node)?;
                    return Err(err);
                }
            };
            self.insert_end_child(ROOT, node)?;

            pos = next;
            parsed += 1;
        }

        if parsed == 0 {
            return Err(ParseError::EmptyDocument);
        }
        Ok(())
    }

    /// Identify the construct at `pos` and create a detached node for it.
    ///
    /// The caller owns the returned node: it must be attached with
    /// [`insert_end_child`](Self::insert_end_child) or released with
    /// [`discard`](Self::discard).
    pub fn identify(&mut self, pos: usize) -> Result<(NodeId, Identified), ParseError> {
        let buffer = self.buffer.as_ref().ok_or(ParseError::EmptyDocument)?;
        let found = dispatch::identify(buffer.as_bytes(), pos)?;
        trace!("{} at byte {}", found.construct, found.start);

        match found.construct {
            Construct::Comment => {
                let id = self.alloc(Node::comment())?;
                Ok((id, found))
            }
            Construct::Unknown => Err(ParseError::UnrecognizedConstruct {
                offset: found.start,
            }),
            other => Err(ParseError::UnsupportedConstruct {
                construct: other,
                offset: found.start,
            }),
        }
    }

    /// Parse the body of node `id` starting at `pos`.
    ///
    /// Returns the position just past the construct. The scan splits the
    /// buffer in place, so a body can be parsed only once.
    pub fn parse_deep(&mut self, id: NodeId, pos: usize) -> Result<usize, ParseError> {
        let kind = self.get_node(id).ok_or(TreeError::UnknownNode(id))?.kind;

        match kind {
            NodeKind::Comment => {
                let mode = self.options.whitespace;
                let buffer = self
                    .buffer
                    .as_mut()
                    .ok_or(ParseError::UnexpectedEnd { offset: pos })?;
                let split = scanner::parse_text(buffer.as_bytes_mut(), pos, COMMENT_CLOSE, mode)
                    .ok_or(ParseError::UnterminatedConstruct {
                        construct: Construct::Comment,
                        offset: pos,
                    })?;

                self.node_mut(id)?.value = split.content;
                Ok(split.next)
            }
            // Containers have no body of their own
            NodeKind::Document => Ok(pos),
        }
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    /// Append `child` as the last child of `parent`.
    ///
    /// O(1) through the tracked `last_child`; a child that has children of
    /// its own additionally costs a walk up from `parent` to rule out a
    /// cycle. `child` must be detached. Returns `child` to allow chaining.
    pub fn insert_end_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, TreeError> {
        let child_node = self.get_node(child).ok_or(TreeError::UnknownNode(child))?;
        if child_node.kind == NodeKind::Document {
            return Err(TreeError::RootNotAttachable);
        }
        if child_node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        // A leaf can only be its own ancestor, which keeps the common case O(1)
        let child_has_children = child_node.has_children();
        if self.get_node(parent).is_none() {
            return Err(TreeError::UnknownNode(parent));
        }
        if parent == child
            || (child_has_children && self.ancestors_and_self(parent).any(|id| id == child))
        {
            return Err(TreeError::WouldCycle { parent, child });
        }

        let last = self.node_mut(parent)?.last_child;
        if let Some(last_id) = last {
            debug_assert!(self.get_node(parent).is_some_and(|n| n.first_child.is_some()));
            let last_node = self.node_mut(last_id)?;
            debug_assert!(last_node.next_sibling.is_none());
            last_node.next_sibling = Some(child);
        } else {
            self.node_mut(parent)?.first_child = Some(child);
        }
        self.node_mut(parent)?.last_child = Some(child);

        let node = self.node_mut(child)?;
        node.parent = Some(parent);
        node.prev_sibling = last;
        node.next_sibling = None;

        Ok(child)
    }

    /// Unlink `child` from `parent` and release it with its whole subtree
    pub fn delete_child(&mut self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        let node = self.get_node(child).ok_or(TreeError::UnknownNode(child))?;
        if node.parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.unlink(child)?;
        Ok(self.release_subtree(child))
    }

    /// Release every child of `parent`; returns the number of nodes released
    pub fn delete_children(&mut self, parent: NodeId) -> Result<usize, TreeError> {
        let children: Vec<NodeId> = self.children(parent).collect();
        let mut released = 0;
        for child in children {
            released += self.delete_child(parent, child)?;
        }
        Ok(released)
    }

    /// Release a detached node together with its subtree
    pub fn discard(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let node = self.get_node(id).ok_or(TreeError::UnknownNode(id))?;
        if node.kind == NodeKind::Document {
            return Err(TreeError::RootNotAttachable);
        }
        if node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(id));
        }
        Ok(self.release_subtree(id))
    }

    /// Release every node (children before parents), then the buffer.
    ///
    /// The root survives, so the document can be parsed into again.
    pub fn clear(&mut self) -> Teardown {
        // Attached nodes first, then anything identified but never attached
        let mut tops: Vec<NodeId> = self.children(ROOT).collect();
        tops.extend(self.detached_ids());

        let mut nodes_released = 0;
        for top in tops {
            nodes_released += self.release_subtree(top);
        }

        if let Some(root) = self.nodes.first_mut().and_then(Option::as_mut) {
            root.first_child = None;
            root.last_child = None;
        }
        self.nodes.truncate(1);
        self.free.clear();
        debug_assert_eq!(self.live, 1);

        let buffer_released = self.buffer.take().is_some();
        if nodes_released > 0 || buffer_released {
            debug!(
                "released {} nodes, buffer released: {}",
                nodes_released, buffer_released
            );
        }

        Teardown {
            nodes_released,
            buffer_released,
        }
    }

    fn alloc(&mut self, node: Node) -> Result<NodeId, ParseError> {
        if let Some(limit) = self.options.max_nodes {
            if self.live >= limit {
                return Err(ParseError::TooManyNodes { limit });
            }
        }

        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id as usize] = Some(node);
                id
            }
            None => {
                let id = NodeId::try_from(self.nodes.len()).map_err(|_| ParseError::TooManyNodes {
                    limit: NodeId::MAX as usize,
                })?;
                self.nodes.push(Some(node));
                id
            }
        };
        self.live += 1;
        Ok(id)
    }

    /// Detach `id` from its parent and siblings, keeping its own children
    fn unlink(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        let parent = node.parent.take();
        let prev = node.prev_sibling.take();
        let next = node.next_sibling.take();

        match prev {
            Some(prev_id) => self.node_mut(prev_id)?.next_sibling = next,
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id)?.first_child = next;
                }
            }
        }
        match next {
            Some(next_id) => self.node_mut(next_id)?.prev_sibling = prev,
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id)?.last_child = prev;
                }
            }
        }
        Ok(())
    }

    /// Release `id` and its descendants post-order; returns the count
    fn release_subtree(&mut self, id: NodeId) -> usize {
        let order: Vec<NodeId> = self.post_order(id).collect();
        let mut released = 0;
        for node_id in order {
            if self.release(node_id) {
                released += 1;
            }
        }
        released
    }

    fn release(&mut self, id: NodeId) -> bool {
        if id == ROOT {
            return false;
        }
        match self.nodes.get_mut(id as usize).and_then(Option::take) {
            Some(_) => {
                self.free.push(id);
                self.live -= 1;
                true
            }
            None => false,
        }
    }

    fn detached_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Some(node) if node.is_detached() => Some(i as NodeId),
                _ => None,
            })
            .collect()
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// The document root node ID
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize).and_then(Option::as_ref)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// The text buffer, if a parse has run
    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    /// Length of the parsed input in bytes
    pub fn buffer_len(&self) -> Option<usize> {
        self.buffer.as_ref().map(Buffer::len)
    }

    /// Raw value bytes of a node (zero-copy view into the buffer)
    pub fn value_bytes(&self, id: NodeId) -> Option<&[u8]> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Comment => Some(self.slice(node.value)),
            NodeKind::Document => None,
        }
    }

    /// Value of a node as UTF-8
    pub fn value(&self, id: NodeId) -> Option<&str> {
        std::str::from_utf8(self.value_bytes(id)?).ok()
    }

    /// Values of the top-level comments, in document order
    pub fn comments(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.children(ROOT)
            .filter(|&id| self.kind(id) == Some(NodeKind::Comment))
            .filter_map(|id| self.value_bytes(id))
    }

    fn bytes(&self) -> &[u8] {
        self.buffer.as_ref().map(Buffer::as_bytes).unwrap_or(&[])
    }

    fn slice(&self, span: Span) -> &[u8] {
        span.slice(self.bytes())
    }

    /// Iterate over children of a node, first to last
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Iterate over children of a node, last to first
    pub fn children_rev(&self, id: NodeId) -> ChildRevIter<'_> {
        ChildRevIter {
            doc: self,
            next: self.last_child(id),
        }
    }

    /// Iterate over all descendants of a node (pre-order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        // Initialize stack with all children in reverse order (so first is processed first)
        let mut stack = Vec::new();
        self.push_children(id, &mut stack);
        DescendantIter { doc: self, stack }
    }

    /// Iterate over a node and its descendants, children before parents
    pub fn post_order(&self, id: NodeId) -> PostOrderIter<'_> {
        let stack = if self.get_node(id).is_some() {
            vec![(id, false)]
        } else {
            Vec::new()
        };
        PostOrderIter { doc: self, stack }
    }

    fn ancestors_and_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&cur| self.parent(cur))
    }

    fn push_children(&self, id: NodeId, stack: &mut Vec<NodeId>) {
        let mut child_id = self.last_child(id);
        while let Some(cid) = child_id {
            stack.push(cid);
            child_id = self.prev_sibling(cid);
        }
    }

    // =========================================================================
    // Printing
    // =========================================================================

    /// Write the whole tree; top-level nodes are indented `depth` levels
    pub fn print<W: Write>(&self, out: &mut W, depth: usize) -> io::Result<()> {
        let mut stack: Vec<(NodeId, usize)> = self.children_rev(ROOT).map(|id| (id, depth)).collect();

        while let Some((id, level)) = stack.pop() {
            self.print_node(out, id, level)?;
            stack.extend(self.children_rev(id).map(|child| (child, level + 1)));
        }
        Ok(())
    }

    /// Write a single node, without its children
    pub fn print_node<W: Write>(&self, out: &mut W, id: NodeId, depth: usize) -> io::Result<()> {
        let Some(node) = self.get_node(id) else {
            return Ok(());
        };

        match node.kind {
            NodeKind::Comment => {
                for _ in 0..depth {
                    out.write_all(INDENT)?;
                }
                out.write_all(COMMENT_OPEN)?;
                out.write_all(self.slice(node.value))?;
                out.write_all(COMMENT_CLOSE)?;
                out.write_all(b"\n")
            }
            NodeKind::Document => Ok(()),
        }
    }

    /// Print the tree into a byte vector
    pub fn print_to_vec(&self, depth: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes().len() + 1);
        // Writing into a Vec cannot fail
        let _ = self.print(&mut out, depth);
        out
    }

    /// Print the tree into a string, replacing invalid UTF-8
    pub fn to_string_at(&self, depth: usize) -> String {
        String::from_utf8_lossy(&self.print_to_vec(depth)).into_owned()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over child nodes, last to first
pub struct ChildRevIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildRevIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.prev_sibling(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Add children to stack in reverse order (so first child is processed first)
        self.doc.push_children(current, &mut self.stack);
        Some(current)
    }
}

/// Post-order iterator: every node is yielded after all of its descendants
pub struct PostOrderIter<'d> {
    doc: &'d Document,
    /// (node, children already pushed)
    stack: Vec<(NodeId, bool)>,
}

impl<'d> Iterator for PostOrderIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (current, expanded) = self.stack.pop()?;
            if expanded {
                return Some(current);
            }
            self.stack.push((current, true));
            let mut child_id = self.doc.last_child(current);
            while let Some(cid) = child_id {
                self.stack.push((cid, false));
                child_id = self.doc.prev_sibling(cid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WhitespaceMode;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Parse `count` comments and detach them all, returning their ids in order
    fn detached_comments(doc: &mut Document, count: usize) -> Vec<NodeId> {
        let text: String = (0..count).map(|i| format!("<!--{}-->", i)).collect();
        doc.parse(&text).unwrap();
        let ids: Vec<NodeId> = doc.children(ROOT).collect();
        for &id in &ids {
            doc.unlink(id).unwrap();
        }
        ids
    }

    #[test]
    fn test_round_trip_depth_zero() {
        let mut doc = Document::new();
        doc.parse("<!-- hello -->").unwrap();
        assert_eq!(doc.to_string_at(0), "<!-- hello -->\n");
    }

    #[test]
    fn test_round_trip_depth_one() {
        let mut doc = Document::new();
        doc.parse("<!-- hello -->").unwrap();
        assert_eq!(doc.to_string_at(1), "    <!-- hello -->\n");
    }

    #[rstest]
    #[case("<!--x-->", "x")]
    #[case("<!-- hello -->", " hello ")]
    #[case("<!--  two  spaces\tand tab -->", "  two  spaces\tand tab ")]
    #[case("<!---->", "")]
    #[case("<!--a-b--c-->", "a-b--c")]
    #[case("\n  <!--x-->  \n", "x")]
    fn test_comment_value_is_exact(#[case] input: &str, #[case] expected: &str) {
        let mut doc = Document::new();
        doc.parse(input).unwrap();
        let id = doc.first_child(ROOT).unwrap();
        assert_eq!(doc.kind(id), Some(NodeKind::Comment));
        assert_eq!(doc.value(id), Some(expected));
    }

    #[test]
    fn test_skip_leading_whitespace_once() {
        let opts = ParseOptions::new().with_whitespace(WhitespaceMode::SkipLeading);
        let mut doc = Document::with_options(opts);
        doc.parse("<!--   hello  world  -->").unwrap();
        let id = doc.first_child(ROOT).unwrap();
        assert_eq!(doc.value(id), Some("hello  world  "));
        assert_eq!(doc.to_string_at(0), "<!--hello  world  -->\n");
    }

    #[rstest]
    #[case("<!-- never closed")]
    #[case("<!-- almost --")]
    #[case("<!-- wrong end ->")]
    #[case("<!--")]
    fn test_unterminated_comment_attaches_nothing(#[case] input: &str) {
        let mut doc = Document::new();
        let err = doc.parse(input).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnterminatedConstruct {
                construct: Construct::Comment,
                offset: 4
            }
        ));
        assert_eq!(doc.first_child(ROOT), None);
        assert_eq!(doc.node_count(), 1);
        // The failed scan left the buffer as it was copied
        assert_eq!(doc.buffer().unwrap().as_bytes(), input.as_bytes());
    }

    #[test]
    fn test_multiple_comments_in_order() {
        let mut doc = Document::new();
        doc.parse("<!--a-->\n<!--b--> <!--c-->").unwrap();
        let values: Vec<&[u8]> = doc.comments().collect();
        assert_eq!(values, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(doc.to_string_at(0), "<!--a-->\n<!--b-->\n<!--c-->\n");
    }

    #[test]
    fn test_partial_state_after_failure() {
        let mut doc = Document::new();
        let err = doc.parse("<!--ok--><!--broken").unwrap_err();
        assert_eq!(err.kind(), "unterminated_construct");
        assert_eq!(err.offset(), Some(13));

        let values: Vec<&[u8]> = doc.comments().collect();
        assert_eq!(values, vec![&b"ok"[..]]);
        assert_eq!(doc.node_count(), 2);
    }

    #[rstest]
    #[case("<root/>", Construct::Element)]
    #[case("<![CDATA[x]]>", Construct::CData)]
    #[case("<!DOCTYPE html>", Construct::Dtd)]
    #[case("<?xml version=\"1.0\"?>", Construct::Declaration)]
    fn test_unsupported_constructs(#[case] input: &str, #[case] construct: Construct) {
        let mut doc = Document::new();
        assert_eq!(
            doc.parse(input),
            Err(ParseError::UnsupportedConstruct { construct, offset: 0 })
        );
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_unrecognized_constructs() {
        let mut doc = Document::new();
        assert_eq!(
            doc.parse("<1>"),
            Err(ParseError::UnrecognizedConstruct { offset: 0 })
        );
        assert_eq!(
            doc.parse("<!--a--> text"),
            Err(ParseError::UnrecognizedConstruct { offset: 9 })
        );
        assert_eq!(doc.comments().count(), 1);
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t ")]
    fn test_empty_document(#[case] input: &str) {
        let mut doc = Document::new();
        assert_eq!(doc.parse(input), Err(ParseError::EmptyDocument));
        assert_eq!(doc.buffer_len(), Some(input.len()));
    }

    #[test]
    fn test_reparse_releases_previous_tree() {
        let mut doc = Document::new();
        doc.parse("<!--a--><!--b-->").unwrap();
        assert_eq!(doc.node_count(), 3);
        doc.parse("<!--c-->").unwrap();
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.to_string_at(0), "<!--c-->\n");
    }

    #[test]
    fn test_max_nodes() {
        let mut doc = Document::with_options(ParseOptions::new().with_max_nodes(3));
        let err = doc.parse("<!--a--><!--b--><!--c-->").unwrap_err();
        assert_eq!(err, ParseError::TooManyNodes { limit: 3 });
        assert_eq!(doc.comments().count(), 2);
    }

    #[test]
    fn test_value_aliases_buffer() {
        let mut doc = Document::new();
        doc.parse("<!--abc-->").unwrap();
        let id = doc.first_child(ROOT).unwrap();
        let buffer = doc.buffer().unwrap().as_bytes().as_ptr_range();
        let value = doc.value_bytes(id).unwrap().as_ptr();
        assert!(buffer.contains(&value));
        // The marker's first byte became the terminator
        assert_eq!(&doc.buffer().unwrap().as_bytes()[7..], b"\0->");
    }

    #[test]
    fn test_insert_end_child_forward_and_reverse_order() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 5);
        assert_eq!(doc.first_child(ROOT), None);

        for &id in &ids {
            assert_eq!(doc.insert_end_child(ROOT, id), Ok(id));
        }

        let forward: Vec<NodeId> = doc.children(ROOT).collect();
        assert_eq!(forward, ids);

        let reverse: Vec<NodeId> = doc.children_rev(ROOT).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(reverse, expected);

        assert_eq!(doc.prev_sibling(ids[0]), None);
        assert_eq!(doc.next_sibling(ids[4]), None);
        for pair in ids.windows(2) {
            assert_eq!(doc.next_sibling(pair[0]), Some(pair[1]));
            assert_eq!(doc.prev_sibling(pair[1]), Some(pair[0]));
        }
        for &id in &ids {
            assert_eq!(doc.parent(id), Some(ROOT));
        }
    }

    #[test]
    fn test_insert_end_child_rejects_invalid_links() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        assert_eq!(doc.insert_end_child(a, ROOT), Err(TreeError::RootNotAttachable));
        assert_eq!(doc.insert_end_child(ROOT, 99), Err(TreeError::UnknownNode(99)));
        assert_eq!(doc.insert_end_child(99, a), Err(TreeError::UnknownNode(99)));
        assert_eq!(
            doc.insert_end_child(a, a),
            Err(TreeError::WouldCycle { parent: a, child: a })
        );

        doc.insert_end_child(a, b).unwrap();
        doc.insert_end_child(b, c).unwrap();
        assert_eq!(doc.insert_end_child(ROOT, b), Err(TreeError::AlreadyAttached(b)));
        assert_eq!(
            doc.insert_end_child(c, a),
            Err(TreeError::WouldCycle { parent: c, child: a })
        );
    }

    #[test]
    fn test_nested_print() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 4);
        doc.insert_end_child(ROOT, ids[0]).unwrap();
        doc.insert_end_child(ids[0], ids[1]).unwrap();
        doc.insert_end_child(ids[1], ids[2]).unwrap();
        doc.insert_end_child(ROOT, ids[3]).unwrap();

        let expected = concat!(
            "    <!--0-->\n",
            "        <!--1-->\n",
            "            <!--2-->\n",
            "    <!--3-->\n",
        );
        assert_eq!(doc.to_string_at(1), expected);
    }

    #[test]
    fn test_descendants_and_post_order() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 4);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        doc.insert_end_child(ROOT, a).unwrap();
        doc.insert_end_child(a, b).unwrap();
        doc.insert_end_child(b, c).unwrap();
        doc.insert_end_child(a, d).unwrap();

        let pre: Vec<NodeId> = doc.descendants(ROOT).collect();
        assert_eq!(pre, vec![a, b, c, d]);

        let post: Vec<NodeId> = doc.post_order(ROOT).collect();
        assert_eq!(post, vec![c, b, d, a, ROOT]);
    }

    #[test]
    fn test_delete_child_releases_subtree() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 4);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        doc.insert_end_child(ROOT, a).unwrap();
        doc.insert_end_child(a, b).unwrap();
        doc.insert_end_child(ROOT, c).unwrap();
        doc.insert_end_child(ROOT, d).unwrap();

        assert_eq!(doc.delete_child(ROOT, b), Err(TreeError::NotAChild { parent: ROOT, child: b }));
        assert_eq!(doc.delete_child(ROOT, a), Ok(2));
        assert_eq!(doc.get_node(a), None);
        assert_eq!(doc.get_node(b), None);

        let remaining: Vec<NodeId> = doc.children(ROOT).collect();
        assert_eq!(remaining, vec![c, d]);
        assert_eq!(doc.prev_sibling(c), None);
        assert_eq!(doc.node_count(), 3);

        // Middle removal keeps both directions consistent
        assert_eq!(doc.delete_children(ROOT), Ok(2));
        assert_eq!(doc.first_child(ROOT), None);
        assert_eq!(doc.last_child(ROOT), None);
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_released_slots_are_reused() {
        let mut doc = Document::new();
        doc.parse("<!--x--><!--y-->").unwrap();
        let first = doc.first_child(ROOT).unwrap();
        doc.delete_child(ROOT, first).unwrap();

        let (id, found) = doc.identify(0).unwrap();
        assert_eq!(id, first);
        assert_eq!(found.construct, Construct::Comment);
        assert_eq!(doc.discard(id), Ok(1));
    }

    #[test]
    fn test_identify_then_discard() {
        let mut doc = Document::new();
        doc.parse("<!--a-->").unwrap();
        let (id, found) = doc.identify(0).unwrap();
        assert_eq!(found.body, 4);
        assert!(doc.get_node(id).unwrap().is_detached());
        assert_eq!(doc.node_count(), 3);

        assert_eq!(doc.discard(ROOT), Err(TreeError::RootNotAttachable));
        assert_eq!(doc.discard(id), Ok(1));
        assert_eq!(doc.node_count(), 2);
    }

    #[test]
    fn test_identify_without_buffer() {
        let mut doc = Document::new();
        assert_eq!(doc.identify(0).unwrap_err(), ParseError::EmptyDocument);
    }

    #[test]
    fn test_teardown_releases_each_node_once() {
        let mut doc = Document::new();
        let ids = detached_comments(&mut doc, 6);
        // Build a chain deeper than one level plus siblings
        doc.insert_end_child(ROOT, ids[0]).unwrap();
        for pair in ids[..4].windows(2) {
            doc.insert_end_child(pair[0], pair[1]).unwrap();
        }
        doc.insert_end_child(ROOT, ids[4]).unwrap();
        // ids[5] stays detached and must still be released

        let teardown = doc.clear();
        assert_eq!(
            teardown,
            Teardown {
                nodes_released: 6,
                buffer_released: true
            }
        );
        assert_eq!(doc.node_count(), 1);
        assert!(doc.buffer().is_none());

        // Nothing left to release a second time
        assert_eq!(doc.clear(), Teardown::default());
    }

    #[test]
    fn test_teardown_deep_tree_is_iterative() {
        let depth = 50_000;
        let mut doc = Document::new();
        let text = "<!--n-->".repeat(depth);
        doc.parse(&text).unwrap();
        let ids: Vec<NodeId> = doc.children(ROOT).collect();
        for &id in &ids {
            doc.unlink(id).unwrap();
        }
        let mut parent = ROOT;
        for &id in &ids {
            doc.insert_end_child(parent, id).unwrap();
            parent = id;
        }

        assert_eq!(doc.descendants(ROOT).count(), depth);
        assert_eq!(doc.clear().nodes_released, depth);
    }

    #[test]
    fn test_print_to_writer() {
        let mut doc = Document::new();
        doc.parse("<!--a--><!--b-->").unwrap();
        let mut out = Vec::new();
        doc.print(&mut out, 2).unwrap();
        assert_eq!(out, b"        <!--a-->\n        <!--b-->\n");
    }

    #[test]
    fn test_print_is_verbatim() {
        let mut doc = Document::new();
        doc.parse("<!-- <b>&amp;</b> -->").unwrap();
        assert_eq!(doc.to_string_at(0), "<!-- <b>&amp;</b> -->\n");
    }

    #[test]
    fn test_non_utf8_value() {
        let mut doc = Document::new();
        doc.parse(b"<!--\xff-->").unwrap();
        let id = doc.first_child(ROOT).unwrap();
        assert_eq!(doc.value_bytes(id), Some(&b"\xff"[..]));
        assert_eq!(doc.value(id), None);
    }
}
