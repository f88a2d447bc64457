//! Parse options

/// How the scanner treats whitespace at the start of a construct's body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    /// Body content starts right after the construct header
    #[default]
    Preserve,
    /// Whitespace between the header and the first content byte is dropped
    SkipLeading,
}

/// Options controlling a [`Document`](crate::dom::Document) parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub whitespace: WhitespaceMode,
    /// Upper bound on nodes in the tree, root included
    pub max_nodes: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whitespace(mut self, whitespace: WhitespaceMode) -> Self {
        self.whitespace = whitespace;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }
}
