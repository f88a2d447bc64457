//! Core parsing primitives
//!
//! The building blocks the document parser is assembled from:
//! - Buffer: owned, terminator-suffixed copy of the input text
//! - Span: offset/length handle into the buffer (zero-copy)
//! - Scanner: destructive whitespace and end-marker scanning using memchr
//! - Dispatch: ordered header table classifying constructs

pub mod buffer;
pub mod dispatch;
pub mod scanner;
pub mod span;
