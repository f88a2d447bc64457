//! Owned text buffer
//!
//! One mutable, contiguous copy of the input followed by a terminator byte.
//! The scanner splits it in place; nodes refer into it with [`Span`]s.

use crate::core::span::Span;
use crate::error::ParseError;

/// Byte written after the content and at every split point
pub const TERMINATOR: u8 = 0;

/// Owned, terminator-suffixed copy of a document's source text
#[derive(Debug)]
pub struct Buffer {
    /// Content bytes plus one trailing terminator
    mem: Box<[u8]>,
    /// Number of content bytes (excludes the terminator)
    length: usize,
}

impl Buffer {
    /// Copy `text` into a freshly allocated buffer.
    ///
    /// The allocation is fallible: an unsatisfiable request is reported as
    /// [`ParseError::AllocationFailed`] instead of aborting.
    pub fn construct(text: &[u8]) -> Result<Self, ParseError> {
        let length = text.len();
        if u32::try_from(length).is_err() {
            return Err(ParseError::InputTooLarge { len: length });
        }

        let requested = length + 1;
        let mut mem = Vec::new();
        mem.try_reserve_exact(requested)
            .map_err(|_| ParseError::AllocationFailed { requested })?;
        mem.extend_from_slice(text);
        mem.push(TERMINATOR);

        Ok(Buffer {
            mem: mem.into_boxed_slice(),
            length,
        })
    }

    /// Number of content bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Content bytes, including any terminators written by the scanner
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mem[..self.length]
    }

    /// Mutable content bytes for the scanner.
    ///
    /// The trailing terminator is not part of the slice and cannot be
    /// overwritten.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mem[..self.length]
    }

    /// Bytes covered by `span`; out-of-range spans read as empty
    #[inline]
    pub fn slice(&self, span: Span) -> &[u8] {
        span.slice(self.as_bytes())
    }

    /// Size of the allocation backing this buffer
    #[inline]
    pub fn allocated(&self) -> usize {
        self.mem.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_copies_and_terminates() {
        let buffer = Buffer::construct(b"<!-- a -->").unwrap();
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.allocated(), 11);
        assert_eq!(buffer.as_bytes(), b"<!-- a -->");
        assert_eq!(buffer.mem[10], TERMINATOR);
    }

    #[test]
    fn test_construct_empty() {
        let buffer = Buffer::construct(b"").unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.allocated(), 1);
        assert_eq!(buffer.as_bytes(), b"");
    }

    #[test]
    fn test_mutation_is_bounded_to_content() {
        let mut buffer = Buffer::construct(b"abc").unwrap();
        buffer.as_bytes_mut()[1] = TERMINATOR;
        assert_eq!(buffer.as_bytes(), b"a\0c");
        assert_eq!(buffer.as_bytes_mut().len(), 3);
    }

    #[test]
    fn test_slice_by_span() {
        let buffer = Buffer::construct(b"hello world").unwrap();
        assert_eq!(buffer.slice(Span::new(6, 5)), b"world");
        assert_eq!(buffer.slice(Span::new(6, 50)), b"");
    }
}
