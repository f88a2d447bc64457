//! Span - offset and length into the text buffer
//!
//! Zero-copy reference to a region of the document's buffer. Nodes store
//! spans instead of borrowed slices so the tree never holds a pointer into
//! memory it does not own.

/// A span referencing a region of the text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Span {
    /// Byte offset into the buffer
    pub offset: u32,
    /// Length in bytes
    pub len: u32,
}

impl Span {
    /// Create a new span
    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Create an empty span (used for "no value")
    #[inline]
    pub const fn empty() -> Self {
        Self { offset: 0, len: 0 }
    }

    /// Build a span from `start..end` byte positions.
    ///
    /// Returns `None` if the range is inverted or does not fit in `u32`.
    #[inline]
    pub fn from_range(start: usize, end: usize) -> Option<Self> {
        let len = end.checked_sub(start)?;
        Some(Self::new(u32::try_from(start).ok()?, u32::try_from(len).ok()?))
    }

    /// Check if this span is empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the end offset (exclusive)
    #[inline]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    /// Extract the byte slice from the buffer.
    ///
    /// A span that runs past the end of `input` reads as empty.
    #[inline]
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        let start = self.offset as usize;
        let end = start.saturating_add(self.len as usize);
        if end <= input.len() {
            &input[start..end]
        } else {
            &[]
        }
    }

    /// Extract as UTF-8 string from the buffer
    #[inline]
    pub fn as_str<'a>(&self, input: &'a [u8]) -> Option<&'a str> {
        std::str::from_utf8(self.slice(input)).ok()
    }
}
