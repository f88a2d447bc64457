//! Destructive text scanner
//!
//! Locates whitespace boundaries and closing markers inside the document
//! buffer. A successful [`parse_text`] overwrites the first byte of the
//! matched marker with [`TERMINATOR`], splitting the buffer in place; the
//! content is returned as a [`Span`] and nothing is copied.
//!
//! Marker candidates are found with memchr (SIMD when available) and then
//! confirmed with a full comparison, so the scan stays single pass.

use memchr::memchr;

use crate::core::buffer::TERMINATOR;
use crate::core::span::Span;
use crate::options::WhitespaceMode;

/// Result of splitting the buffer at an end marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Content between the scan start and the marker
    pub content: Span,
    /// Position just past the consumed marker
    pub next: usize,
}

/// Whitespace as classified by C `isspace` in the "C" locale
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Advance from `pos` past whitespace.
///
/// Returns the position of the first non-whitespace byte, or `None` if the
/// end of the buffer is reached first.
#[inline]
pub fn skip_whitespace(buf: &[u8], pos: usize) -> Option<usize> {
    let rest = buf.get(pos..)?;
    rest.iter()
        .position(|&b| !is_whitespace(b))
        .map(|offset| pos + offset)
}

/// Scan from `pos` for `end_marker` and split the buffer there.
///
/// With [`WhitespaceMode::SkipLeading`] the content starts at the first
/// non-whitespace byte and the scan fails if none remains. On success the
/// first marker byte is replaced by the terminator. On failure the buffer is
/// left untouched.
pub fn parse_text(
    buf: &mut [u8],
    pos: usize,
    end_marker: &[u8],
    mode: WhitespaceMode,
) -> Option<Split> {
    let (&end_char, _) = end_marker.split_first()?;

    let start = match mode {
        WhitespaceMode::SkipLeading => skip_whitespace(buf, pos)?,
        WhitespaceMode::Preserve => {
            if pos > buf.len() {
                return None;
            }
            pos
        }
    };

    let mut p = start;
    while let Some(offset) = memchr(end_char, &buf[p..]) {
        let candidate = p + offset;
        if buf[candidate..].starts_with(end_marker) {
            let content = Span::from_range(start, candidate)?;
            buf[candidate] = TERMINATOR;
            return Some(Split {
                content,
                next: candidate + end_marker.len(),
            });
        }
        p = candidate + 1;
    }

    None
}

/// Check whether `buf` holds `header` at `pos`
#[inline]
pub fn starts_with_at(buf: &[u8], pos: usize, header: &[u8]) -> bool {
    buf.get(pos..).is_some_and(|rest| rest.starts_with(header))
}
