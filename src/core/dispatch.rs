//! Construct type dispatch
//!
//! Classifies the construct at a buffer position by its leading bytes. The
//! header table is ordered most-specific first: `<!--` and `<![CDATA[` both
//! share the `<!` prefix with a DTD declaration and must be tested before it.

use std::fmt;

use crate::core::scanner::{skip_whitespace, starts_with_at};
use crate::error::ParseError;

/// Kind of markup construct recognized by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    /// `<!-- ... -->`
    Comment,
    /// `<![CDATA[ ... ]]>`
    CData,
    /// `<!DOCTYPE ...>` and other `<!` declarations
    Dtd,
    /// `<? ... ?>`
    Declaration,
    /// `<name ...>`
    Element,
    /// Starts with `<` but matches no known header
    Unknown,
}

impl Construct {
    /// Closing marker of the construct's body, if it has one
    pub fn end_marker(self) -> Option<&'static [u8]> {
        match self {
            Construct::Comment => Some(b"-->"),
            Construct::CData => Some(b"]]>"),
            Construct::Declaration => Some(b"?>"),
            Construct::Dtd | Construct::Element => Some(b">"),
            Construct::Unknown => None,
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Construct::Comment => "comment",
            Construct::CData => "CDATA section",
            Construct::Dtd => "DTD declaration",
            Construct::Declaration => "declaration",
            Construct::Element => "element",
            Construct::Unknown => "unknown construct",
        };
        f.write_str(name)
    }
}

/// Known headers, most specific first
const HEADERS: &[(&[u8], Construct)] = &[
    (b"<!--", Construct::Comment),
    (b"<![CDATA[", Construct::CData),
    (b"<!", Construct::Dtd),
    (b"<?", Construct::Declaration),
];

/// A construct located in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identified {
    pub construct: Construct,
    /// Position of the opening `<`
    pub start: usize,
    /// Position just past the construct header
    pub body: usize,
}

/// Identify the construct at `pos`, skipping leading whitespace.
///
/// Input that begins with `<` but matches no header is reported as
/// [`Construct::Unknown`]; input that does not begin with `<` at all is an
/// [`ParseError::UnrecognizedConstruct`].
pub fn identify(buf: &[u8], pos: usize) -> Result<Identified, ParseError> {
    let start = skip_whitespace(buf, pos).ok_or(ParseError::UnexpectedEnd {
        offset: buf.len(),
    })?;

    if buf[start] != b'<' {
        return Err(ParseError::UnrecognizedConstruct { offset: start });
    }

    for &(header, construct) in HEADERS {
        if starts_with_at(buf, start, header) {
            return Ok(Identified {
                construct,
                start,
                body: start + header.len(),
            });
        }
    }

    // Elements start with a letter or underscore
    let construct = match buf.get(start + 1) {
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' => Construct::Element,
        _ => Construct::Unknown,
    };
    Ok(Identified {
        construct,
        start,
        body: start + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"<!--x-->", Construct::Comment, 4)]
    #[case(b"<![CDATA[x]]>", Construct::CData, 9)]
    #[case(b"<!DOCTYPE html>", Construct::Dtd, 2)]
    #[case(b"<?xml version=\"1.0\"?>", Construct::Declaration, 2)]
    #[case(b"<root/>", Construct::Element, 1)]
    #[case(b"<_private>", Construct::Element, 1)]
    #[case(b"<1abc>", Construct::Unknown, 1)]
    #[case(b"<", Construct::Unknown, 1)]
    fn test_identify(#[case] input: &[u8], #[case] expected: Construct, #[case] body: usize) {
        let found = identify(input, 0).unwrap();
        assert_eq!(found.construct, expected);
        assert_eq!(found.start, 0);
        assert_eq!(found.body, body);
    }

    #[test]
    fn test_comment_is_not_dtd() {
        // Shares the "<!" prefix with DTD declarations
        let found = identify(b"<!--x-->", 0).unwrap();
        assert_eq!(found.construct, Construct::Comment);
        assert_ne!(found.construct, Construct::Dtd);
    }

    #[test]
    fn test_identify_skips_whitespace() {
        let found = identify(b"  \n<!-- a -->", 0).unwrap();
        assert_eq!(found.construct, Construct::Comment);
        assert_eq!(found.start, 3);
        assert_eq!(found.body, 7);
    }

    #[test]
    fn test_identify_rejects_text() {
        assert_eq!(
            identify(b"  hello", 0),
            Err(ParseError::UnrecognizedConstruct { offset: 2 })
        );
    }

    #[test]
    fn test_identify_at_end() {
        assert_eq!(identify(b"   ", 0), Err(ParseError::UnexpectedEnd { offset: 3 }));
    }

    #[test]
    fn test_end_markers() {
        assert_eq!(Construct::Comment.end_marker(), Some(&b"-->"[..]));
        assert_eq!(Construct::Unknown.end_marker(), None);
    }
}
