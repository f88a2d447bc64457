//! Elixir Term Conversion Utilities
//!
//! Converts documents and parse errors to Elixir terms.

use rustler::{Encoder, Env, NewBinary, Term};

use crate::dom::Document;
use crate::error::ParseError;

/// Copy bytes into a new BEAM binary
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// Convert a parse error to `{kind_atom, offset | nil}`
pub fn parse_error_to_term<'a>(env: Env<'a>, err: &ParseError) -> Term<'a> {
    // Kinds come from a fixed set of snake_case names
    let kind = match rustler::types::atom::Atom::from_str(env, err.kind()) {
        Ok(atom) => atom.encode(env),
        Err(_) => err.kind().encode(env),
    };
    let offset = match err.offset() {
        Some(offset) => offset.encode(env),
        None => rustler::types::atom::nil().encode(env),
    };
    (kind, offset).encode(env)
}

/// Top-level comment values as a list of binaries, in document order
pub fn comments_to_term<'a>(env: Env<'a>, doc: &Document) -> Term<'a> {
    let values: Vec<&[u8]> = doc.comments().collect();
    let mut list = Term::list_new_empty(env);
    for value in values.into_iter().rev() {
        list = list.list_prepend(bytes_to_binary(env, value));
    }
    list
}
