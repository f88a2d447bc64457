//! SlabXML - in-place markup parsing over a single owned buffer
//!
//! The input is copied once into a buffer owned by the [`Document`]. The
//! scanner splits that buffer in place and nodes refer into it by span, so
//! parsing a comment allocates a node and nothing else.
//!
//! Layers:
//! - core: buffer, spans, destructive scanner, construct dispatch
//! - dom: arena node tree and the document that owns it
//! - NIFs: the document exposed to the BEAM as a resource

use rustler::{Binary, Encoder, Env, NifResult, ResourceArc, Term};

pub mod core;
pub mod dom;
pub mod error;
pub mod options;
mod resource;
mod term;

pub use dom::{Document, NodeId, NodeKind, Teardown, ROOT};
pub use error::{ParseError, TreeError};
pub use options::{ParseOptions, WhitespaceMode};

use resource::{DocumentRef, DocumentResource};
use term::{bytes_to_binary, comments_to_term, parse_error_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
                while current > peak {
                    match PEAK_ALLOCATED.compare_exchange_weak(
                        peak,
                        current,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(p) => peak = p,
                    }
                }
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Tracking NIFs
// ============================================================================

#[cfg(feature = "memory_tracking")]
use std::sync::atomic::Ordering;

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory() -> usize {
    tracking::ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    tracking::PEAK_ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    let current = tracking::ALLOCATED.load(Ordering::SeqCst);
    let peak = tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
    (current, peak)
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    (0, 0)
}

// ============================================================================
// Document NIFs
// ============================================================================

/// Parse into a document resource: `{:ok, doc}` or `{:error, {kind, offset}}`
fn parse_to_term<'a>(env: Env<'a>, input: &[u8], options: ParseOptions) -> Term<'a> {
    let mut doc = Document::with_options(options);
    match doc.parse(input) {
        Ok(()) => {
            let arc = ResourceArc::new(DocumentResource::new(doc));
            (rustler::types::atom::ok(), arc).encode(env)
        }
        Err(err) => (rustler::types::atom::error(), parse_error_to_term(env, &err)).encode(env),
    }
}

/// Parse with default options (leading whitespace preserved)
#[rustler::nif]
fn parse<'a>(env: Env<'a>, input: Binary<'a>) -> NifResult<Term<'a>> {
    Ok(parse_to_term(env, input.as_slice(), ParseOptions::default()))
}

/// Parse, optionally dropping whitespace at the start of each body
#[rustler::nif]
fn parse_with<'a>(env: Env<'a>, input: Binary<'a>, skip_leading_ws: bool) -> NifResult<Term<'a>> {
    let whitespace = if skip_leading_ws {
        WhitespaceMode::SkipLeading
    } else {
        WhitespaceMode::Preserve
    };
    let options = ParseOptions::new().with_whitespace(whitespace);
    Ok(parse_to_term(env, input.as_slice(), options))
}

/// Print the document with top-level nodes indented `depth` levels
#[rustler::nif]
fn print<'a>(env: Env<'a>, doc_ref: DocumentRef, depth: usize) -> NifResult<Term<'a>> {
    match doc_ref.with_document(|doc| doc.print_to_vec(depth)) {
        Ok(bytes) => Ok(bytes_to_binary(env, &bytes)),
        Err(e) => Ok((rustler::types::atom::error(), e).encode(env)),
    }
}

/// Top-level comment values as binaries
#[rustler::nif]
fn comments<'a>(env: Env<'a>, doc_ref: DocumentRef) -> NifResult<Term<'a>> {
    match doc_ref.with_document(|doc| comments_to_term(env, doc)) {
        Ok(list) => Ok(list),
        Err(e) => Ok((rustler::types::atom::error(), e).encode(env)),
    }
}

/// Live node count, root included
#[rustler::nif]
fn node_count(doc_ref: DocumentRef) -> usize {
    doc_ref.with_document(Document::node_count).unwrap_or(0)
}

// ============================================================================
// NIF Initialization
// ============================================================================

#[allow(non_local_definitions)]
fn load(env: Env, _info: Term) -> bool {
    let _ = env.register::<DocumentResource>();
    true
}

rustler::init!("Elixir.SlabXML.Native", load = load);
