//! xmlchunk - Incremental XML tokenizer
//!
//! Accepts XML in chunks of any size and emits tokens (text, CDATA, comments,
//! processing instructions, opening and closing tags) as soon as each one is
//! complete. Non-validating beyond tag balancing.
//!
//! Layers:
//! - core: scanner, tokenizer state machine, attribute and entity parsing
//! - stream: byte-oriented push (StreamingParser) and pull (TokenReader) adapters
//! - NIF bindings for `Elixir.XmlChunk.Native`

use rustler::{Binary, Encoder, Env, NifResult, ResourceArc, Term};

pub mod core;
pub mod stream;

mod resource;
mod term;

pub use crate::core::attributes::{parse_attrs, AttributeError, Attributes};
pub use crate::core::entities::parse_entities;
pub use crate::core::token::{OwnedToken, Token, TokenKind, TokenSink};
pub use crate::core::tokenizer::{parse, parse_to_vec, ParseError, Tokenizer, WaitingKind};
pub use crate::stream::{StreamError, StreamingParser, TokenReader};

use resource::{StreamingParserRef, StreamingParserResource};
use term::{attrs_to_term, error_to_term, ok_to_term, str_to_binary, tokens_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Surface a poisoned parser mutex as a raised atom
fn poisoned(reason: &'static str) -> rustler::Error {
    rustler::Error::RaiseAtom(reason)
}

fn stream_error_to_term<'a>(env: Env<'a>, err: &StreamError) -> NifResult<Term<'a>> {
    error_to_term(env, err.kind(), &err.to_string())
}

// ============================================================================
// One-shot Parsing
// ============================================================================

/// Tokenize a complete document
#[rustler::nif(name = "parse", schedule = "DirtyCpu")]
fn parse_document<'a>(env: Env<'a>, input: Binary<'a>) -> NifResult<Term<'a>> {
    let mut parser = StreamingParser::new();
    let result = parser.feed(input.as_slice()).and_then(|()| {
        let mut tokens = parser.take_events(usize::MAX);
        tokens.extend(parser.finalize()?);
        Ok(tokens)
    });

    match result {
        Ok(tokens) => Ok(ok_to_term(env, tokens_to_term(env, tokens))),
        Err(err) => stream_error_to_term(env, &err),
    }
}

/// Parse the raw attribute string of a `tag_open` event into a map
#[rustler::nif(name = "parse_attrs")]
fn parse_attributes<'a>(env: Env<'a>, input: &str) -> NifResult<Term<'a>> {
    match parse_attrs(input) {
        Ok(attrs) => Ok(ok_to_term(env, attrs_to_term(env, &attrs)?)),
        Err(err) => error_to_term(env, err.kind(), &err.to_string()),
    }
}

/// Decode the predefined and numeric character references in `input`
#[rustler::nif(name = "parse_entities")]
fn decode_entities<'a>(env: Env<'a>, input: &str) -> Term<'a> {
    str_to_binary(env, &parse_entities(input))
}

// ============================================================================
// Streaming Parser
// ============================================================================

/// Create a new streaming parser
#[rustler::nif]
fn streaming_new() -> StreamingParserRef {
    ResourceArc::new(StreamingParserResource::new())
}

/// Feed a chunk of data to the streaming parser
#[rustler::nif]
fn streaming_feed<'a>(env: Env<'a>, parser: StreamingParserRef, chunk: Binary<'a>) -> NifResult<Term<'a>> {
    let result = parser
        .with_parser(|inner| {
            inner
                .feed(chunk.as_slice())
                .map(|()| (inner.available_events(), inner.buffer_size()))
        })
        .map_err(poisoned)?;

    match result {
        Ok(counts) => Ok(ok_to_term(env, counts.encode(env))),
        Err(err) => stream_error_to_term(env, &err),
    }
}

/// Take up to `max` events from the streaming parser
#[rustler::nif]
fn streaming_take_events<'a>(env: Env<'a>, parser: StreamingParserRef, max: usize) -> NifResult<Term<'a>> {
    let events = parser.with_parser(|inner| inner.take_events(max)).map_err(poisoned)?;
    Ok(tokens_to_term(env, events))
}

/// Finalize the streaming parser
#[rustler::nif]
fn streaming_finalize<'a>(env: Env<'a>, parser: StreamingParserRef) -> NifResult<Term<'a>> {
    let result = parser.with_parser(|inner| inner.finalize()).map_err(poisoned)?;

    match result {
        Ok(events) => Ok(ok_to_term(env, tokens_to_term(env, events))),
        Err(err) => stream_error_to_term(env, &err),
    }
}

/// Get streaming parser status
#[rustler::nif]
fn streaming_status(parser: StreamingParserRef) -> NifResult<(usize, usize, bool)> {
    parser
        .with_parser(|inner| (inner.available_events(), inner.buffer_size(), inner.has_pending()))
        .map_err(poisoned)
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.XmlChunk.Native");
