//! Elixir Term Conversion Utilities
//!
//! Converts tokens, attribute maps and errors to Elixir terms.

use crate::core::attributes::Attributes;
use crate::core::token::OwnedToken;
use rustler::types::atom::Atom;
use rustler::{Encoder, Env, NewBinary, NifResult, Term};

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    text,
    cdata,
    comment,
    processing_instruction,
    tag_open,
    tag_close,
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// Convert tokens to an Elixir list, preserving order
pub fn tokens_to_term<'a>(env: Env<'a>, tokens: Vec<OwnedToken>) -> Term<'a> {
    // Build list in reverse order using list_prepend
    let mut list = Term::list_new_empty(env);
    for token in tokens.into_iter().rev() {
        list = list.list_prepend(token_to_term(env, &token));
    }
    list
}

/// Convert a single token to an Elixir tuple
pub fn token_to_term<'a>(env: Env<'a>, token: &OwnedToken) -> Term<'a> {
    match token {
        OwnedToken::Text(content) => (text(), str_to_binary(env, content)).encode(env),
        OwnedToken::CData(content) => (cdata(), str_to_binary(env, content)).encode(env),
        OwnedToken::Comment(content) => (comment(), str_to_binary(env, content)).encode(env),
        OwnedToken::ProcessingInstruction(content) => {
            (processing_instruction(), str_to_binary(env, content)).encode(env)
        }
        OwnedToken::TagOpen {
            name,
            attrs,
            self_closing,
        } => (
            tag_open(),
            str_to_binary(env, name),
            str_to_binary(env, attrs),
            *self_closing,
        )
            .encode(env),
        OwnedToken::TagClose { name } => (tag_close(), str_to_binary(env, name)).encode(env),
    }
}

/// Convert parsed attributes to a map of binaries
pub fn attrs_to_term<'a>(env: Env<'a>, attrs: &Attributes<'_>) -> NifResult<Term<'a>> {
    let pairs: Vec<(Term<'a>, Term<'a>)> = attrs
        .iter()
        .map(|(name, value)| (str_to_binary(env, name), str_to_binary(env, value)))
        .collect();
    Term::map_from_pairs(env, &pairs)
}

/// `{:ok, value}`
pub fn ok_to_term<'a>(env: Env<'a>, value: Term<'a>) -> Term<'a> {
    (ok(), value).encode(env)
}

/// `{:error, {kind, message}}` with `kind` as an atom
pub fn error_to_term<'a>(env: Env<'a>, kind: &str, message: &str) -> NifResult<Term<'a>> {
    let kind = Atom::from_str(env, kind)?;
    Ok((error(), (kind, str_to_binary(env, message))).encode(env))
}
