//! Stream Adapters
//!
//! Wrap the tokenizer for callers that hold bytes rather than `&str`:
//! - StreamingParser: push-based, feed chunks and take queued tokens
//! - TokenReader: pull-based, iterate tokens out of any `Read`

pub mod reader;
pub mod streaming;

pub use reader::TokenReader;
pub use streaming::StreamingParser;

use crate::core::encoding::DecodeError;
use crate::core::tokenizer::ParseError;
use thiserror::Error;

/// Errors surfaced by the stream adapters
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Stable snake_case identifier, used as the error atom by host bindings
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::Parse(err) => err.kind(),
            StreamError::Decode(DecodeError::InvalidUtf8) => "invalid_utf8",
            StreamError::Decode(DecodeError::InvalidUtf16) => "invalid_utf16",
            StreamError::Io(_) => "io",
        }
    }
}
