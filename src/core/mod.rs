//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML tokenizing:
//! - Scanner: memchr-accelerated delimiter search and quote-aware tag end
//! - Tokenizer: Incremental state machine for XML token extraction
//! - Token: Token types and the sink they are delivered to
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Attributes: Parsing of the raw attribute string of a start tag
//! - Encoding: BOM detection and chunked UTF-8 decoding

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod token;
pub mod tokenizer;
