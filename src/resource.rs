//! ResourceArc Wrappers
//!
//! Persistent state for streaming parsers.

use crate::stream::StreamingParser;
use rustler::ResourceArc;
use std::sync::Mutex;

/// Wrapper for StreamingParser that can be stored in a ResourceArc
pub struct StreamingParserResource {
    pub inner: Mutex<StreamingParser>,
}

impl StreamingParserResource {
    pub fn new() -> Self {
        StreamingParserResource {
            inner: Mutex::new(StreamingParser::new()),
        }
    }

    /// Run `f` with exclusive access to the parser
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if the parser mutex is poisoned.
    pub fn with_parser<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut StreamingParser) -> R,
    {
        let mut guard = self.inner.lock().map_err(|_| "mutex_poisoned")?;
        Ok(f(&mut guard))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for StreamingParserResource {}

impl Default for StreamingParserResource {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for the ResourceArc
pub type StreamingParserRef = ResourceArc<StreamingParserResource>;
