//! Push-based streaming parser
//!
//! Stateful wrapper that accepts byte chunks, tokenizes them as they arrive
//! and queues the resulting tokens until the caller takes them.

use super::StreamError;
use crate::core::encoding::ChunkDecoder;
use crate::core::token::OwnedToken;
use crate::core::tokenizer::{ParseError, Tokenizer};

const LOG_TARGET: &str = "xmlchunk::stream";

/// Stateful streaming XML tokenizer over byte chunks
pub struct StreamingParser {
    tokenizer: Tokenizer,
    /// Carries partial characters between chunks, converts UTF-16
    decoder: ChunkDecoder,
    /// Parsed tokens ready to be consumed
    events: Vec<OwnedToken>,
    /// Set by the first error; every later call reports `Finished`
    failed: bool,
}

impl StreamingParser {
    /// Create a new streaming parser
    pub fn new() -> Self {
        StreamingParser {
            tokenizer: Tokenizer::new(),
            decoder: ChunkDecoder::new(),
            events: Vec::with_capacity(64),
            failed: false,
        }
    }

    /// Feed a chunk of data to the parser
    ///
    /// Tokens completed by this chunk are queued. Tokens queued before an
    /// error stay available to `take_events`.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), StreamError> {
        self.ensure_usable()?;

        let text = match self.decoder.decode(chunk) {
            Ok(text) => text,
            Err(err) => return Err(self.fail(err.into())),
        };

        let queued = self.events.len();
        self.tokenizer
            .write(&text, &mut self.events)
            .map_err(|err| self.fail(err.into()))?;

        log::trace!(
            target: LOG_TARGET,
            "fed {} bytes, {} new tokens, {} bytes held",
            chunk.len(),
            self.events.len() - queued,
            self.buffer_size()
        );
        Ok(())
    }

    /// Signal end of input and take every remaining token
    pub fn finalize(&mut self) -> Result<Vec<OwnedToken>, StreamError> {
        self.ensure_usable()?;

        if let Err(err) = self.decoder.finish() {
            return Err(self.fail(err.into()));
        }
        self.tokenizer
            .close(&mut self.events)
            .map_err(|err| self.fail(err.into()))?;

        Ok(std::mem::take(&mut self.events))
    }

    /// Take up to `max` parsed tokens
    /// Returns tokens and leaves remaining tokens in place
    pub fn take_events(&mut self, max: usize) -> Vec<OwnedToken> {
        let count = max.min(self.events.len());
        if count == self.events.len() {
            // Take all events - swap with empty vec (no allocation)
            std::mem::take(&mut self.events)
        } else {
            self.events.drain(..count).collect()
        }
    }

    /// Get number of available tokens
    pub fn available_events(&self) -> usize {
        self.events.len()
    }

    /// Bytes received but not yet part of an emitted token
    pub fn buffer_size(&self) -> usize {
        self.tokenizer.pending_len() + self.decoder.carried()
    }

    /// Check if there's unprocessed data
    pub fn has_pending(&self) -> bool {
        self.buffer_size() > 0
    }

    fn ensure_usable(&self) -> Result<(), StreamError> {
        if self.failed || self.tokenizer.is_finished() {
            return Err(ParseError::Finished.into());
        }
        Ok(())
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        log::debug!(target: LOG_TARGET, "stream failed: {err}");
        self.failed = true;
        err
    }
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::DecodeError;
    use crate::core::tokenizer::parse_to_vec;

    fn open(name: &str, self_closing: bool) -> OwnedToken {
        OwnedToken::TagOpen {
            name: name.into(),
            attrs: String::new(),
            self_closing,
        }
    }

    #[test]
    fn test_streaming_simple() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<root>").unwrap();
        parser.feed(b"<item/>").unwrap();
        parser.feed(b"</root>").unwrap();

        let events = parser.take_events(10);
        assert_eq!(
            events,
            vec![
                open("root", false),
                open("item", true),
                OwnedToken::TagClose { name: "root".into() }
            ]
        );
        assert!(parser.finalize().unwrap().is_empty());
    }

    #[test]
    fn test_streaming_chunks() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<ro").unwrap();
        assert_eq!(parser.available_events(), 0);
        assert_eq!(parser.buffer_size(), 3);
        assert!(parser.has_pending());

        parser.feed(b"ot><i").unwrap();
        parser.feed(b"tem/></root>").unwrap();
        assert_eq!(parser.available_events(), 3);
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_take_events_partial() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<a/><b/><c/>").unwrap();
        assert_eq!(parser.take_events(2), vec![open("a", true), open("b", true)]);
        assert_eq!(parser.available_events(), 1);
        assert_eq!(parser.take_events(10), vec![open("c", true)]);
    }

    #[test]
    fn test_finalize_emits_trailing_text() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<a/>tail").unwrap();
        assert_eq!(parser.take_events(10), vec![open("a", true)]);
        assert_eq!(parser.finalize().unwrap(), vec![OwnedToken::Text("tail".into())]);
    }

    #[test]
    fn test_multibyte_split_across_feeds() {
        let doc = "<p>gr\u{fc}\u{df}e \u{2603}</p>";
        let expected = parse_to_vec(doc).unwrap();

        let mut parser = StreamingParser::new();
        for byte in doc.as_bytes() {
            parser.feed(std::slice::from_ref(byte)).unwrap();
        }
        let mut events = parser.take_events(usize::MAX);
        events.extend(parser.finalize().unwrap());
        assert_eq!(events, expected);
    }

    #[test]
    fn test_bom_is_skipped() {
        let mut parser = StreamingParser::new();
        parser.feed(&[0xEF, 0xBB, 0xBF]).unwrap();
        parser.feed(b"<a/>").unwrap();
        assert_eq!(parser.finalize().unwrap(), vec![open("a", true)]);
    }

    #[test]
    fn test_utf16_input_matches_utf8_parse() {
        let doc = "<p a='\u{e9}'>\u{1F600}<!-- c --></p>";
        let expected = parse_to_vec(doc).unwrap();

        let mut bytes = vec![0xFE, 0xFF];
        for unit in doc.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }

        let mut parser = StreamingParser::new();
        for chunk in bytes.chunks(3) {
            parser.feed(chunk).unwrap();
        }
        let mut events = parser.take_events(usize::MAX);
        events.extend(parser.finalize().unwrap());
        assert_eq!(events, expected);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<a>").unwrap();
        let err = parser.feed(b"</b>").unwrap_err();
        assert_eq!(err.kind(), "mismatched_closing_tag");
        assert_eq!(err.to_string(), "Unclosed tag: a");

        // tokens from before the error remain available
        assert_eq!(parser.take_events(10), vec![open("a", false)]);
        assert!(matches!(
            parser.feed(b"<c/>"),
            Err(StreamError::Parse(ParseError::Finished))
        ));
        assert!(matches!(
            parser.finalize(),
            Err(StreamError::Parse(ParseError::Finished))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_terminal() {
        let mut parser = StreamingParser::new();
        let err = parser.feed(&[b'<', b'a', 0xFF, b'>']).unwrap_err();
        assert!(matches!(err, StreamError::Decode(DecodeError::InvalidUtf8)));
        assert_eq!(err.kind(), "invalid_utf8");
        assert!(parser.feed(b"<a/>").is_err());
    }

    #[test]
    fn test_truncated_character_at_end() {
        let mut parser = StreamingParser::new();
        parser.feed(&[b'x', 0xE2, 0x98]).unwrap();
        let err = parser.finalize().unwrap_err();
        assert_eq!(err.kind(), "invalid_utf8");
    }

    #[test]
    fn test_unclosed_at_finalize() {
        let mut parser = StreamingParser::new();
        parser.feed(b"<root><child>").unwrap();
        let err = parser.finalize().unwrap_err();
        assert_eq!(err.to_string(), "Unclosed tags: root,child");
    }
}
