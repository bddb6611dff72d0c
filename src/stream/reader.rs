//! Pull-based token reader
//!
//! Reads XML from any source implementing the Read trait and yields tokens
//! one at a time, reading more input only when the queue runs dry.

use super::{StreamError, StreamingParser};
use crate::core::token::OwnedToken;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Buffer size for reading chunks
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Iterator of tokens over a byte source
///
/// Tokens completed before a failure are yielded first, then the error,
/// then the iterator is exhausted.
pub struct TokenReader<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    parser: StreamingParser,
    queue: VecDeque<OwnedToken>,
    error: Option<StreamError>,
    done: bool,
}

impl<R: Read> TokenReader<R> {
    /// Create a new token reader
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new token reader with specified read buffer capacity
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        TokenReader {
            reader,
            buffer: vec![0u8; capacity.max(1)],
            parser: StreamingParser::new(),
            queue: VecDeque::new(),
            error: None,
            done: false,
        }
    }

    /// Consume the reader, returning the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read and tokenize until at least one token is queued or input ends
    fn fill(&mut self) {
        while self.queue.is_empty() && !self.done {
            let read = match self.reader.read(&mut self.buffer) {
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.stop(e.into());
                    return;
                }
            };

            let result = if read == 0 {
                self.done = true;
                self.parser.finalize()
            } else {
                self.parser
                    .feed(&self.buffer[..read])
                    .map(|()| self.parser.take_events(usize::MAX))
            };

            match result {
                Ok(tokens) => self.queue.extend(tokens),
                Err(e) => self.stop(e),
            }
        }
    }

    fn stop(&mut self, err: StreamError) {
        // keep tokens the parser completed before failing
        self.queue.extend(self.parser.take_events(usize::MAX));
        self.error = Some(err);
        self.done = true;
    }
}

impl<R: Read> Iterator for TokenReader<R> {
    type Item = Result<OwnedToken, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill();
        match self.queue.pop_front() {
            Some(token) => Some(Ok(token)),
            None => self.error.take().map(Err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::parse_to_vec;
    use std::io::{self, Cursor};

    #[test]
    fn test_reads_whole_document() {
        let doc = "<?xml version=\"1.0\"?><root a=\"1\">caf\u{e9}<!-- c --><x/></root>";
        let tokens: Vec<OwnedToken> = TokenReader::new(Cursor::new(doc))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens, parse_to_vec(doc).unwrap());
    }

    #[test]
    fn test_small_buffer_matches_whole_parse() {
        let doc = "<r>\u{2603} <![CDATA[ ]]> ]]><i k='>'/>tail</r>";
        for capacity in 1..6 {
            let tokens: Vec<OwnedToken> = TokenReader::with_capacity(Cursor::new(doc), capacity)
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(tokens, parse_to_vec(doc).unwrap(), "capacity {capacity}");
        }
    }

    #[test]
    fn test_tokens_then_error_then_end() {
        let mut reader = TokenReader::with_capacity(Cursor::new("<a>x</b><c/>"), 3);
        assert_eq!(
            reader.next().unwrap().unwrap(),
            OwnedToken::TagOpen {
                name: "a".into(),
                attrs: String::new(),
                self_closing: false
            }
        );
        assert_eq!(reader.next().unwrap().unwrap(), OwnedToken::Text("x".into()));
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), "mismatched_closing_tag");
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_error_at_end_of_input() {
        let results: Vec<_> = TokenReader::new(Cursor::new("<a>")).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), "unclosed_tags");
    }

    #[test]
    fn test_empty_input() {
        assert!(TokenReader::new(Cursor::new("")).next().is_none());
    }

    struct Flaky {
        inner: Cursor<&'static str>,
        interrupted: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let source = Flaky {
            inner: Cursor::new("<a/>"),
            interrupted: false,
        };
        let tokens: Vec<_> = TokenReader::new(source).collect::<Result<_, _>>().unwrap();
        assert_eq!(tokens.len(), 1);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("gone"))
        }
    }

    #[test]
    fn test_io_error_surfaces() {
        let mut reader = TokenReader::new(Broken);
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), "io");
        assert_eq!(err.to_string(), "I/O error: gone");
        assert!(reader.next().is_none());
    }
}
