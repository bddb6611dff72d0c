//! XML Tokenizer - Incremental state machine for XML token extraction
//!
//! Input arrives in chunks of any size. Each `write` scans as far as the
//! available text allows, hands every complete token to the sink, and keeps
//! at most one partial token (the "waiting" state) to be completed by the
//! next chunk. Extracted tokens:
//! - Element start/end tags (attributes left raw)
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions
//!
//! The tokenizer does not validate beyond tag balancing and stops at the
//! first irregularity. It never recovers: after an error, and after `close`,
//! it only answers [`ParseError::Finished`].

use super::scanner::{find_index_outside, is_whitespace_char, Scanner};
use super::token::{OwnedToken, Token, TokenSink};
use thiserror::Error;

const LOG_TARGET: &str = "xmlchunk::tokenizer";

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_DASHES: &str = "--";
const PI_OPEN: &str = "<?";
const PI_CLOSE: &str = "?>";

/// Fatal tokenizer errors
///
/// Messages carry no byte or line position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `<!` followed by anything other than `--` or `[CDATA[` (DOCTYPE included)
    #[error("Unrecognized sequence: {0}")]
    UnrecognizedSequence(String),
    /// `--` inside a comment not followed by `>`
    #[error("Unexpected -- inside comment: '{0}'")]
    UnexpectedCommentDash(String),
    #[error("Unclosed comment")]
    UnclosedComment,
    #[error("Unclosed CDATA section")]
    UnclosedCdata,
    #[error("Unclosed processing instruction")]
    UnclosedProcessingInstruction,
    #[error("Unclosed markup declaration")]
    UnclosedMarkupDeclaration,
    /// End of stream inside an opening or closing tag
    #[error("Unclosed tag")]
    UnclosedTag,
    /// End of stream with open elements, outermost first
    #[error("Unclosed tags: {}", .0.join(","))]
    UnclosedTags(Vec<String>),
    /// A closing tag that does not match the innermost open element.
    /// Reports the element that was expected to close.
    #[error("Unclosed tag: {expected}")]
    MismatchedClosingTag { expected: String, found: String },
    /// A closing tag with no open element
    #[error("Unexpected closing tag: {0}")]
    UnexpectedClosingTag(String),
    #[error("Tag names may not start with whitespace")]
    WhitespaceLeadingTagName,
    /// `write` or `close` after `close` or after a previous error
    #[error("Tokenizer already finished")]
    Finished,
}

impl ParseError {
    /// Stable snake_case identifier, used as the error atom by host bindings
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::UnrecognizedSequence(_) => "unrecognized_sequence",
            ParseError::UnexpectedCommentDash(_) => "unexpected_comment_dash",
            ParseError::UnclosedComment => "unclosed_comment",
            ParseError::UnclosedCdata => "unclosed_cdata",
            ParseError::UnclosedProcessingInstruction => "unclosed_processing_instruction",
            ParseError::UnclosedMarkupDeclaration => "unclosed_markup_declaration",
            ParseError::UnclosedTag => "unclosed_tag",
            ParseError::UnclosedTags(_) => "unclosed_tags",
            ParseError::MismatchedClosingTag { .. } => "mismatched_closing_tag",
            ParseError::UnexpectedClosingTag(_) => "unexpected_closing_tag",
            ParseError::WhitespaceLeadingTagName => "whitespace_leading_tag_name",
            ParseError::Finished => "finished",
        }
    }
}

/// Kind of partial token held between two writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingKind {
    Text,
    /// `<!` seen, not yet known to be a comment or CDATA
    MarkupDeclaration,
    Cdata,
    Comment,
    ProcessingInstruction,
    TagOpen,
    TagClose,
}

/// Tokenizer state between two calls
#[derive(Debug)]
enum State {
    Idle,
    WaitingText(String),
    WaitingMarkupDeclaration(String),
    WaitingCdata(String),
    WaitingComment(String),
    WaitingProcessingInstruction(String),
    WaitingTagOpen(String),
    WaitingTagClose(String),
    Closed,
    Failed,
}

impl State {
    fn waiting(kind: WaitingKind, text: String) -> Self {
        match kind {
            WaitingKind::Text => State::WaitingText(text),
            WaitingKind::MarkupDeclaration => State::WaitingMarkupDeclaration(text),
            WaitingKind::Cdata => State::WaitingCdata(text),
            WaitingKind::Comment => State::WaitingComment(text),
            WaitingKind::ProcessingInstruction => State::WaitingProcessingInstruction(text),
            WaitingKind::TagOpen => State::WaitingTagOpen(text),
            WaitingKind::TagClose => State::WaitingTagClose(text),
        }
    }

    fn pending(&self) -> Option<(WaitingKind, &str)> {
        let pending = match self {
            State::WaitingText(t) => (WaitingKind::Text, t),
            State::WaitingMarkupDeclaration(t) => (WaitingKind::MarkupDeclaration, t),
            State::WaitingCdata(t) => (WaitingKind::Cdata, t),
            State::WaitingComment(t) => (WaitingKind::Comment, t),
            State::WaitingProcessingInstruction(t) => (WaitingKind::ProcessingInstruction, t),
            State::WaitingTagOpen(t) => (WaitingKind::TagOpen, t),
            State::WaitingTagClose(t) => (WaitingKind::TagClose, t),
            State::Idle | State::Closed | State::Failed => return None,
        };
        Some((pending.0, pending.1.as_str()))
    }

    fn is_terminal(&self) -> bool {
        matches!(self, State::Closed | State::Failed)
    }
}

/// Outcome of scanning one token
enum Step {
    /// Token emitted, scanner moved past it
    Continue,
    /// Input ends inside the token, scanner left at its start
    Wait(WaitingKind),
}

/// Incremental XML tokenizer
///
/// Owns the open-tag stack and the waiting buffer. Not reusable once it has
/// been closed or has failed.
#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    /// Names of open elements, outermost first
    stack: Vec<String>,
}

impl Tokenizer {
    /// Create a new tokenizer
    pub fn new() -> Self {
        Tokenizer {
            state: State::Idle,
            stack: Vec::new(),
        }
    }

    /// Create a tokenizer with room for `depth` nested open elements
    pub fn with_capacity(depth: usize) -> Self {
        Tokenizer {
            state: State::Idle,
            stack: Vec::with_capacity(depth),
        }
    }

    /// Current number of open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Kind of the partial token held back from the last write, if any
    pub fn waiting_kind(&self) -> Option<WaitingKind> {
        self.state.pending().map(|(kind, _)| kind)
    }

    /// Number of bytes held back from the last write
    pub fn pending_len(&self) -> usize {
        self.state.pending().map_or(0, |(_, text)| text.len())
    }

    /// True once `close` has run or an error occurred
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Feed the next chunk, emitting every token it completes
    pub fn write<S: TokenSink>(&mut self, chunk: &str, sink: &mut S) -> Result<(), ParseError> {
        let pending = self.take_pending()?;

        let result = match pending {
            None => self
                .run(chunk, 0, false, sink)
                .map(|wait| wait.map(|(kind, start)| (kind, chunk[start..].to_string()))),
            Some((_, mut buffer)) => {
                let resume = buffer.len();
                buffer.push_str(chunk);
                match self.run(&buffer, resume, false, sink) {
                    // the pending token is still the first one, keep its allocation
                    Ok(Some((kind, 0))) => Ok(Some((kind, buffer))),
                    Ok(Some((kind, start))) => Ok(Some((kind, buffer[start..].to_string()))),
                    Ok(None) => Ok(None),
                    Err(err) => Err(err),
                }
            }
        };

        match result {
            Ok(Some((kind, text))) => {
                log::debug!(
                    target: LOG_TARGET,
                    "waiting for more input: {kind:?}, {} bytes held",
                    text.len()
                );
                self.state = State::waiting(kind, text);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Signal end of stream
    ///
    /// A pending text run is emitted; any other partial token, or any element
    /// still open, is an error.
    pub fn close<S: TokenSink>(&mut self, sink: &mut S) -> Result<(), ParseError> {
        let pending = self.take_pending()?;

        match self.finish(pending, sink) {
            Ok(()) => {
                log::debug!(target: LOG_TARGET, "tokenizer closed");
                self.state = State::Closed;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn finish<S: TokenSink>(
        &mut self,
        pending: Option<(WaitingKind, String)>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        if let Some((_, buffer)) = pending {
            if let Some((kind, start)) = self.run(&buffer, buffer.len(), true, sink)? {
                match kind {
                    WaitingKind::Text => emit(sink, Token::Text(&buffer[start..])),
                    WaitingKind::MarkupDeclaration => return Err(ParseError::UnclosedMarkupDeclaration),
                    WaitingKind::Cdata => return Err(ParseError::UnclosedCdata),
                    WaitingKind::Comment => return Err(ParseError::UnclosedComment),
                    WaitingKind::ProcessingInstruction => {
                        return Err(ParseError::UnclosedProcessingInstruction)
                    }
                    WaitingKind::TagOpen | WaitingKind::TagClose => return Err(ParseError::UnclosedTag),
                }
            }
        }

        if !self.stack.is_empty() {
            return Err(ParseError::UnclosedTags(std::mem::take(&mut self.stack)));
        }
        Ok(())
    }

    /// Move the waiting token out, leaving `Idle`; terminal states stay put
    fn take_pending(&mut self) -> Result<Option<(WaitingKind, String)>, ParseError> {
        if self.state.is_terminal() {
            return Err(ParseError::Finished);
        }
        let pending = match std::mem::replace(&mut self.state, State::Idle) {
            State::WaitingText(t) => (WaitingKind::Text, t),
            State::WaitingMarkupDeclaration(t) => (WaitingKind::MarkupDeclaration, t),
            State::WaitingCdata(t) => (WaitingKind::Cdata, t),
            State::WaitingComment(t) => (WaitingKind::Comment, t),
            State::WaitingProcessingInstruction(t) => (WaitingKind::ProcessingInstruction, t),
            State::WaitingTagOpen(t) => (WaitingKind::TagOpen, t),
            State::WaitingTagClose(t) => (WaitingKind::TagClose, t),
            State::Idle | State::Closed | State::Failed => return Ok(None),
        };
        Ok(Some(pending))
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        log::debug!(target: LOG_TARGET, "tokenizer failed: {err}");
        self.state = State::Failed;
        self.stack.clear();
        err
    }

    /// Scan `input` to its end
    ///
    /// `resume` is the length of the previously held prefix: the delimiter of
    /// the first token is known not to occur before it, so searches restart
    /// just short of it. Returns the kind and start offset of a token the
    /// input ends inside.
    fn run<S: TokenSink>(
        &mut self,
        input: &str,
        mut resume: usize,
        at_eof: bool,
        sink: &mut S,
    ) -> Result<Option<(WaitingKind, usize)>, ParseError> {
        let mut scanner = Scanner::new(input);

        while !scanner.is_eof() {
            let start = scanner.position();
            let step = match (scanner.peek(), scanner.peek_at(1)) {
                (Some(b'<'), Some(b'!')) => scan_markup_declaration(&mut scanner, resume, at_eof, sink)?,
                (Some(b'<'), Some(b'?')) => scan_processing_instruction(&mut scanner, resume, sink),
                (Some(b'<'), _) => self.scan_tag(&mut scanner, sink)?,
                _ => scan_text(&mut scanner, resume, sink),
            };

            if let Step::Wait(kind) = step {
                debug_assert_eq!(scanner.position(), start);
                return Ok(Some((kind, start)));
            }
            debug_assert!(scanner.position() > start);
            resume = 0;
        }

        Ok(None)
    }

    /// Opening, self-closing or closing tag starting at `<`
    fn scan_tag<S: TokenSink>(&mut self, scanner: &mut Scanner<'_>, sink: &mut S) -> Result<Step, ParseError> {
        let start = scanner.position();
        let closing = scanner.peek_at(1) == Some(b'/');

        let Some(gt) = scanner.find_tag_end() else {
            let kind = if closing { WaitingKind::TagClose } else { WaitingKind::TagOpen };
            return Ok(Step::Wait(kind));
        };

        if closing {
            let name = scanner.slice(start + 2, gt);
            self.pop_tag(name)?;
            emit(sink, Token::TagClose { name });
        } else {
            // gt >= start + 1, so the byte before it is at worst the '<'
            let self_closing = scanner.byte_at(gt - 1) == Some(b'/');
            let body_end = if self_closing { gt - 1 } else { gt };
            let body = scanner.slice(start + 1, body_end);

            let (name, attrs) = match find_index_outside(body, 0, is_whitespace_char, '"') {
                Some(0) => return Err(ParseError::WhitespaceLeadingTagName),
                Some(split) => body.split_at(split),
                None => (body, ""),
            };

            if !self_closing {
                self.stack.push(name.to_string());
            }
            emit(
                sink,
                Token::TagOpen {
                    name,
                    attrs,
                    self_closing,
                },
            );
        }

        scanner.set_position(gt + 1);
        Ok(Step::Continue)
    }

    fn pop_tag(&mut self, name: &str) -> Result<(), ParseError> {
        match self.stack.pop() {
            Some(open) if open == name => Ok(()),
            Some(open) => {
                self.stack.clear();
                Err(ParseError::MismatchedClosingTag {
                    expected: open,
                    found: name.to_string(),
                })
            }
            None => Err(ParseError::UnexpectedClosingTag(name.to_string())),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn emit<S: TokenSink>(sink: &mut S, token: Token<'_>) {
    log::trace!(target: LOG_TARGET, "emit token: {token:?}");
    sink.token(token);
}

/// Where to start looking for a closing delimiter
///
/// Never before the token's content; never earlier than needed given the
/// `resume` bytes already searched.
#[inline]
fn search_from(content_start: usize, resume: usize, delimiter: &str) -> usize {
    content_start.max(resume.saturating_sub(delimiter.len()))
}

/// Text run up to the next `<`
fn scan_text<S: TokenSink>(scanner: &mut Scanner<'_>, resume: usize, sink: &mut S) -> Step {
    let start = scanner.position();
    match scanner.find_byte_from(start.max(resume), b'<') {
        Some(end) => {
            emit(sink, Token::Text(scanner.slice(start, end)));
            scanner.set_position(end);
            Step::Continue
        }
        None => Step::Wait(WaitingKind::Text),
    }
}

/// `<!` : comment or CDATA, anything else is rejected
fn scan_markup_declaration<S: TokenSink>(
    scanner: &mut Scanner<'_>,
    resume: usize,
    at_eof: bool,
    sink: &mut S,
) -> Result<Step, ParseError> {
    match scanner.peek_at(2) {
        None => Ok(Step::Wait(WaitingKind::MarkupDeclaration)),
        Some(b'[') => scan_cdata(scanner, resume, sink),
        Some(b'-') => scan_comment(scanner, resume, at_eof, sink),
        Some(_) => Err(ParseError::UnrecognizedSequence(sequence_through(scanner.remaining(), 2))),
    }
}

/// `<![` commits to CDATA
fn scan_cdata<S: TokenSink>(scanner: &mut Scanner<'_>, resume: usize, sink: &mut S) -> Result<Step, ParseError> {
    let start = scanner.position();
    let rest = scanner.remaining();
    let seen = rest.len().min(CDATA_OPEN.len());

    if let Some(i) = rest.as_bytes()[..seen]
        .iter()
        .zip(CDATA_OPEN.as_bytes())
        .position(|(a, b)| a != b)
    {
        return Err(ParseError::UnrecognizedSequence(sequence_through(rest, i)));
    }
    if seen < CDATA_OPEN.len() {
        return Ok(Step::Wait(WaitingKind::Cdata));
    }

    let content_start = start + CDATA_OPEN.len();
    match scanner.find_str_from(search_from(content_start, resume, CDATA_CLOSE), CDATA_CLOSE) {
        Some(end) => {
            emit(sink, Token::CData(scanner.slice(content_start, end)));
            scanner.set_position(end + CDATA_CLOSE.len());
            Ok(Step::Continue)
        }
        None => Ok(Step::Wait(WaitingKind::Cdata)),
    }
}

/// `<!-` : comment, closed by the first `--`, which must be followed by `>`
fn scan_comment<S: TokenSink>(
    scanner: &mut Scanner<'_>,
    resume: usize,
    at_eof: bool,
    sink: &mut S,
) -> Result<Step, ParseError> {
    let start = scanner.position();
    match scanner.peek_at(3) {
        None => return Ok(Step::Wait(WaitingKind::Comment)),
        Some(b'-') => {}
        Some(_) => return Err(ParseError::UnrecognizedSequence(sequence_through(scanner.remaining(), 3))),
    }

    let content_start = start + COMMENT_OPEN.len();
    let Some(dashes) = scanner.find_str_from(search_from(content_start, resume, COMMENT_DASHES), COMMENT_DASHES) else {
        return Ok(Step::Wait(WaitingKind::Comment));
    };

    let after = dashes + COMMENT_DASHES.len();
    match scanner.byte_at(after) {
        Some(b'>') => {
            emit(sink, Token::Comment(scanner.slice(content_start, dashes)));
            scanner.set_position(after + 1);
            Ok(Step::Continue)
        }
        None if !at_eof => Ok(Step::Wait(WaitingKind::Comment)),
        _ => Err(ParseError::UnexpectedCommentDash(scanner.slice(start, after).to_string())),
    }
}

/// `<?` ... `?>`
fn scan_processing_instruction<S: TokenSink>(scanner: &mut Scanner<'_>, resume: usize, sink: &mut S) -> Step {
    let content_start = scanner.position() + PI_OPEN.len();
    match scanner.find_str_from(search_from(content_start, resume, PI_CLOSE), PI_CLOSE) {
        Some(end) => {
            emit(sink, Token::ProcessingInstruction(scanner.slice(content_start, end)));
            scanner.set_position(end + PI_CLOSE.len());
            Step::Continue
        }
        None => Step::Wait(WaitingKind::ProcessingInstruction),
    }
}

/// `rest` up to and including the character starting at byte `i`
fn sequence_through(rest: &str, i: usize) -> String {
    let end = i + rest[i..].chars().next().map_or(0, char::len_utf8);
    rest[..end].to_string()
}

/// Tokenize a complete document: one `write` followed by `close`
pub fn parse<S: TokenSink>(whole: &str, sink: &mut S) -> Result<(), ParseError> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.write(whole, sink)?;
    tokenizer.close(sink)
}

/// Tokenize a complete document into owned tokens
pub fn parse_to_vec(whole: &str) -> Result<Vec<OwnedToken>, ParseError> {
    let mut tokens = Vec::new();
    parse(whole, &mut tokens)?;
    Ok(tokens)
}
