//! Token types and the sink they are delivered to

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Character data between markup
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?...?>
    ProcessingInstruction,
    /// Element start tag, self-closing or not
    TagOpen,
    /// Element end tag: </element>
    TagClose,
}

/// A token borrowed from the tokenizer's current input
///
/// Contents are verbatim: delimiters are stripped, nothing is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    CData(&'a str),
    Comment(&'a str),
    /// Everything between `<?` and `?>`
    ProcessingInstruction(&'a str),
    TagOpen {
        name: &'a str,
        /// Raw text between the name and `>` or `/>`, leading whitespace included
        attrs: &'a str,
        self_closing: bool,
    },
    TagClose {
        name: &'a str,
    },
}

impl<'a> Token<'a> {
    #[inline]
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Text(_) => TokenKind::Text,
            Token::CData(_) => TokenKind::CData,
            Token::Comment(_) => TokenKind::Comment,
            Token::ProcessingInstruction(_) => TokenKind::ProcessingInstruction,
            Token::TagOpen { .. } => TokenKind::TagOpen,
            Token::TagClose { .. } => TokenKind::TagClose,
        }
    }

    pub fn to_owned_token(&self) -> OwnedToken {
        match *self {
            Token::Text(c) => OwnedToken::Text(c.to_string()),
            Token::CData(c) => OwnedToken::CData(c.to_string()),
            Token::Comment(c) => OwnedToken::Comment(c.to_string()),
            Token::ProcessingInstruction(c) => OwnedToken::ProcessingInstruction(c.to_string()),
            Token::TagOpen {
                name,
                attrs,
                self_closing,
            } => OwnedToken::TagOpen {
                name: name.to_string(),
                attrs: attrs.to_string(),
                self_closing,
            },
            Token::TagClose { name } => OwnedToken::TagClose {
                name: name.to_string(),
            },
        }
    }
}

/// Owned version of Token for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedToken {
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    TagOpen {
        name: String,
        attrs: String,
        self_closing: bool,
    },
    TagClose {
        name: String,
    },
}

impl OwnedToken {
    /// Borrow back as a [`Token`]
    pub fn as_token(&self) -> Token<'_> {
        match self {
            OwnedToken::Text(c) => Token::Text(c),
            OwnedToken::CData(c) => Token::CData(c),
            OwnedToken::Comment(c) => Token::Comment(c),
            OwnedToken::ProcessingInstruction(c) => Token::ProcessingInstruction(c),
            OwnedToken::TagOpen {
                name,
                attrs,
                self_closing,
            } => Token::TagOpen {
                name,
                attrs,
                self_closing: *self_closing,
            },
            OwnedToken::TagClose { name } => Token::TagClose { name },
        }
    }
}

impl From<Token<'_>> for OwnedToken {
    fn from(token: Token<'_>) -> Self {
        token.to_owned_token()
    }
}

/// Receiver for tokens
///
/// The tokenizer calls [`TokenSink::token`] synchronously, in document
/// order, from inside `write` and `close`. The borrowed payload is only valid
/// for the duration of the call.
pub trait TokenSink {
    fn token(&mut self, token: Token<'_>);
}

impl TokenSink for Vec<OwnedToken> {
    #[inline]
    fn token(&mut self, token: Token<'_>) {
        self.push(token.into());
    }
}

impl<F> TokenSink for F
where
    F: FnMut(Token<'_>),
{
    #[inline]
    fn token(&mut self, token: Token<'_>) {
        self(token)
    }
}
