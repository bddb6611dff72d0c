//! Byte chunk decoding
//!
//! Transports deliver bytes, the tokenizer consumes `&str`. The encoding is
//! taken from the byte order mark: UTF-16 LE/BE input is converted to UTF-8,
//! anything else is read as UTF-8. A chunk boundary may fall inside a
//! character, so the incomplete tail of a chunk is carried into the next one.

use std::borrow::Cow;
use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Encoding announced by a byte order mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark, defaulting to UTF-8
    pub fn detect(input: &[u8]) -> Self {
        if input.starts_with(UTF16_LE_BOM) {
            XmlEncoding::Utf16Le
        } else if input.starts_with(UTF16_BE_BOM) {
            XmlEncoding::Utf16Be
        } else {
            XmlEncoding::Utf8
        }
    }

    fn bom(self) -> &'static [u8] {
        match self {
            XmlEncoding::Utf8 => UTF8_BOM,
            XmlEncoding::Utf16Le => UTF16_LE_BOM,
            XmlEncoding::Utf16Be => UTF16_BE_BOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid UTF-8 in input")]
    InvalidUtf8,
    #[error("Invalid UTF-16 in input")]
    InvalidUtf16,
}

/// Incremental decoder for a stream of byte chunks
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    /// Set once the start of the stream has been checked for a BOM
    encoding: Option<XmlEncoding>,
    /// Bytes of an incomplete character, or of a possible BOM, from the last chunk
    carry: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoding of the stream, once enough bytes have been seen
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    /// Number of bytes held back from previous chunks
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    /// Decode the next chunk
    ///
    /// Returns all complete characters available so far. Borrows `chunk`
    /// for UTF-8 input when nothing is carried over in either direction.
    pub fn decode<'c>(&mut self, chunk: &'c [u8]) -> Result<Cow<'c, str>, DecodeError> {
        if self.encoding == Some(XmlEncoding::Utf8) && self.carry.is_empty() {
            let (text, tail) = split_utf8(chunk)?;
            self.carry.extend_from_slice(tail);
            return Ok(Cow::Borrowed(text));
        }

        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);

        let encoding = match self.encoding {
            Some(encoding) => encoding,
            None => {
                if is_partial_bom(&bytes) {
                    self.carry = bytes;
                    return Ok(Cow::Borrowed(""));
                }
                let encoding = XmlEncoding::detect(&bytes);
                if bytes.starts_with(encoding.bom()) {
                    bytes.drain(..encoding.bom().len());
                }
                self.encoding = Some(encoding);
                encoding
            }
        };

        let (text, tail) = match encoding {
            XmlEncoding::Utf8 => {
                let (text, tail) = split_utf8(&bytes)?;
                (text.to_string(), tail)
            }
            XmlEncoding::Utf16Le | XmlEncoding::Utf16Be => split_utf16(&bytes, encoding)?,
        };
        self.carry = tail.to_vec();
        Ok(Cow::Owned(text))
    }

    /// Check that the stream did not end inside a character
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.carry.is_empty() {
            return Ok(());
        }
        match self.encoding {
            Some(XmlEncoding::Utf16Le | XmlEncoding::Utf16Be) => Err(DecodeError::InvalidUtf16),
            _ => Err(DecodeError::InvalidUtf8),
        }
    }
}

/// Non-empty proper prefix of one of the byte order marks
fn is_partial_bom(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && [UTF8_BOM, UTF16_LE_BOM, UTF16_BE_BOM]
            .iter()
            .any(|bom| bom.len() > bytes.len() && bom.starts_with(bytes))
}

/// Split into the longest valid prefix and an incomplete trailing sequence
fn split_utf8(bytes: &[u8]) -> Result<(&str, &[u8]), DecodeError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((text, &[])),
        // error_len() is None only for a sequence cut off by the end of input
        Err(e) if e.error_len().is_none() => {
            let (head, tail) = bytes.split_at(e.valid_up_to());
            std::str::from_utf8(head)
                .map(|text| (text, tail))
                .map_err(|_| DecodeError::InvalidUtf8)
        }
        Err(_) => Err(DecodeError::InvalidUtf8),
    }
}

/// Convert complete UTF-16 code units to UTF-8
///
/// An odd trailing byte, and a trailing high surrogate whose pair has not
/// arrived yet, are returned as the tail.
fn split_utf16(bytes: &[u8], encoding: XmlEncoding) -> Result<(String, &[u8]), DecodeError> {
    let unit = |pair: &[u8]| match encoding {
        XmlEncoding::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
        _ => u16::from_le_bytes([pair[0], pair[1]]),
    };

    let mut end = bytes.len() - bytes.len() % 2;
    if end >= 2 && (0xD800..0xDC00).contains(&unit(&bytes[end - 2..end])) {
        end -= 2;
    }

    let text = char::decode_utf16(bytes[..end].chunks_exact(2).map(unit))
        .collect::<Result<String, _>>()
        .map_err(|_| DecodeError::InvalidUtf16)?;
    Ok((text, &bytes[end..]))
}
