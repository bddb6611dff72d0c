//! Quote-aware scanning over string input
//!
//! Uses memchr for delimiter search. Every delimiter the tokenizer looks for
//! is ASCII, so byte offsets returned here always fall on `char` boundaries
//! of the scanned `&str` and can be used to slice it directly.

use memchr::{memchr, memmem};

/// Cursor over a string being tokenized
///
/// `pos` always points at the first unconsumed byte.
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.input.len());
        self.pos = pos;
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get the unconsumed rest of the input
    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Get a slice from start to end positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    /// Byte at an absolute position
    #[inline]
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.input.as_bytes().get(pos).copied()
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Find next occurrence of a byte at or after `from`
    #[inline]
    pub fn find_byte_from(&self, from: usize, byte: u8) -> Option<usize> {
        memchr(byte, &self.input.as_bytes()[from..]).map(|i| from + i)
    }

    /// Find next occurrence of a multi-byte delimiter at or after `from`
    #[inline]
    pub fn find_str_from(&self, from: usize, needle: &str) -> Option<usize> {
        memmem::find(&self.input.as_bytes()[from..], needle.as_bytes()).map(|i| from + i)
    }

    /// Find the `>` closing a tag that starts at the current position
    ///
    /// `>` inside a `"..."` or `'...'` attribute value does not count. A quote
    /// of one kind inside a span of the other kind is literal.
    pub fn find_tag_end(&self) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut in_single_quote = false;
        let mut in_double_quote = false;

        for (pos, &b) in bytes.iter().enumerate().skip(self.pos) {
            match b {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(pos),
                _ => {}
            }
        }
        None
    }
}

/// Find the first character at or after `from` matching `predicate` that is
/// not inside a span delimited by `quote`
///
/// Quote state toggles on every occurrence of `quote`; there is no escaping.
/// Returns `None` if no match exists or the input ends inside a quote.
pub fn find_index_outside<P>(input: &str, from: usize, mut predicate: P, quote: char) -> Option<usize>
where
    P: FnMut(char) -> bool,
{
    let mut quoted = false;
    for (i, c) in input[from..].char_indices() {
        if c == quote {
            quoted = !quoted;
        } else if !quoted && predicate(c) {
            return Some(from + i);
        }
    }
    None
}

/// Check if byte is XML whitespace
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// `char` form of [`is_whitespace`] for use as a scan predicate
#[inline]
pub fn is_whitespace_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_index_outside_skips_quoted() {
        let input = r#"a="5 > 1">rest"#;
        assert_eq!(find_index_outside(input, 0, |c| c == '>', '"'), Some(9));
    }

    #[test]
    fn test_find_index_outside_from_offset() {
        assert_eq!(find_index_outside("x>y>z", 2, |c| c == '>', '"'), Some(3));
    }

    #[test]
    fn test_find_index_outside_unterminated_quote() {
        assert_eq!(find_index_outside(r#"a="b>"#, 0, |c| c == '>', '"'), None);
    }

    #[test]
    fn test_find_index_outside_no_match() {
        assert_eq!(find_index_outside("abc", 0, |c| c == '>', '"'), None);
    }

    #[test]
    fn test_find_index_outside_multibyte() {
        let input = "é\"ü \" x";
        let idx = find_index_outside(input, 0, is_whitespace_char, '"').unwrap();
        assert_eq!(&input[idx..], " x");
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new("<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end(), Some(15));
    }

    #[test]
    fn test_find_tag_end_single_quotes() {
        let scanner = Scanner::new("<a b='>' c=\"it's\">");
        assert_eq!(scanner.find_tag_end(), Some(17));
    }

    #[test]
    fn test_find_str_from() {
        let scanner = Scanner::new("<!-- a - b -->");
        assert_eq!(scanner.find_str_from(4, "--"), Some(11));
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new("  \t\n hello");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
        assert_eq!(scanner.remaining(), "hello");
    }
}
