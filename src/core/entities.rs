//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Anything else is passed through untouched. Uses Cow for zero-copy when no
//! entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Expand entity references in `input`
///
/// Returns Borrowed if no `&` is present (zero-copy), Owned otherwise.
/// Never fails: unknown names, malformed numeric references and a `&` with
/// no closing `;` are copied through verbatim.
pub fn parse_entities(input: &str) -> Cow<'_, str> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp_offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + amp_offset;
        result.push_str(&input[pos..amp]);

        let decoded = memchr(b';', &bytes[amp + 1..]).and_then(|semi_offset| {
            let semi = amp + 1 + semi_offset;
            decode_entity(&input[amp + 1..semi]).map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                result.push(c);
                pos = semi + 1;
            }
            None => {
                // Keep the ampersand, rescan from the next byte so a real
                // reference later in the run is still found
                result.push('&');
                pos = amp + 1;
            }
        }
    }

    result.push_str(&input[pos..]);
    result
}

/// Decode a single entity body (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => entity.strip_prefix('#').and_then(decode_numeric_entity),
    }
}

/// Decode a numeric character reference body (after `#`)
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let (digits, radix) = match entity.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16),
        None => (entity, 10),
    };

    // from_str_radix alone would accept a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }

    let codepoint = u32::from_str_radix(digits, radix).ok()?;
    char::from_u32(codepoint)
}
