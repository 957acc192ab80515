//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present. Unknown entities are
//! kept verbatim.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
pub fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(amp_offset) = memchr(b'&', &bytes[pos..]) else {
            result.push_str(&input[pos..]);
            break;
        };

        // Copy everything before the entity
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let decoded = memchr(b';', &bytes[pos..])
            .and_then(|semi| decode_entity(&input[pos + 1..pos + semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                result.push(c);
                pos += semi + 1;
            }
            None => {
                // Unknown entity or no semicolon, keep the ampersand
                result.push('&');
                pos += 1;
            }
        }
    }

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.parse::<u32>().ok()?,
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text("&lt;hello&gt; &amp; &quot;world&quot; &apos;x&apos;");
        assert_eq!(result, "<hello> & \"world\" 'x'");
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode_text("&#65;&#66;&#67;"), "ABC");
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode_text("&#x41;&#X42;&#x43;"), "ABC");
    }

    #[test]
    fn test_unicode_entity() {
        assert_eq!(decode_text("&#x1F600;"), "😀");
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(decode_text("&unknown; & done"), "&unknown; & done");
    }

    #[test]
    fn test_invalid_codepoint_kept() {
        assert_eq!(decode_text("a&#0;b"), "a&#0;b");
    }
}
