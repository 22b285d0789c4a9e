//! Encoded-word production for header text.
//!
//! Only the encoding direction exists; encoded-words found while parsing
//! are left as they are.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Character set named in encoded-words built from Rust strings.
pub const UTF8_CHARSET: &str = "UTF-8";

/// Encodes data as padded standard Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Returns true if any byte is a control character or outside 7-bit ASCII.
///
/// CR and LF count as control characters.
#[must_use]
pub fn needs_encoding(data: &[u8]) -> bool {
    data.iter().any(|&b| b <= 0x1F || b >= 0x7F)
}

/// Encodes header text as an RFC 2047 style encoded-word when needed.
///
/// Text made only of printable ASCII is returned unchanged; anything else
/// becomes `=?UTF-8?B?<base64>?=`. `None` passes through.
///
/// ```
/// use mimetree::encoding::to_encoded_word;
///
/// assert_eq!(to_encoded_word(Some("plain")).as_deref(), Some("plain"));
/// assert_eq!(to_encoded_word(Some("Héllo")).as_deref(), Some("=?UTF-8?B?SMOpbGxv?="));
/// assert_eq!(to_encoded_word(None), None);
/// ```
#[must_use]
pub fn to_encoded_word(text: Option<&str>) -> Option<String> {
    text.map(|text| to_encoded_word_with(text.as_bytes(), UTF8_CHARSET))
}

/// Encodes bytes in a declared character set as an encoded-word when needed.
#[must_use]
pub fn to_encoded_word_with(data: &[u8], charset: &str) -> String {
    if needs_encoding(data) {
        format!("=?{charset}?B?{}?=", encode_base64(data))
    } else {
        // Printable ASCII only, so this is lossless.
        String::from_utf8_lossy(data).into_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_needs_encoding() {
        assert!(!needs_encoding(b"Hello, World! ~"));
        assert!(needs_encoding(b"line\r\nbreak"));
        assert!(needs_encoding(b"tab\there"));
        assert!(needs_encoding(b"\x7f"));
        assert!(needs_encoding("Wørld".as_bytes()));
    }

    #[test]
    fn test_plain_ascii_passes_through() {
        assert_eq!(
            to_encoded_word(Some("Re: meeting at 10")).as_deref(),
            Some("Re: meeting at 10")
        );
        assert_eq!(to_encoded_word(Some("")).as_deref(), Some(""));
    }

    #[test]
    fn test_control_byte_is_encoded() {
        let encoded = to_encoded_word(Some("a\u{1}b")).unwrap();
        assert_eq!(encoded, "=?UTF-8?B?YQFi?=");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_none_passes_through() {
        assert_eq!(to_encoded_word(None), None);
    }

    #[test]
    fn test_declared_charset() {
        // "café" in ISO-8859-1
        let encoded = to_encoded_word_with(b"caf\xe9", "ISO-8859-1");
        assert_eq!(encoded, "=?ISO-8859-1?B?Y2Fm6Q==?=");
    }
}
