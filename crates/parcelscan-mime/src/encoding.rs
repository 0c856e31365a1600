//! MIME transfer-encoding decoders.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded-word headers.
//! The scanner only ever decodes; notification mail is never generated.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or
/// the decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    String::from_utf8(decode_quoted_printable_bytes(text)?).map_err(Into::into)
}

/// Decodes Quoted-Printable text, replacing invalid UTF-8 sequences.
///
/// Carrier mail is frequently mislabeled; a best-effort decode that
/// preserves the ASCII around a bad byte still lets the tracking-number
/// patterns match.
///
/// # Errors
///
/// Returns an error only for malformed escape sequences.
pub fn decode_quoted_printable_lossy(text: &str) -> Result<String> {
    Ok(String::from_utf8_lossy(&decode_quoted_printable_bytes(text)?).into_owned())
}

fn decode_quoted_printable_bytes(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '=' {
            // Soft line break
            if chars.peek() == Some(&'\r') {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    continue;
                }
            } else if chars.peek() == Some(&'\n') {
                chars.next();
                continue;
            }

            // Hex encoded byte
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
            } else {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        } else {
            let mut utf8 = [0u8; 4];
            result.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        }
    }

    Ok(result)
}

/// Decodes an RFC 2047 encoded-word header value.
///
/// Format: `=?charset?encoding?encoded-text?=`. Values that are not
/// encoded words pass through unchanged.
///
/// # Errors
///
/// Returns an error if the input looks like an encoded word but is not
/// valid RFC 2047 format.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !text.starts_with("=?") || !text.ends_with("?=") {
        return Ok(text.to_string());
    }

    let inner = &text[2..text.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();

    if parts.len() != 3 {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    }

    let encoding = parts[1].to_uppercase();
    let encoded_text = parts[2];

    match encoding.as_str() {
        "B" => {
            let decoded = decode_base64(encoded_text)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => {
            // Quoted-Printable with underscore for space
            let text_with_spaces = encoded_text.replace('_', " ");
            decode_quoted_printable(&text_with_spaces)
        }
        _ => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {encoding}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_decode() {
        assert_eq!(decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap(), b"Hello, World!");
        // Whitespace inside transfer-encoded bodies is ignored
        assert_eq!(decode_base64("SGVs\r\nbG8=").unwrap(), b"Hello");
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(
            decode_quoted_printable("Hello, World!").unwrap(),
            "Hello, World!"
        );
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), "HelloWorld");
        assert_eq!(decode_quoted_printable("Hello=\nWorld").unwrap(), "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable("oops=4").is_err());
        assert!(decode_quoted_printable("oops=ZZ").is_err());
    }

    #[test]
    fn test_quoted_printable_lossy() {
        // =FF is not valid UTF-8 on its own; the lossy decoder keeps going
        let decoded = decode_quoted_printable_lossy("track =FF 4212345678").unwrap();
        assert!(decoded.contains("4212345678"));
    }

    #[test]
    fn test_rfc2047_passthrough() {
        assert_eq!(decode_rfc2047("Your Daily Digest").unwrap(), "Your Daily Digest");
    }

    #[test]
    fn test_rfc2047_base64() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
    }

    proptest! {
        #[test]
        fn qp_decode_never_panics(s in ".*") {
            let _ = decode_quoted_printable(&s);
            let _ = decode_quoted_printable_lossy(&s);
        }

        #[test]
        fn qp_ascii_roundtrips(s in "[ -<>-~]*") {
            // Printable ASCII without '=' passes through untouched
            prop_assert_eq!(decode_quoted_printable(&s).unwrap(), s);
        }
    }
}
