//! Header-block helpers.
//!
//! Works on the raw header text of a message or body part. Folded
//! continuation lines are unfolded before lookup so parameters split
//! across lines (a common sight in carrier mail) are not lost.

use crate::encoding::decode_rfc2047;

/// Returns the value of `name` from a raw header block, unfolded.
#[must_use]
pub fn get_header(headers: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;

    for line in headers.lines() {
        if let Some(v) = value.as_mut() {
            // Continuation lines belong to the header found above.
            if line.starts_with(' ') || line.starts_with('\t') {
                v.push(' ');
                v.push_str(line.trim());
                continue;
            }
            break;
        }

        if let Some(colon_idx) = line.find(':') {
            let header_name = line[..colon_idx].trim();
            if header_name.eq_ignore_ascii_case(name) {
                value = Some(line[colon_idx + 1..].trim().to_string());
            }
        }
    }

    value
}

/// Returns a header value with RFC 2047 encoded words decoded.
///
/// Decoding failures fall back to the raw value; a garbled subject is
/// still better than none for logging.
#[must_use]
pub fn get_header_decoded(headers: &str, name: &str) -> Option<String> {
    let raw = get_header(headers, name)?;
    let decoded = raw
        .split_whitespace()
        .map(|word| decode_rfc2047(word).unwrap_or_else(|_| word.to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    Some(decoded)
}

/// Extracts the bare address from a From-style header value.
///
/// Handles `Display Name <user@host>`, `<user@host>` and bare
/// `user@host` forms.
#[must_use]
pub fn address_of(header_value: &str) -> String {
    if let Some(open) = header_value.rfind('<') {
        if let Some(close) = header_value[open..].find('>') {
            return header_value[open + 1..open + close].trim().to_string();
        }
    }
    header_value.trim().to_string()
}

/// Extracts a parameter value (e.g. `boundary`, `name`) from a
/// structured header value such as Content-Type.
#[must_use]
pub fn header_param(header_value: &str, param: &str) -> Option<String> {
    let lower = header_value.to_lowercase();
    let needle = format!("{}=", param.to_lowercase());
    let idx = lower.find(&needle)?;
    let rest = &header_value[idx + needle.len()..];

    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const HEADERS: &str = "From: \"UPS\" <mcinfo@ups.com>\r\n\
Content-Type: multipart/mixed;\r\n\
\tboundary=\"----=_Part_42\"\r\n\
Subject: UPS Update: Package Scheduled for Delivery Today\r\n";

    #[test]
    fn test_get_header() {
        assert_eq!(
            get_header(HEADERS, "subject").unwrap(),
            "UPS Update: Package Scheduled for Delivery Today"
        );
        assert!(get_header(HEADERS, "date").is_none());
    }

    #[test]
    fn test_get_header_unfolds_continuations() {
        let value = get_header(HEADERS, "Content-Type").unwrap();
        assert!(value.contains("multipart/mixed"));
        assert!(value.contains("boundary=\"----=_Part_42\""));
    }

    #[test]
    fn test_address_of() {
        assert_eq!(address_of("\"UPS\" <mcinfo@ups.com>"), "mcinfo@ups.com");
        assert_eq!(address_of("<auto-reply@usps.com>"), "auto-reply@usps.com");
        assert_eq!(address_of("thehub@amazon.com"), "thehub@amazon.com");
    }

    #[test]
    fn test_header_param() {
        let ct = get_header(HEADERS, "content-type").unwrap();
        assert_eq!(header_param(&ct, "boundary").unwrap(), "----=_Part_42");
        assert!(header_param(&ct, "charset").is_none());
    }

    #[test]
    fn test_header_param_unquoted() {
        assert_eq!(
            header_param("text/plain; charset=us-ascii", "charset").unwrap(),
            "us-ascii"
        );
    }

    #[test]
    fn test_get_header_decoded() {
        let headers = "Subject: =?utf-8?Q?p=C3=A4ckchen?= unterwegs\r\n";
        assert_eq!(
            get_header_decoded(headers, "subject").unwrap(),
            "päckchen unterwegs"
        );
    }
}
