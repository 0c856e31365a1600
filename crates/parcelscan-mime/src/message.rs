//! Parsed message structure.
//!
//! A fetched message is reduced to what the scanner consumes: the raw
//! header block, the first text and HTML bodies (transfer-decoded), and
//! any image attachments. Full MIME-tree reconstruction is deliberately
//! out of scope.

use crate::encoding::{decode_base64, decode_quoted_printable_lossy};
use crate::error::Result;
use crate::header::{address_of, get_header, get_header_decoded, header_param};

/// Maximum multipart nesting the walker will follow.
const MAX_DEPTH: usize = 8;

/// An image (or other file) attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name from the part headers, if any.
    pub filename: String,
    /// MIME type of the part.
    pub content_type: String,
    /// Decoded payload.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Returns true if the attachment is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// A fetched message, decoded far enough for classification.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Raw top-level header block.
    pub headers: String,
    /// First `text/plain` body, transfer-decoded.
    pub text_body: Option<String>,
    /// First `text/html` body, transfer-decoded.
    pub html_body: Option<String>,
    /// Attachments (inline images included).
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Parses a raw RFC 822 message.
    ///
    /// # Errors
    ///
    /// Returns an error when a text part carries malformed
    /// quoted-printable data. Unsupported charsets degrade to a lossy
    /// decode instead of failing; undecodable attachments are skipped.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        let (headers, body) = split_headers_body(&text);

        let mut message = Self {
            headers: headers.clone(),
            ..Self::default()
        };
        walk_part(&headers, &body, &mut message, 0)?;
        Ok(message)
    }

    /// Sender address from the From header.
    #[must_use]
    pub fn sender(&self) -> Option<String> {
        get_header(&self.headers, "from").map(|v| address_of(&v))
    }

    /// Decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        get_header_decoded(&self.headers, "subject")
    }

    /// Raw Date header.
    #[must_use]
    pub fn date(&self) -> Option<String> {
        get_header(&self.headers, "date")
    }

    /// Image attachments only.
    #[must_use]
    pub fn images(&self) -> Vec<&Attachment> {
        self.attachments.iter().filter(|a| a.is_image()).collect()
    }
}

/// Recursively walks one part, filling in the message.
fn walk_part(headers: &str, body: &str, message: &mut Message, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }

    let content_type = get_header(headers, "content-type").unwrap_or_default();
    let type_lower = content_type.to_lowercase();

    if type_lower.starts_with("multipart/") {
        if let Some(boundary) = header_param(&content_type, "boundary") {
            for part in split_multipart(body, &boundary) {
                let (part_headers, part_body) = split_headers_body(&part);
                walk_part(&part_headers, &part_body, message, depth + 1)?;
            }
        }
        return Ok(());
    }

    let disposition = get_header(headers, "content-disposition").unwrap_or_default();
    let is_attachment = disposition.to_lowercase().starts_with("attachment")
        || type_lower.starts_with("image/");

    if is_attachment {
        if let Some(attachment) = decode_attachment(headers, body, &content_type, &disposition) {
            message.attachments.push(attachment);
        }
        return Ok(());
    }

    if type_lower.starts_with("text/html") {
        if message.html_body.is_none() {
            message.html_body = Some(decode_text(headers, body)?);
        }
    } else if message.text_body.is_none() {
        // text/plain and untyped parts default to plain text
        message.text_body = Some(decode_text(headers, body)?);
    }

    Ok(())
}

/// Decodes a text part per its Content-Transfer-Encoding.
fn decode_text(headers: &str, body: &str) -> Result<String> {
    let encoding = get_header(headers, "content-transfer-encoding")
        .unwrap_or_else(|| "7bit".to_string())
        .to_lowercase();

    match encoding.as_str() {
        "base64" => {
            let bytes = decode_base64(body)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "quoted-printable" => decode_quoted_printable_lossy(body),
        _ => Ok(body.to_string()),
    }
}

/// Decodes an attachment part; returns `None` if the payload is unusable.
fn decode_attachment(
    headers: &str,
    body: &str,
    content_type: &str,
    disposition: &str,
) -> Option<Attachment> {
    let encoding = get_header(headers, "content-transfer-encoding")
        .unwrap_or_else(|| "base64".to_string())
        .to_lowercase();

    let data = match encoding.as_str() {
        "base64" => decode_base64(body).ok()?,
        _ => body.as_bytes().to_vec(),
    };

    let filename = header_param(disposition, "filename")
        .or_else(|| header_param(content_type, "name"))
        .unwrap_or_default();

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    Some(Attachment {
        filename,
        content_type: mime,
        data,
    })
}

/// Splits a message or part into headers and body at the first blank line.
#[allow(clippy::option_if_let_else)] // chained if-let is clearer here
fn split_headers_body(message: &str) -> (String, String) {
    if let Some(idx) = message.find("\r\n\r\n") {
        (message[..idx].to_string(), message[idx + 4..].to_string())
    } else if let Some(idx) = message.find("\n\n") {
        (message[..idx].to_string(), message[idx + 2..].to_string())
    } else {
        (message.to_string(), String::new())
    }
}

/// Splits a multipart body into its parts using the boundary.
fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    let mut parts = Vec::new();

    for part in body.split(&delimiter) {
        let trimmed = part.trim();

        // Skip the preamble and the final closing boundary
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        let clean = trimmed.strip_suffix(&end_delimiter).unwrap_or(trimmed);
        if !clean.trim().is_empty() {
            parts.push(clean.to_string());
        }
    }

    parts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SIMPLE: &str = "From: <mcinfo@ups.com>\r\n\
Subject: UPS Update: Package Scheduled for Delivery Today\r\n\
Content-Type: text/plain\r\n\
\r\n\
Tracking Number: 1Z2345YY0678901234\r\n";

    #[test]
    fn test_parse_simple() {
        let message = Message::parse(SIMPLE.as_bytes()).unwrap();
        assert_eq!(message.sender().unwrap(), "mcinfo@ups.com");
        assert!(
            message
                .text_body
                .unwrap()
                .contains("1Z2345YY0678901234")
        );
        assert!(message.html_body.is_none());
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_parse_multipart_alternative() {
        let raw = "From: <auto-reply@usps.com>\r\n\
Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain part\r\n\
--XYZ\r\n\
Content-Type: text/html\r\n\
\r\n\
<html><body>html part</body></html>\r\n\
--XYZ--\r\n";

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.text_body.as_deref().unwrap().trim(), "plain part");
        assert!(message.html_body.unwrap().contains("html part"));
    }

    #[test]
    fn test_parse_quoted_printable_body() {
        let raw = "From: <versandbestaetigung@amazon.de>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Bestellung #123-1234567-1234567 =E2=80=93 unterwegs\r\n";

        let message = Message::parse(raw.as_bytes()).unwrap();
        let body = message.text_body.unwrap();
        assert!(body.contains("123-1234567-1234567"));
        assert!(body.contains('–'));
    }

    #[test]
    fn test_parse_bad_quoted_printable_is_error() {
        let raw = "From: <x@y.com>\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
broken =Z escape\r\n";

        assert!(Message::parse(raw.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_image_attachment() {
        // "image bytes" base64-encoded
        let raw = "From: <USPSInformedDelivery@usps.gov>\r\n\
Content-Type: multipart/mixed; boundary=\"B\"\r\n\
\r\n\
--B\r\n\
Content-Type: text/plain\r\n\
\r\n\
Your mail is arriving soon.\r\n\
--B\r\n\
Content-Type: image/jpeg; name=\"mailpiece.jpg\"\r\n\
Content-Disposition: attachment; filename=\"mailpiece.jpg\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aW1hZ2UgYnl0ZXM=\r\n\
--B--\r\n";

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.images().len(), 1);
        let image = &message.attachments[0];
        assert_eq!(image.filename, "mailpiece.jpg");
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.data, b"image bytes");
    }

    #[test]
    fn test_parse_nested_multipart() {
        let raw = "From: <a@b.com>\r\n\
Content-Type: multipart/mixed; boundary=\"OUTER\"\r\n\
\r\n\
--OUTER\r\n\
Content-Type: multipart/alternative; boundary=\"INNER\"\r\n\
\r\n\
--INNER\r\n\
Content-Type: text/plain\r\n\
\r\n\
nested plain\r\n\
--INNER--\r\n\
\r\n\
--OUTER--\r\n";

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.text_body.as_deref().unwrap().trim(), "nested plain");
    }
}
