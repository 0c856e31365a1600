//! IMAP response parsing.
//!
//! The scanner only consumes a small slice of the response grammar:
//! tagged status lines, untagged SEARCH/EXISTS results, FETCH responses
//! carrying one body literal, and BYE. Everything else is passed through
//! as [`UntaggedReply::Other`] and ignored by the client.

use crate::types::Uid;

/// Completion status of a tagged response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedStatus {
    /// Command completed successfully.
    Ok(String),
    /// Operational error (e.g. mailbox does not exist).
    No(String),
    /// Protocol-level error (e.g. unknown command or bad syntax).
    Bad(String),
}

impl TaggedStatus {
    /// Parses a tagged status line for the given tag.
    ///
    /// Returns `None` if the line is not a tagged response for `tag`.
    #[must_use]
    pub fn parse(line: &[u8], tag: &str) -> Option<Self> {
        let text = std::str::from_utf8(line).ok()?.trim_end();
        let rest = text.strip_prefix(tag)?.strip_prefix(' ')?;
        let (status, trailing) = rest.split_once(' ').unwrap_or((rest, ""));

        match status.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok(trailing.to_string())),
            "NO" => Some(Self::No(trailing.to_string())),
            "BAD" => Some(Self::Bad(trailing.to_string())),
            _ => None,
        }
    }

    /// Returns true for an OK completion.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// An untagged server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedReply {
    /// `* SEARCH n n n` — matching UIDs (for UID SEARCH).
    Search(Vec<Uid>),
    /// `* n EXISTS` — message count after SELECT.
    Exists(u32),
    /// `* n RECENT` — recent count after SELECT.
    Recent(u32),
    /// `* n FETCH (...)` — carries the extracted body literal, if any.
    Fetch {
        /// Literal payload of the fetched section.
        body: Option<Vec<u8>>,
    },
    /// `* BYE ...` — server is closing the connection.
    Bye(String),
    /// Any other untagged line the scanner does not interpret.
    Other,
}

/// Parser for untagged replies.
pub struct ReplyParser;

impl ReplyParser {
    /// Parses a single untagged reply.
    ///
    /// `response` is one complete reply as returned by the framed reader,
    /// including any embedded literal bytes. Returns `None` for lines that
    /// are not untagged replies (continuation requests, tagged lines).
    #[must_use]
    pub fn parse(response: &[u8]) -> Option<UntaggedReply> {
        let rest = response.strip_prefix(b"* ")?;

        // The first line decides the reply shape; literals only occur in
        // FETCH replies and are handled on the raw bytes.
        let first_line_end = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(rest.len());
        let first_line = String::from_utf8_lossy(&rest[..first_line_end]);

        if let Some(ids) = first_line.strip_prefix("SEARCH") {
            let uids = ids
                .split_ascii_whitespace()
                .filter_map(|n| n.parse().ok())
                .map(Uid)
                .collect();
            return Some(UntaggedReply::Search(uids));
        }

        if let Some(text) = first_line.strip_prefix("BYE") {
            return Some(UntaggedReply::Bye(text.trim().to_string()));
        }

        let mut words = first_line.split_ascii_whitespace();
        if let (Some(count), Some(keyword)) = (words.next(), words.next())
            && let Ok(n) = count.parse::<u32>()
        {
            match keyword.to_ascii_uppercase().as_str() {
                "EXISTS" => return Some(UntaggedReply::Exists(n)),
                "RECENT" => return Some(UntaggedReply::Recent(n)),
                "FETCH" => {
                    return Some(UntaggedReply::Fetch {
                        body: extract_literal(rest).map(<[u8]>::to_vec),
                    });
                }
                _ => {}
            }
        }

        Some(UntaggedReply::Other)
    }
}

/// Extracts the first literal payload from a reply.
///
/// A literal is announced as `{n}\r\n` and followed by exactly `n` bytes.
fn extract_literal(response: &[u8]) -> Option<&[u8]> {
    let open = response.iter().position(|&b| b == b'{')?;
    let close = open + response[open..].iter().position(|&b| b == b'}')?;

    let digits = std::str::from_utf8(&response[open + 1..close]).ok()?;
    let len: usize = digits.strip_suffix('+').unwrap_or(digits).parse().ok()?;

    let start = close + 3; // skip "}\r\n"
    response.get(start..start + len)
}
