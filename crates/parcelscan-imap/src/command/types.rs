//! Command-related type definitions.

/// SEARCH criteria.
///
/// Only the criteria the mailbox scanner issues are modeled; the
/// serializer produces standard RFC 3501 search syntax, so new variants
/// can be added without touching the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// From contains text.
    From(String),
    /// Subject contains text.
    Subject(String),
    /// Messages with an internal date on or after the given date
    /// (`dd-Mon-yyyy`, e.g. `11-Jan-2026`).
    Since(String),
    /// Header field contains value.
    Header(String, String),
    /// AND of criteria (implicit juxtaposition in the wire format).
    And(Vec<Self>),
    /// OR of two criteria.
    Or(Box<Self>, Box<Self>),
}

impl SearchCriteria {
    /// Folds a list of sender addresses into a single criteria tree.
    ///
    /// Multiple senders become nested `OR (FROM a) (FROM b)` pairs; a
    /// single sender needs no OR wrapper. Returns `None` for an empty
    /// list.
    #[must_use]
    pub fn any_sender(senders: &[impl AsRef<str>]) -> Option<Self> {
        let mut iter = senders.iter().rev();
        let first = Self::From(iter.next()?.as_ref().to_string());
        Some(iter.fold(first, |acc, sender| {
            Self::Or(
                Box::new(Self::From(sender.as_ref().to_string())),
                Box::new(acc),
            )
        }))
    }

    /// Combines this criteria with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            _ => Self::And(vec![self, other]),
        }
    }
}

/// What a FETCH should retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    /// The full raw message without setting `\Seen` (`BODY.PEEK[]`).
    PeekFull,
    /// Only the header block (`BODY.PEEK[HEADER]`).
    PeekHeader,
    /// Only the text section (`BODY.PEEK[TEXT]`).
    PeekText,
}

impl FetchTarget {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::PeekFull => "BODY.PEEK[]",
            Self::PeekHeader => "BODY.PEEK[HEADER]",
            Self::PeekText => "BODY.PEEK[TEXT]",
        }
    }
}
