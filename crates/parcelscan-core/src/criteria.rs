//! Search criteria building.
//!
//! Turns a rule's senders, the scan's day window, and an optional
//! subject filter into protocol-level search criteria.

use chrono::{Days, Local, NaiveDate};
use parcelscan_imap::SearchCriteria;

/// First day of the scan window: today minus `days_old`.
///
/// "Today" is the wall-clock date of the scanning process; the window is
/// calendar-based and deliberately does no timezone conversion.
#[must_use]
pub fn scan_window_start(days_old: u32) -> NaiveDate {
    let today = Local::now().date_naive();
    today
        .checked_sub_days(Days::new(u64::from(days_old)))
        .unwrap_or(today)
}

/// Renders a date in the IMAP SEARCH format, e.g. `05-Aug-2026`.
#[must_use]
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Builds search criteria for a set of senders.
///
/// Senders are OR-folded (no wrapper for a single sender), then combined
/// with `SINCE` and, when given, a `SUBJECT` substring filter. Sender
/// strings are passed through opaquely; the wire serializer quotes
/// whatever needs quoting. Returns `None` for an empty sender list.
#[must_use]
pub fn build_search(
    senders: &[impl AsRef<str>],
    since: NaiveDate,
    subject: Option<&str>,
) -> Option<SearchCriteria> {
    let mut criteria =
        SearchCriteria::any_sender(senders)?.and(SearchCriteria::Since(imap_date(since)));
    if let Some(subject) = subject {
        criteria = criteria.and(SearchCriteria::Subject(subject.to_string()));
    }
    Some(criteria)
}
