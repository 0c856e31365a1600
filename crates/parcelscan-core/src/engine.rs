//! Count/extract engine.
//!
//! Evaluates one carrier rule against the session: builds criteria per
//! subject variant, unions the matched UIDs, and either counts them or
//! fetches each body and extracts tracking values with the rule's
//! pattern. Nothing in here aborts the scan; a failed search yields
//! zero and a bad message is skipped.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use parcelscan_mime::Message;

use crate::criteria::build_search;
use crate::rules::{self, RuleMode};
use crate::session::{MailSession, ReplyStatus, Uid};

/// Result of evaluating one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountResult {
    /// Number of matched messages (count mode) or distinct extracted
    /// values (extract mode).
    pub count: u32,
    /// Extracted tracking values, first-seen order, no duplicates.
    pub tracking: Vec<String>,
}

/// Evaluates the rule for `key` against the session.
///
/// `extract` enables value extraction for rules that carry a pattern;
/// when off (or when the rule has no pattern) the result is a distinct
/// message count. Unknown keys report zero.
pub async fn get_count<S: MailSession>(
    session: &mut S,
    key: &str,
    extract: bool,
    since: NaiveDate,
) -> CountResult {
    let Some(rule) = rules::rule(key) else {
        debug!("No rule for resource {key}");
        return CountResult::default();
    };

    let uids = matched_uids(session, rule.senders, rule.subjects, since).await;

    let pattern = match rule.mode {
        RuleMode::Extract if extract => rules::pattern_for(key),
        _ => None,
    };
    let Some(pattern) = pattern else {
        return CountResult {
            count: u32::try_from(uids.len()).unwrap_or(u32::MAX),
            tracking: Vec::new(),
        };
    };

    let mut tracking: Vec<String> = Vec::new();
    for uid in uids {
        let reply = session.fetch(uid).await;
        if !reply.status.is_ok() {
            continue;
        }
        let Some(raw) = reply.body else { continue };

        let message = match Message::parse(&raw) {
            Ok(message) => message,
            Err(err) => {
                warn!("Problem decoding email message: {err}");
                continue;
            }
        };

        extract_into(&message, pattern, &mut tracking);
    }

    CountResult {
        count: u32::try_from(tracking.len()).unwrap_or(u32::MAX),
        tracking,
    }
}

/// Searches every subject variant and unions the matched UIDs.
///
/// A BAD status complaining about UTF-8 support retries once with the
/// subject filter dropped; some servers cannot search non-ASCII subject
/// strings and a broader sender-only query still finds the mail.
pub async fn matched_uids<S: MailSession>(
    session: &mut S,
    senders: &[impl AsRef<str>],
    subjects: &[&str],
    since: NaiveDate,
) -> Vec<Uid> {
    let mut uids: Vec<Uid> = Vec::new();

    let subjects: Vec<Option<&str>> = if subjects.is_empty() {
        vec![None]
    } else {
        subjects.iter().map(|s| Some(*s)).collect()
    };

    for subject in subjects {
        let Some(criteria) = build_search(senders, since, subject) else {
            continue;
        };
        let mut reply = session.search(&criteria).await;

        if let ReplyStatus::Bad(text) = &reply.status
            && subject.is_some()
            && text.to_uppercase().contains("UTF-8")
        {
            warn!("UTF-8 not supported: {text}");
            if let Some(fallback) = build_search(senders, since, None) {
                reply = session.search(&fallback).await;
            }
        }

        if !reply.status.is_ok() {
            continue;
        }
        for uid in reply.uids {
            if !uids.contains(&uid) {
                uids.push(uid);
            }
        }
    }

    uids
}

/// Applies the pattern to a message body, collecting unique matches.
///
/// The plain-text body is tried first; when it is absent or yields
/// nothing, the HTML body is stripped to text and searched with the same
/// pattern, so HTML-only notifications still produce tracking numbers.
fn extract_into(message: &Message, pattern: &Regex, tracking: &mut Vec<String>) {
    let before = tracking.len();

    if let Some(text) = &message.text_body {
        collect_matches(pattern, text, tracking);
    }

    if tracking.len() == before
        && let Some(html) = &message.html_body
    {
        let stripped = htmd::convert(html).unwrap_or_else(|_| html.clone());
        collect_matches(pattern, &stripped, tracking);
    }
}

fn collect_matches(pattern: &Regex, text: &str, tracking: &mut Vec<String>) {
    for found in pattern.find_iter(text) {
        let value = found.as_str().to_string();
        if !tracking.contains(&value) {
            tracking.push(value);
        }
    }
}
