//! Amazon extraction subsystem.
//!
//! Amazon is the highest-volume sender and the least uniform: regional
//! notification addresses per marketplace domain, quoted-printable
//! bodies, forwarded mail, and several date formats inside the body
//! text. Everything here is best-effort; a message that will not decode
//! is logged and skipped, and a failed search yields an empty result.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use parcelscan_mime::Message;

use crate::engine::matched_uids;
use crate::images;
use crate::session::{MailSession, Uid};

/// Local parts of the regional shipment-notification addresses.
///
/// Joined with the configured marketplace domain; the same set serves
/// shipped, delivered, and exception scanning.
pub const SHIPMENT_LOCAL_PARTS: [&str; 8] = [
    "shipment-tracking",
    "order-update",
    "conferma-spedizione",
    "confirmar-envio",
    "versandbestaetigung",
    "confirmation-commande",
    "verzending-volgen",
    "update-bestelling",
];

/// Hub locker pickup notification senders.
const HUB_SENDERS: &[&str] = &["thehub@amazon.com", "amazonlockers@amazon.com"];

/// Hub locker pickup subjects.
const HUB_SUBJECTS: &[&str] = &["ready for pickup from Amazon Hub Locker", "is ready for pickup"];

/// One-time passcode senders and subjects.
const OTP_SENDERS: &[&str] = &["account-update@amazon.com", "no-reply@amazon.com"];
const OTP_SUBJECTS: &[&str] = &["Your one-time passcode", "One-Time Password"];

/// Delay/exception notification subjects.
const EXCEPTION_SUBJECTS: &[&str] = &["Delivery update:", "has been delayed"];

/// Delivered notification subjects across marketplaces.
const DELIVERED_SUBJECTS: &[&str] = &[
    "Delivered: Your",
    "Consegnato:",
    "Entregado:",
    "Zugestellt:",
    "Bezorgd:",
    "Livré :",
];

/// Markers introducing the expected arrival date in a shipment body,
/// lowercase.
const ARRIVAL_MARKERS: &[&str] = &["arriving:", "guaranteed delivery date:", "delivery estimate:"];

#[allow(clippy::expect_used)] // hard-coded patterns, exercised by tests
static ORDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{7}-\d{7}\b").expect("order pattern"));

#[allow(clippy::expect_used)] // hard-coded patterns, exercised by tests
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{6}\b").expect("code pattern"));

#[allow(clippy::expect_used)] // hard-coded patterns, exercised by tests
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="(https?://[^"]+)""#).expect("img pattern"));

/// Ordered date-format attempts for arrival chunks, year appended.
const DATE_FORMATS: &[&str] = &["%d %b %Y", "%b %d %Y", "%d %B %Y", "%B %d %Y"];

/// Builds the sender list for shipment-related searches:
/// forwarders first, then the regional addresses on `domain`.
#[must_use]
pub fn notification_senders(domain: &str, fwds: &[String]) -> Vec<String> {
    let mut senders: Vec<String> = fwds.to_vec();
    senders.extend(
        SHIPMENT_LOCAL_PARTS
            .iter()
            .map(|local| format!("{local}@{domain}")),
    );
    debug!("Amazon email list: {senders:?}");
    senders
}

/// Which facet of the shipment scan a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmazonField {
    /// Number of unique orders arriving on or after the reference date.
    Count,
    /// The unique order numbers, in discovery order.
    Order,
}

/// One facet of the shipment scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmazonItems {
    /// Order count.
    Count(u32),
    /// Order numbers.
    Orders(Vec<String>),
}

/// Shipment scan result: both facets from one message fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmazonShipments {
    /// Unique orders with an arrival date on or after the reference day.
    pub count: u32,
    /// All unique order numbers seen, in discovery order.
    pub orders: Vec<String>,
}

/// Returns one facet of the shipment scan.
///
/// Kept for callers that only want a single value; the orchestrator uses
/// [`scan_shipments`] directly so both facets come from one fetch pass.
pub async fn get_items<S: MailSession>(
    session: &mut S,
    field: AmazonField,
    fwds: &[String],
    domain: &str,
    since: NaiveDate,
    today: NaiveDate,
) -> AmazonItems {
    let shipments = scan_shipments(session, fwds, domain, since, today).await;
    match field {
        AmazonField::Count => AmazonItems::Count(shipments.count),
        AmazonField::Order => AmazonItems::Orders(shipments.orders),
    }
}

/// Scans shipment notifications for order numbers and arrival dates.
pub async fn scan_shipments<S: MailSession>(
    session: &mut S,
    fwds: &[String],
    domain: &str,
    since: NaiveDate,
    today: NaiveDate,
) -> AmazonShipments {
    let senders = notification_senders(domain, fwds);
    let uids = matched_uids(session, &senders, &[], since).await;

    let mut orders: Vec<String> = Vec::new();
    let mut arriving: HashSet<String> = HashSet::new();

    for uid in uids {
        let Some(message) = fetch_message(session, uid).await else {
            continue;
        };
        let Some(text) = body_text(&message) else {
            continue;
        };

        let message_orders: Vec<String> = ORDER_RE
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect();
        for order in &message_orders {
            if !orders.contains(order) {
                orders.push(order.clone());
            }
        }

        let arrival = arrival_chunk(&text).and_then(|chunk| {
            debug!("First pass: {chunk}");
            parse_arrival_date(&chunk, today.year())
        });
        if arrival.is_some_and(|date| date >= today) {
            arriving.extend(message_orders);
        }
    }

    AmazonShipments {
        count: u32::try_from(arriving.len()).unwrap_or(u32::MAX),
        orders,
    }
}

/// Hub locker scan result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubResult {
    /// Number of pickup codes found.
    pub count: u32,
    /// The pickup codes, in discovery order.
    pub codes: Vec<String>,
}

/// Scans hub locker notifications for pickup codes.
///
/// A failed search (or one returning nothing usable) yields the empty
/// result, never an error.
pub async fn amazon_hub<S: MailSession>(
    session: &mut S,
    fwds: &[String],
    since: NaiveDate,
) -> HubResult {
    let mut senders: Vec<String> = fwds.to_vec();
    senders.extend(HUB_SENDERS.iter().map(ToString::to_string));

    let uids = matched_uids(session, &senders, HUB_SUBJECTS, since).await;
    let codes = collect_codes(session, uids).await;

    HubResult {
        count: u32::try_from(codes.len()).unwrap_or(u32::MAX),
        codes,
    }
}

/// One-time passcode scan result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OtpResult {
    /// The passcodes, in discovery order.
    pub codes: Vec<String>,
}

/// Extracts one-time passcodes from the fixed OTP sender/subject.
pub async fn amazon_otp<S: MailSession>(session: &mut S, since: NaiveDate) -> OtpResult {
    let senders: Vec<String> = OTP_SENDERS.iter().map(ToString::to_string).collect();
    let uids = matched_uids(session, &senders, OTP_SUBJECTS, since).await;
    OtpResult {
        codes: collect_codes(session, uids).await,
    }
}

/// Exception scan result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionResult {
    /// Number of orders with a delay/exception notice.
    pub count: u32,
    /// The affected order numbers, in discovery order.
    pub orders: Vec<String>,
}

/// Scans delay/exception notifications.
///
/// Sender resolution matches [`scan_shipments`]: forwarders plus the
/// regional notification addresses.
pub async fn amazon_exception<S: MailSession>(
    session: &mut S,
    fwds: &[String],
    domain: &str,
    since: NaiveDate,
) -> ExceptionResult {
    let senders = notification_senders(domain, fwds);
    let uids = matched_uids(session, &senders, EXCEPTION_SUBJECTS, since).await;

    let mut orders: Vec<String> = Vec::new();
    for uid in uids {
        let Some(message) = fetch_message(session, uid).await else {
            continue;
        };
        let Some(text) = body_text(&message) else {
            continue;
        };
        for found in ORDER_RE.find_iter(&text) {
            let order = found.as_str().to_string();
            if !orders.contains(&order) {
                orders.push(order);
            }
        }
    }

    ExceptionResult {
        count: u32::try_from(orders.len()).unwrap_or(u32::MAX),
        orders,
    }
}

/// Scans delivered notifications and acquires the preview image.
///
/// The first `<img>` URL found in a delivered body is downloaded into
/// `workdir` under `image_name`; when nothing is found or the download
/// fails, the default asset already in place is kept. Returns the number
/// of delivered messages processed.
pub async fn amazon_search<S: MailSession>(
    session: &mut S,
    workdir: &Path,
    image_name: &str,
    fwds: &[String],
    domain: &str,
    since: NaiveDate,
) -> u32 {
    let senders = notification_senders(domain, fwds);
    debug!("Amazon email search addresses: {senders:?}");

    let uids = matched_uids(session, &senders, DELIVERED_SUBJECTS, since).await;
    let count = u32::try_from(uids.len()).unwrap_or(u32::MAX);

    let mut image_url: Option<String> = None;
    for uid in uids {
        let Some(message) = fetch_message(session, uid).await else {
            continue;
        };
        let html = message.html_body.as_deref().unwrap_or_default();
        let text = message.text_body.as_deref().unwrap_or_default();
        if let Some(found) = IMG_SRC_RE
            .captures(html)
            .or_else(|| IMG_SRC_RE.captures(text))
        {
            image_url = Some(found[1].to_string());
            break;
        }
    }

    if let Some(url) = image_url {
        if !images::download_img(&url, workdir, image_name).await {
            debug!("Amazon image download failed, keeping default asset");
        }
    }

    count
}

/// Fetches and parses one message, logging and absorbing failures.
async fn fetch_message<S: MailSession>(session: &mut S, uid: Uid) -> Option<Message> {
    let reply = session.fetch(uid).await;
    if !reply.status.is_ok() {
        return None;
    }
    match Message::parse(&reply.body?) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!("Problem decoding email message: {err}");
            None
        }
    }
}

/// The searchable text of a message: the plain body, or the HTML body
/// stripped to text.
fn body_text(message: &Message) -> Option<String> {
    if let Some(text) = &message.text_body {
        return Some(text.clone());
    }
    let html = message.html_body.as_ref()?;
    Some(htmd::convert(html).unwrap_or_else(|_| html.clone()))
}

/// Fetches each message and collects unique 6-digit codes.
async fn collect_codes<S: MailSession>(session: &mut S, uids: Vec<Uid>) -> Vec<String> {
    let mut codes = Vec::new();
    for uid in uids {
        let Some(message) = fetch_message(session, uid).await else {
            continue;
        };
        let Some(text) = body_text(&message) else {
            continue;
        };
        for found in CODE_RE.find_iter(&text) {
            let code = found.as_str().to_string();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

/// Finds the arrival-date chunk in a shipment body.
fn arrival_chunk(text: &str) -> Option<String> {
    for line in text.lines() {
        let lower = line.to_lowercase();
        for marker in ARRIVAL_MARKERS {
            if let Some(idx) = lower.find(marker) {
                let chunk = line[idx + marker.len()..].trim();
                if !chunk.is_empty() {
                    return Some(chunk.to_string());
                }
            }
        }
    }
    None
}

/// Parses an arrival chunk against the ordered format list.
///
/// Bodies spell dates as `11 Jan`, `Jan 11`, or `Tuesday, January 11`;
/// ranges (`Monday, June 7 - Wednesday, June 9`) contribute their first
/// half. The scan year is appended since bodies omit it.
fn parse_arrival_date(chunk: &str, year: i32) -> Option<NaiveDate> {
    let mut chunk = chunk.trim();

    // Ranges: keep the earlier date.
    if let Some((first, _)) = chunk.split_once(" - ") {
        chunk = first.trim();
    }
    // Long form carries a weekday prefix the formats do not model.
    if let Some((_, rest)) = chunk.split_once(", ") {
        chunk = rest.trim();
    }
    let chunk = chunk.trim_end_matches(['.', '!']).trim();

    let candidate = format!("{chunk} {year}");
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&candidate, format).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_senders_prepends_forwards() {
        let fwds = vec!["testuser@test.com".to_string()];
        let senders = notification_senders("amazon.com", &fwds);
        assert_eq!(senders[0], "testuser@test.com");
        assert_eq!(senders[1], "shipment-tracking@amazon.com");
        assert_eq!(senders.len(), 9);
        assert!(senders.contains(&"update-bestelling@amazon.com".to_string()));
    }

    #[test]
    fn test_notification_senders_regional_domain() {
        let senders = notification_senders("amazon.co.uk", &[]);
        assert!(senders.contains(&"order-update@amazon.co.uk".to_string()));
        assert!(!senders.iter().any(|s| s.ends_with("@amazon.com")));
    }

    #[test]
    fn test_order_pattern() {
        let found: Vec<_> = ORDER_RE
            .find_iter("your order #123-1234567-1234567 has shipped")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["123-1234567-1234567"]);
    }

    #[test]
    fn test_arrival_chunk() {
        let text = "Hello,\nYour package with order #123-1234567-1234567\nArriving: Tuesday, January 11\nThanks";
        assert_eq!(arrival_chunk(text).unwrap(), "Tuesday, January 11");
    }

    #[test]
    fn test_arrival_chunk_guaranteed() {
        let text = "Guaranteed delivery date: 11 Jan\n";
        assert_eq!(arrival_chunk(text).unwrap(), "11 Jan");
    }

    #[test]
    fn test_parse_arrival_date_day_month() {
        assert_eq!(
            parse_arrival_date("11 Jan", 2022),
            NaiveDate::from_ymd_opt(2022, 1, 11)
        );
    }

    #[test]
    fn test_parse_arrival_date_month_day() {
        assert_eq!(
            parse_arrival_date("Jan 11", 2022),
            NaiveDate::from_ymd_opt(2022, 1, 11)
        );
    }

    #[test]
    fn test_parse_arrival_date_long_weekday() {
        assert_eq!(
            parse_arrival_date("Tuesday, January 11", 2022),
            NaiveDate::from_ymd_opt(2022, 1, 11)
        );
    }

    #[test]
    fn test_parse_arrival_date_range_takes_first() {
        assert_eq!(
            parse_arrival_date("Monday, June 7 - Wednesday, June 9", 2021),
            NaiveDate::from_ymd_opt(2021, 6, 7)
        );
    }

    #[test]
    fn test_parse_arrival_date_unparseable() {
        assert!(parse_arrival_date("sometime soon", 2022).is_none());
    }
}
