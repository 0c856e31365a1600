//! Count/extract engine tests against fixture messages.

mod common;

use chrono::NaiveDate;
use common::{MockSession, SearchOutcome, fixture};
use parcelscan_core::get_count;

fn since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 2).unwrap()
}

#[tokio::test]
async fn ups_out_for_delivery() {
    let mut session = MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![1]))
        .with_message(1, &fixture("ups_out_for_delivery.eml"));

    let result = get_count(&mut session, "ups_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(result.tracking, vec!["1Z2345YY0678901234".to_string()]);
}

#[tokio::test]
async fn ups_out_for_delivery_html_only() {
    let mut session = MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![2]))
        .with_message(2, &fixture("ups_out_for_delivery_html.eml"));

    let result = get_count(&mut session, "ups_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(result.tracking, vec!["1Z0Y12345678031234".to_string()]);
}

#[tokio::test]
async fn usps_out_for_delivery() {
    let mut session = MockSession::new()
        .on_search("auto-reply@usps.com", SearchOutcome::Uids(vec![3]))
        .with_message(3, &fixture("usps_out_for_delivery.eml"));

    let result = get_count(&mut session, "usps_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(
        result.tracking,
        vec!["92123456508577307776690000".to_string()]
    );
}

#[tokio::test]
async fn dhl_quoted_printable_body() {
    let mut session = MockSession::new()
        .on_search("dhl", SearchOutcome::Uids(vec![4]))
        .with_message(4, &fixture("dhl_out_for_delivery.eml"));

    let result = get_count(&mut session, "dhl_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(result.tracking, vec!["4212345678".to_string()]);
}

#[tokio::test]
async fn dhl_utf8_unsupported_falls_back_to_sender_query() {
    // The subject searches fail with a charset complaint; the sender-only
    // fallback still finds the message.
    let mut session = MockSession::new()
        .on_search(
            "SUBJECT",
            SearchOutcome::Bad("[BADCHARSET] UTF-8 not supported".to_string()),
        )
        .on_search("FROM", SearchOutcome::Uids(vec![4]))
        .with_message(4, &fixture("dhl_out_for_delivery.eml"));

    let result = get_count(&mut session, "dhl_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(result.tracking, vec!["4212345678".to_string()]);
}

#[tokio::test]
async fn one_undecodable_message_does_not_sink_the_rule() {
    // Three matched messages, one with broken quoted-printable: the rule
    // still reports the two good ones.
    let mut session = MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![1, 2, 5]))
        .with_message(1, &fixture("ups_out_for_delivery.eml"))
        .with_message(2, &fixture("ups_out_for_delivery_html.eml"))
        .with_message(5, &fixture("ups_bad_encoding.eml"));

    let result = get_count(&mut session, "ups_delivering", true, since()).await;
    assert_eq!(result.count, 2);
    assert_eq!(
        result.tracking,
        vec![
            "1Z2345YY0678901234".to_string(),
            "1Z0Y12345678031234".to_string()
        ]
    );
}

#[tokio::test]
async fn duplicate_tracking_across_messages_counts_once() {
    let mut session = MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![1, 6]))
        .with_message(1, &fixture("ups_out_for_delivery.eml"))
        .with_message(6, &fixture("ups_out_for_delivery.eml"));

    let result = get_count(&mut session, "ups_delivering", true, since()).await;
    assert_eq!(result.count, 1);
    assert_eq!(result.tracking, vec!["1Z2345YY0678901234".to_string()]);
}

#[tokio::test]
async fn count_rule_dedups_uids_across_subject_variants() {
    // Every subject variant of ups_packages matches the same message;
    // the count is still one.
    let mut session = MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![1]))
        .with_message(1, &fixture("ups_out_for_delivery.eml"));

    let result = get_count(&mut session, "ups_packages", false, since()).await;
    assert_eq!(result.count, 1);
    assert!(result.tracking.is_empty());
}

#[tokio::test]
async fn failed_search_reports_zero() {
    let mut session =
        MockSession::new().on_search("FROM", SearchOutcome::Bad("server busted".to_string()));

    let result = get_count(&mut session, "ups_delivering", true, since()).await;
    assert_eq!(result.count, 0);
    assert!(result.tracking.is_empty());
}

#[tokio::test]
async fn unknown_resource_key_reports_zero() {
    let mut session = MockSession::new();
    let result = get_count(&mut session, "carrier_pigeon_delivering", true, since()).await;
    assert_eq!(result.count, 0);
}

#[tokio::test]
async fn usps_exception_counts_messages() {
    let mut session = MockSession::new()
        .on_search("auto-reply@usps.com", SearchOutcome::Uids(vec![7, 8]))
        .with_message(7, &fixture("usps_out_for_delivery.eml"))
        .with_message(8, &fixture("usps_out_for_delivery.eml"));

    let result = get_count(&mut session, "usps_exception", false, since()).await;
    assert_eq!(result.count, 2);
}
