//! Scan orchestration tests.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use common::{MockSession, SearchOutcome, fixture};
use parcelscan_core::images::{MAIL_TODAY_IMAGE, NO_MAIL_IMAGE};
use parcelscan_core::{
    AmazonConfig, ImageOptions, ImagePipeline, NullPipeline, PreviewOptions, ScanConfig,
    ScanError, SecurityMode, SensorValue, process_scan, run_scan,
};

/// Pipeline stub that records compose calls and can be told to fail.
#[derive(Debug, Default)]
struct RecordingPipeline {
    composed: Mutex<Vec<(Vec<PathBuf>, String)>>,
    fail: bool,
}

impl ImagePipeline for RecordingPipeline {
    async fn compose_preview(
        &self,
        images: &[PathBuf],
        _workdir: &Path,
        out_name: &str,
        _options: &PreviewOptions,
    ) -> parcelscan_core::Result<String> {
        if self.fail {
            return Err(ScanError::ImagePipeline("no encoder".to_string()));
        }
        self.composed
            .lock()
            .unwrap()
            .push((images.to_vec(), out_name.to_string()));
        Ok(out_name.to_string())
    }

    async fn transcode_video(
        &self,
        _workdir: &Path,
        _base_name: &str,
    ) -> parcelscan_core::Result<()> {
        Ok(())
    }
}

fn test_config(tag: &str, resources: &[&str]) -> ScanConfig {
    let base = std::env::temp_dir().join(format!("parcelscan-scan-{tag}-{}", std::process::id()));
    ScanConfig {
        host: "imap.test.email".to_string(),
        port: 993,
        username: "user@test.email".to_string(),
        password: "suchfakemuchpassword".to_string(),
        security: SecurityMode::Tls,
        verify_ssl: true,
        folder: "INBOX".to_string(),
        days_old: 3,
        resources: resources.iter().map(ToString::to_string).collect(),
        amazon: AmazonConfig::default(),
        images: ImageOptions {
            image_dir: base.join("images"),
            storage_dir: base.join("assets"),
            allow_external: false,
            generate_mp4: false,
            random_name: false,
            custom_no_mail: None,
            animation_secs: 1,
        },
        timeout_secs: 60,
    }
}

fn carrier_session() -> MockSession {
    MockSession::new()
        .on_search("mcinfo@ups.com", SearchOutcome::Uids(vec![1]))
        .with_message(1, &fixture("ups_out_for_delivery.eml"))
        .on_search("auto-reply@usps.com", SearchOutcome::Uids(vec![3]))
        .with_message(3, &fixture("usps_out_for_delivery.eml"))
}

#[tokio::test]
async fn scan_collects_enabled_resources_only() {
    let config = test_config(
        "enabled",
        &[
            "ups_delivering",
            "usps_delivered",
            "zpackages_delivered",
            "zpackages_transit",
            "mail_updated",
        ],
    );
    let mut session = carrier_session();

    let result = run_scan(&mut session, &config, &NullPipeline).await;

    assert_eq!(
        result.values.get("ups_delivering"),
        Some(&SensorValue::Tracking {
            count: 1,
            tracking: vec!["1Z2345YY0678901234".to_string()]
        })
    );
    assert_eq!(result.count("usps_delivered"), Some(1));
    // USPS fixture matched the delivered subject search; sums follow.
    assert_eq!(result.count("zpackages_delivered"), Some(1));
    assert_eq!(result.count("zpackages_transit"), Some(1));
    assert!(result.updated.is_some());
    assert!(result.values.contains_key("mail_updated"));

    // Disabled carriers never appear, not even as zero.
    assert!(!result.values.contains_key("fedex_delivering"));
    assert!(!result.values.contains_key("dhl_delivering"));
}

#[tokio::test]
async fn scan_without_image_stage_reports_sentinel_name() {
    let config = test_config("noimage", &["ups_delivering"]);
    let mut session = carrier_session();

    let result = run_scan(&mut session, &config, &NullPipeline).await;
    assert_eq!(result.image_name, NO_MAIL_IMAGE);
}

#[tokio::test]
async fn scan_amazon_resources() {
    let config = test_config(
        "amazon",
        &[
            "amazon_packages",
            "amazon_hub",
            "amazon_otp",
            "amazon_exception",
            "amazon_delivered",
        ],
    );
    let mut session = MockSession::new()
        .on_search("shipment-tracking@amazon.com", SearchOutcome::Uids(vec![10]))
        .with_message(10, &fixture("amazon_shipped.eml"))
        .on_search("thehub@amazon.com", SearchOutcome::Uids(vec![20]))
        .with_message(20, &fixture("amazon_hub.eml"))
        .on_search("account-update@amazon.com", SearchOutcome::Uids(vec![21]))
        .with_message(21, &fixture("amazon_otp.eml"))
        .on_search("Delivery update:", SearchOutcome::Uids(vec![22]))
        .with_message(22, &fixture("amazon_exception.eml"))
        .on_search("Delivered:", SearchOutcome::Uids(vec![23]))
        .with_message(23, &fixture("amazon_delivered_text.eml"));

    let result = run_scan(&mut session, &config, &NullPipeline).await;

    // The fixture shipped in January 2022; nothing is arriving today.
    assert_eq!(result.count("amazon_packages"), Some(0));
    assert_eq!(
        result.values.get("amazon_order"),
        Some(&SensorValue::Orders(vec!["123-1234567-1234567".to_string()]))
    );
    assert_eq!(result.count("amazon_hub"), Some(1));
    assert_eq!(
        result.values.get("amazon_hub_code"),
        Some(&SensorValue::Codes(vec!["123456".to_string()]))
    );
    assert_eq!(
        result.values.get("amazon_otp"),
        Some(&SensorValue::Codes(vec!["671314".to_string()]))
    );
    assert_eq!(result.count("amazon_exception"), Some(1));
    assert_eq!(
        result.values.get("amazon_exception_order"),
        Some(&SensorValue::Orders(vec!["123-1234567-1234567".to_string()]))
    );
    assert_eq!(result.count("amazon_delivered"), Some(1));
}

#[tokio::test]
async fn image_stage_writes_digest_images_and_composes() {
    let config = test_config("digest", &["usps_mail"]);
    let mut session = MockSession::new()
        .on_search("USPSInformedDelivery@usps.gov", SearchOutcome::Uids(vec![30]))
        .with_message(30, &fixture("usps_informed_digest.eml"));
    let pipeline = RecordingPipeline::default();

    let result = run_scan(&mut session, &config, &pipeline).await;

    assert_eq!(result.count("usps_mail"), Some(2));
    assert_eq!(result.image_name, MAIL_TODAY_IMAGE);

    let composed = pipeline.composed.lock().unwrap();
    assert_eq!(composed.len(), 1);
    let (images, out_name) = &composed[0];
    assert_eq!(images.len(), 2);
    assert_eq!(out_name, MAIL_TODAY_IMAGE);
    assert!(images[0].exists());

    let _ = std::fs::remove_dir_all(config.images.image_dir.parent().unwrap());
}

#[tokio::test]
async fn image_stage_failure_degrades_to_sentinel() {
    let config = test_config("degrade", &["usps_mail"]);
    let mut session = MockSession::new()
        .on_search("USPSInformedDelivery@usps.gov", SearchOutcome::Uids(vec![30]))
        .with_message(30, &fixture("usps_informed_digest.eml"));
    let pipeline = RecordingPipeline {
        fail: true,
        ..RecordingPipeline::default()
    };

    let result = run_scan(&mut session, &config, &pipeline).await;

    // The counts stand; only the preview name degrades.
    assert_eq!(result.count("usps_mail"), Some(2));
    assert_eq!(result.image_name, NO_MAIL_IMAGE);

    let _ = std::fs::remove_dir_all(config.images.image_dir.parent().unwrap());
}

#[tokio::test]
async fn repeated_scans_agree_except_for_timestamp() {
    let config = test_config("idempotent", &["ups_delivering", "usps_delivered"]);
    let mut first_session = carrier_session();
    let mut second_session = carrier_session();

    let first = run_scan(&mut first_session, &config, &NullPipeline).await;
    let second = run_scan(&mut second_session, &config, &NullPipeline).await;

    let strip = |result: &parcelscan_core::ScanResult| {
        let mut values = result.values.clone();
        values.remove("mail_updated");
        values
    };
    assert_eq!(strip(&first), strip(&second));
    assert_eq!(first.image_name, second.image_name);
}

#[tokio::test]
async fn malformed_forward_addresses_fail_before_io() {
    let mut config = test_config("badfwd", &["amazon_packages"]);
    config.amazon.forwards = "valid@test.com, not-an-address".to_string();

    let err = process_scan(&config, &NullPipeline).await.unwrap_err();
    assert!(matches!(err, ScanError::Configuration(_)));
}

#[tokio::test]
async fn connection_failure_yields_empty_result() {
    let mut config = test_config("refused", &["ups_delivering"]);
    // Port 1 on loopback refuses immediately; no mail host involved.
    config.host = "127.0.0.1".to_string();
    config.port = 1;
    config.timeout_secs = 1;

    let result = process_scan(&config, &NullPipeline).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.image_name, NO_MAIL_IMAGE);
    assert!(result.updated.is_none());
}
