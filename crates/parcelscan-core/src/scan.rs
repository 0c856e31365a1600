//! Scan orchestration.
//!
//! One call to [`process_scan`] runs the whole rule table plus the
//! Amazon subsystem against one session, assembles the aggregate
//! [`ScanResult`], and drives the image stage. Connect, login, and
//! folder selection are the only fatal steps; each enabled resource key
//! after that degrades independently to a zero/empty entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::amazon;
use crate::config::ScanConfig;
use crate::criteria::scan_window_start;
use crate::engine::get_count;
use crate::error::Result;
use crate::images::{self, ImagePipeline, NO_MAIL_IMAGE, PreviewOptions};
use crate::rules::{self, RuleMode};
use crate::session::{self, MailSession};

/// Resource key for the always-on completion timestamp.
pub const MAIL_UPDATED: &str = "mail_updated";

/// One entry in the scan result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// A plain message count.
    Count(u32),
    /// A count with the tracking values behind it.
    Tracking {
        /// Distinct extracted values.
        count: u32,
        /// The values, first-seen order.
        tracking: Vec<String>,
    },
    /// A list of codes (hub pickup, one-time passcodes).
    Codes(Vec<String>),
    /// A list of order numbers.
    Orders(Vec<String>),
    /// A completion timestamp.
    Timestamp(DateTime<Utc>),
}

impl SensorValue {
    /// The count carried by this value, if it has one.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        match self {
            Self::Count(n) | Self::Tracking { count: n, .. } => Some(*n),
            _ => None,
        }
    }
}

/// Aggregate result of one scan. Immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    /// Per-resource values, only for enabled keys.
    pub values: BTreeMap<String, SensorValue>,
    /// Resolved preview file name, or the sentinel when the image stage
    /// produced nothing.
    pub image_name: String,
    /// When the scan completed; `None` for a scan that could not run.
    pub updated: Option<DateTime<Utc>>,
}

impl ScanResult {
    /// The empty result of a scan that could not run.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
            image_name: NO_MAIL_IMAGE.to_string(),
            updated: None,
        }
    }

    /// Returns true for a scan that could not run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convenience accessor for a count entry.
    #[must_use]
    pub fn count(&self, key: &str) -> Option<u32> {
        self.values.get(key).and_then(SensorValue::count)
    }
}

/// Runs one full scan: connect, login, select, evaluate, compose.
///
/// Connect/login/folder failures are logged and reported once as an
/// empty result. The session is released on every exit path.
///
/// # Errors
///
/// Returns an error only for configuration problems, which are detected
/// before any protocol I/O.
pub async fn process_scan<P: ImagePipeline>(config: &ScanConfig, pipeline: &P) -> Result<ScanResult> {
    config.validate()?;

    let login = match session::login(config).await {
        Ok(login) => login,
        Err(_) => return Ok(ScanResult::empty()),
    };
    let mut mailbox = match login.select_folder(&config.folder).await {
        Ok(session) => session,
        Err(_) => return Ok(ScanResult::empty()),
    };

    let result = run_scan(&mut mailbox, config, pipeline).await;
    mailbox.logout().await;
    Ok(result)
}

/// Evaluates every enabled resource key against an existing session.
///
/// Split out from [`process_scan`] so the engine can be exercised
/// against a substitute session.
pub async fn run_scan<S: MailSession, P: ImagePipeline>(
    session: &mut S,
    config: &ScanConfig,
    pipeline: &P,
) -> ScanResult {
    let since = scan_window_start(config.days_old);
    let amazon_since = scan_window_start(config.amazon.days);
    let today = Local::now().date_naive();
    let fwds = config.forward_addresses().unwrap_or_default();
    let domain = config.amazon.domain.as_str();
    let amazon_dir = config.images.image_dir.join("amazon");

    let image_name = images::image_file_name(&config.images);
    let mut values: BTreeMap<String, SensorValue> = BTreeMap::new();
    let mut mail_images = Vec::new();
    let mut run_image_stage = false;

    for key in &config.resources {
        match key.as_str() {
            MAIL_UPDATED => {} // always appended below
            "usps_mail" => {
                let (count, paths) =
                    images::get_mails(session, &config.images.image_dir, since).await;
                values.insert(key.clone(), SensorValue::Count(count));
                mail_images = paths;
                run_image_stage = true;
            }
            "amazon_packages" => {
                let shipments =
                    amazon::scan_shipments(session, &fwds, domain, amazon_since, today).await;
                values.insert(key.clone(), SensorValue::Count(shipments.count));
                values.insert(
                    "amazon_order".to_string(),
                    SensorValue::Orders(shipments.orders),
                );
            }
            "amazon_delivered" => {
                let count = amazon::amazon_search(
                    session,
                    &amazon_dir,
                    &image_name,
                    &fwds,
                    domain,
                    amazon_since,
                )
                .await;
                values.insert(key.clone(), SensorValue::Count(count));
            }
            "amazon_hub" => {
                let hub = amazon::amazon_hub(session, &fwds, amazon_since).await;
                values.insert(key.clone(), SensorValue::Count(hub.count));
                values.insert("amazon_hub_code".to_string(), SensorValue::Codes(hub.codes));
            }
            "amazon_otp" => {
                let otp = amazon::amazon_otp(session, amazon_since).await;
                values.insert(key.clone(), SensorValue::Codes(otp.codes));
            }
            "amazon_exception" => {
                let exception =
                    amazon::amazon_exception(session, &fwds, domain, amazon_since).await;
                values.insert(key.clone(), SensorValue::Count(exception.count));
                values.insert(
                    "amazon_exception_order".to_string(),
                    SensorValue::Orders(exception.orders),
                );
            }
            "zpackages_delivered" | "zpackages_transit" => {} // aggregated below
            other => {
                let Some(rule) = rules::rule(other) else {
                    warn!("Unknown resource key {other}, skipping");
                    continue;
                };
                let extract = rule.mode == RuleMode::Extract;
                let counted = get_count(session, other, extract, since).await;
                let value = if extract {
                    SensorValue::Tracking {
                        count: counted.count,
                        tracking: counted.tracking,
                    }
                } else {
                    SensorValue::Count(counted.count)
                };
                values.insert(key.clone(), value);
            }
        }
    }

    append_aggregates(config, &mut values);

    let image_name = if run_image_stage {
        image_stage(config, pipeline, &mail_images, image_name).await
    } else {
        NO_MAIL_IMAGE.to_string()
    };

    let updated = Utc::now();
    values.insert(MAIL_UPDATED.to_string(), SensorValue::Timestamp(updated));
    info!("Scan completed: {} resources", values.len());

    ScanResult {
        values,
        image_name,
        updated: Some(updated),
    }
}

/// Computes the cross-carrier aggregates from the accumulated values.
fn append_aggregates(config: &ScanConfig, values: &mut BTreeMap<String, SensorValue>) {
    if config.is_enabled("zpackages_delivered") {
        let delivered: u32 = values
            .iter()
            .filter(|(key, _)| key.ends_with("_delivered"))
            .filter_map(|(_, value)| value.count())
            .sum();
        values.insert(
            "zpackages_delivered".to_string(),
            SensorValue::Count(delivered),
        );
    }

    if config.is_enabled("zpackages_transit") {
        let transit: u32 = values
            .iter()
            .filter(|(key, _)| key.ends_with("_delivering") || *key == "amazon_packages")
            .filter_map(|(_, value)| value.count())
            .sum();
        values.insert("zpackages_transit".to_string(), SensorValue::Count(transit));
    }
}

/// Runs the image pipeline over the collected mailpiece images.
///
/// Any pipeline failure degrades the preview name to the sentinel; the
/// scan result itself stands.
async fn image_stage<P: ImagePipeline>(
    config: &ScanConfig,
    pipeline: &P,
    mail_images: &[std::path::PathBuf],
    image_name: String,
) -> String {
    let options = PreviewOptions {
        animation_secs: config.images.animation_secs,
        resize: None,
        today_only: true,
    };

    let produced = match pipeline
        .compose_preview(mail_images, &config.images.image_dir, &image_name, &options)
        .await
    {
        Ok(name) => name,
        Err(err) => {
            error!("Image pipeline error: {err}");
            return NO_MAIL_IMAGE.to_string();
        }
    };

    if config.images.generate_mp4
        && let Err(err) = pipeline
            .transcode_video(&config.images.image_dir, &produced)
            .await
    {
        // The animated preview still exists; only the video variant is
        // missing.
        error!("Image pipeline error: {err}");
    }

    produced
}
