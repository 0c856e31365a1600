//! Image acquisition for the preview stage.
//!
//! Collects mailpiece images from daily-digest messages into the working
//! directory, downloads linked preview images over HTTP, and resolves
//! the preview file name. Composition, resizing, and animation are the
//! image pipeline's job — an external collaborator reached through
//! [`ImagePipeline`].

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info, warn};

use parcelscan_mime::Message;

use crate::config::ImageOptions;
use crate::engine::matched_uids;
use crate::error::Result;
use crate::session::MailSession;

/// Sentinel preview name used when no image could be produced.
pub const NO_MAIL_IMAGE: &str = "mail_none.gif";

/// Fixed preview name used when random naming is off.
pub const MAIL_TODAY_IMAGE: &str = "mail_today.gif";

/// Daily mail digest notification senders.
pub const DIGEST_SENDERS: &[&str] = &[
    "USPSInformedDelivery@usps.gov",
    "USPSInformeddelivery@informeddelivery.usps.com",
    "USPSInformeddelivery@email.informeddelivery.usps.com",
];

/// Daily mail digest subject.
pub const DIGEST_SUBJECT: &str = "Your Daily Digest";

/// Options handed to the image pipeline collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Animation duration for the composed preview, in seconds.
    pub animation_secs: u64,
    /// Resize bounds (width, height), if any.
    pub resize: Option<(u32, u32)>,
    /// Whether only today's images are embedded.
    pub today_only: bool,
}

/// The consumed image-pipeline boundary.
///
/// The core hands over collected image paths and records the produced
/// file name; it does not resize, animate, or transcode anything itself.
pub trait ImagePipeline {
    /// Composes the preview asset from the collected images.
    ///
    /// Returns the produced file name.
    fn compose_preview(
        &self,
        images: &[PathBuf],
        workdir: &Path,
        out_name: &str,
        options: &PreviewOptions,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Produces a video variant next to the composed preview.
    fn transcode_video(
        &self,
        workdir: &Path,
        base_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Pipeline that does nothing and keeps the chosen file name.
///
/// Useful for callers that publish counts only, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPipeline;

impl ImagePipeline for NullPipeline {
    async fn compose_preview(
        &self,
        _images: &[PathBuf],
        _workdir: &Path,
        out_name: &str,
        _options: &PreviewOptions,
    ) -> Result<String> {
        Ok(out_name.to_string())
    }

    async fn transcode_video(&self, _workdir: &Path, _base_name: &str) -> Result<()> {
        Ok(())
    }
}

/// Scans daily-digest messages and writes their mailpiece images into
/// the working directory.
///
/// Returns the mailpiece count and the written image paths. A digest
/// with no images still counts as zero mail, not as a failure.
pub async fn get_mails<S: MailSession>(
    session: &mut S,
    workdir: &Path,
    since: NaiveDate,
) -> (u32, Vec<PathBuf>) {
    let uids = matched_uids(session, DIGEST_SENDERS, &[DIGEST_SUBJECT], since).await;

    if let Err(err) = std::fs::create_dir_all(workdir) {
        warn!("Error creating directory: {err}");
        return (0, Vec::new());
    }
    // Sweep the previous scan's images before collecting today's.
    cleanup_images(workdir, None);

    let mut count: u32 = 0;
    let mut paths = Vec::new();

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

        if let Some(sender) = message.sender() {
            debug!("Mail digest from {sender}");
        }

        for (index, image) in message.images().into_iter().enumerate() {
            let filename = if image.filename.is_empty() {
                format!("{uid}-{index}.jpg")
            } else {
                image.filename.clone()
            };
            let path = workdir.join(filename);
            match tokio::fs::write(&path, &image.data).await {
                Ok(()) => {
                    count += 1;
                    paths.push(path);
                }
                Err(err) => warn!("Error opening filepath: {err}"),
            }
        }
    }

    (count, paths)
}

/// Downloads an image URL into `dir` under `filename`.
///
/// Any failure — transport error, non-success status, non-image content
/// type — logs and returns `false` so the caller keeps its default
/// asset. Never fatal.
pub async fn download_img(url: &str, dir: &Path, filename: &str) -> bool {
    let response = match reqwest::get(url).await {
        Ok(response) => response,
        Err(err) => {
            warn!("Problem downloading file: {err}");
            return false;
        }
    };

    if !response.status().is_success() {
        warn!("Problem downloading file http error: {}", response.status().as_u16());
        return false;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    debug!("URL content-type: {content_type}");
    if !content_type.starts_with("image/") {
        warn!("Skipping download, not an image: {content_type}");
        return false;
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Problem downloading file: {err}");
            return false;
        }
    };

    if let Err(err) = std::fs::create_dir_all(dir) {
        warn!("Error creating directory: {err}");
        return false;
    }
    match tokio::fs::write(dir.join(filename), &bytes).await {
        Ok(()) => {
            info!("Amazon image downloaded");
            true
        }
        Err(err) => {
            warn!("Error saving downloaded image: {err}");
            false
        }
    }
}

/// Removes stale generated images from the working directory.
///
/// `keep` survives the sweep (the asset just produced).
pub fn cleanup_images(dir: &Path, keep: Option<&str>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Nothing to clean in {}: {err}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if keep.is_some_and(|k| k == name) {
            continue;
        }
        let stale = [".gif", ".jpg", ".jpeg", ".png", ".mp4"]
            .iter()
            .any(|ext| name.ends_with(ext));
        if stale {
            if let Err(err) = std::fs::remove_file(entry.path()) {
                warn!("Error attempting to remove image: {err}");
            }
        }
    }
}

/// Resolves the preview file name for this scan.
///
/// Random naming produces a fresh 16-character name each scan so cached
/// previews never go stale downstream; otherwise the name is fixed. A
/// working directory that cannot be created degrades to the sentinel
/// name.
#[must_use]
pub fn image_file_name(options: &ImageOptions) -> String {
    if let Err(err) = std::fs::create_dir_all(&options.image_dir) {
        warn!("Problem creating: {err}");
        return NO_MAIL_IMAGE.to_string();
    }

    if options.random_name {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        format!("{token}.gif")
    } else {
        MAIL_TODAY_IMAGE.to_string()
    }
}

/// Path of the asset shown when no mail matched.
#[must_use]
pub fn default_image_path(options: &ImageOptions) -> PathBuf {
    options
        .custom_no_mail
        .clone()
        .unwrap_or_else(|| options.storage_dir.join(NO_MAIL_IMAGE))
}

/// Compares two files by content.
///
/// Stands in for a content hash when deciding whether the preview
/// actually changed; unreadable files compare unequal.
#[must_use]
pub fn same_file_contents(a: &Path, b: &Path) -> bool {
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}
