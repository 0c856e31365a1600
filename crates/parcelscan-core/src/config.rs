//! Scan configuration.
//!
//! One [`ScanConfig`] drives one scan invocation. The record is supplied
//! whole by the caller, is never persisted or mutated here, and is
//! validated before any protocol I/O happens.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// TLS from the start (port 993).
    #[default]
    Tls,
    /// Plaintext connection upgraded via STARTTLS.
    StartTls,
    /// No encryption. Only sensible against localhost relays.
    Plain,
}

/// Amazon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmazonConfig {
    /// Regional domain the account orders from (e.g. `amazon.com`,
    /// `amazon.co.uk`, `amazon.it`).
    #[serde(default = "default_amazon_domain")]
    pub domain: String,
    /// Comma-separated forwarding addresses, `""` for none.
    #[serde(default)]
    pub forwards: String,
    /// Day window for Amazon searches.
    #[serde(default = "default_days")]
    pub days: u32,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            domain: default_amazon_domain(),
            forwards: String::new(),
            days: default_days(),
        }
    }
}

/// Image/storage settings for the preview stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Working directory where matched images are collected.
    pub image_dir: PathBuf,
    /// Directory holding bundled default assets.
    pub storage_dir: PathBuf,
    /// Whether the preview may be published to an external URL.
    #[serde(default)]
    pub allow_external: bool,
    /// Whether an MP4 is generated next to the animated preview.
    #[serde(default)]
    pub generate_mp4: bool,
    /// Whether the preview file gets a random name each scan.
    #[serde(default)]
    pub random_name: bool,
    /// Optional caller-provided image shown when no mail matched.
    #[serde(default)]
    pub custom_no_mail: Option<PathBuf>,
    /// Animation duration for the composed preview, in seconds.
    #[serde(default = "default_animation_secs")]
    pub animation_secs: u64,
}

/// Configuration for one scan invocation. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Mail host.
    pub host: String,
    /// Mail port.
    pub port: u16,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Transport security mode.
    #[serde(default)]
    pub security: SecurityMode,
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    /// Folder to scan.
    #[serde(default = "default_folder")]
    pub folder: String,
    /// How many days back to search.
    #[serde(default = "default_days")]
    pub days_old: u32,
    /// Enabled resource keys, in evaluation order.
    pub resources: Vec<String>,
    /// Amazon-specific settings.
    #[serde(default)]
    pub amazon: AmazonConfig,
    /// Image/storage settings.
    pub images: ImageOptions,
    /// Per-exchange I/O timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_amazon_domain() -> String {
    "amazon.com".to_string()
}

fn default_folder() -> String {
    "INBOX".to_string()
}

const fn default_days() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_animation_secs() -> u64 {
    1
}

impl ScanConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] wrapped in [`crate::ScanError`] for a
    /// missing required field or a malformed forwarding-address list.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingField("host").into());
        }
        if self.username.is_empty() {
            return Err(ConfigError::MissingField("username").into());
        }
        if self.folder.is_empty() {
            return Err(ConfigError::MissingField("folder").into());
        }
        self.forward_addresses()?;
        Ok(())
    }

    /// Parsed Amazon forwarding addresses.
    ///
    /// # Errors
    ///
    /// Returns `invalid_email_format` if any entry lacks an `@`.
    pub fn forward_addresses(&self) -> Result<Vec<String>> {
        parse_forward_addresses(&self.amazon.forwards).map_err(Into::into)
    }

    /// Returns true if the resource key is enabled.
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        self.resources.iter().any(|r| r == key)
    }
}

/// Splits a comma-separated forwarding-address list.
///
/// Entries are trimmed; an empty string (or the literal `(none)` some
/// configuration frontends store) means no forwarders. Any entry without
/// an `@` rejects the whole list — a silent typo here would silently
/// drop matches instead.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEmailFormat`] naming the bad entry.
pub fn parse_forward_addresses(raw: &str) -> std::result::Result<Vec<String>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "(none)" {
        return Ok(Vec::new());
    }

    let mut addresses = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if !entry.contains('@') {
            return Err(ConfigError::InvalidEmailFormat(entry.to_string()));
        }
        addresses.push(entry.to_string());
    }
    Ok(addresses)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> ScanConfig {
        ScanConfig {
            host: "imap.test.email".to_string(),
            port: 993,
            username: "user@test.email".to_string(),
            password: "suchfakemuchpassword".to_string(),
            security: SecurityMode::Tls,
            verify_ssl: true,
            folder: "INBOX".to_string(),
            days_old: 3,
            resources: vec!["ups_delivering".to_string()],
            amazon: AmazonConfig::default(),
            images: ImageOptions {
                image_dir: PathBuf::from("./images"),
                storage_dir: PathBuf::from("./assets"),
                allow_external: false,
                generate_mp4: false,
                random_name: false,
                custom_no_mail: None,
                animation_secs: 1,
            },
            timeout_secs: 60,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_host() {
        let mut config = test_config();
        config.host.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forward_addresses_empty_means_none() {
        assert_eq!(parse_forward_addresses("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_forward_addresses("(none)").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_forward_addresses_split_and_trim() {
        let parsed = parse_forward_addresses(" a@x.com , b@y.com ").unwrap();
        assert_eq!(parsed, vec!["a@x.com".to_string(), "b@y.com".to_string()]);
    }

    #[test]
    fn test_forward_addresses_invalid_entry() {
        let err = parse_forward_addresses("a@x.com, not-an-address").unwrap_err();
        assert_eq!(err, ConfigError::InvalidEmailFormat("not-an-address".to_string()));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = test_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, config.host);
        assert_eq!(back.resources, config.resources);
    }
}
