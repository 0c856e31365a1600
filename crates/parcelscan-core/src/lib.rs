//! # parcelscan-core
//!
//! The mailbox scanning engine: connects to a mailbox over IMAP,
//! classifies messages by shipping carrier and delivery state, extracts
//! tracking numbers, order numbers, and pickup/one-time codes from
//! unstructured bodies, and assembles one aggregate [`ScanResult`] per
//! invocation.
//!
//! The single entry point is [`process_scan`], invoked by an external
//! scheduler on its own cadence. The engine holds no cross-invocation
//! state beyond the static carrier rule table; the caller owns the
//! configuration and the returned result.
//!
//! Failure policy, from coarse to fine:
//! - configuration errors are returned before any protocol I/O
//! - connect/login/folder-selection failures end the scan with an empty
//!   result
//! - a failed search or fetch zeroes the affected rule only
//! - an undecodable message is skipped; its rule keeps counting
//! - an image-stage failure degrades the preview name, nothing else

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod amazon;
pub mod config;
pub mod criteria;
pub mod engine;
mod error;
pub mod images;
pub mod rules;
pub mod scan;
pub mod session;

pub use config::{AmazonConfig, ImageOptions, ScanConfig, SecurityMode, parse_forward_addresses};
pub use engine::{CountResult, get_count};
pub use error::{ConfigError, Result, ScanError};
pub use images::{ImagePipeline, NullPipeline, PreviewOptions};
pub use rules::{CarrierRule, RuleMode, RULES};
pub use scan::{MAIL_UPDATED, ScanResult, SensorValue, process_scan, run_scan};
pub use session::{FetchReply, MailSession, ReplyStatus, SearchReply, Uid};
