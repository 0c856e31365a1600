//! Mailbox session abstraction.
//!
//! The engine talks to the mailbox through [`MailSession`], which
//! returns explicit per-call statuses instead of raising across the
//! scan. Connect, login, and folder selection are the fatal path and
//! return [`ScanError`]; once a session exists, search and fetch
//! failures are delivered as non-OK replies the engine absorbs into
//! zero results.

use std::time::Duration;

use tracing::error;

use parcelscan_imap::{
    Authenticated, Client, FetchTarget, ImapStream, Mailbox, SearchCriteria, Selected, connect,
};

use crate::config::{ScanConfig, SecurityMode};
use crate::error::{Result, ScanError};

pub use parcelscan_imap::Uid;

/// Status of one search or fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The call completed.
    Ok,
    /// The server refused the operation (NO).
    No(String),
    /// The call failed at the protocol or transport level (BAD).
    Bad(String),
}

impl ReplyStatus {
    /// Returns true for an OK status.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// The failure text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::No(text) | Self::Bad(text) => Some(text),
        }
    }
}

/// Result of one search call.
#[derive(Debug, Clone)]
pub struct SearchReply {
    /// Call status.
    pub status: ReplyStatus,
    /// Matching message UIDs (empty on failure).
    pub uids: Vec<Uid>,
}

/// Result of one fetch call.
#[derive(Debug, Clone)]
pub struct FetchReply {
    /// Call status.
    pub status: ReplyStatus,
    /// Raw message bytes, if the server returned any.
    pub body: Option<Vec<u8>>,
}

/// One scan's view of a selected mailbox.
///
/// Implementations never raise for expected failure modes; the status in
/// the reply carries them. Tests substitute a fixture-backed session.
pub trait MailSession {
    /// Searches the selected folder.
    fn search(
        &mut self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = SearchReply> + Send;

    /// Fetches one message's raw body.
    fn fetch(&mut self, uid: Uid) -> impl Future<Output = FetchReply> + Send;
}

/// An authenticated connection, one folder selection away from scanning.
#[derive(Debug)]
pub struct MailboxLogin {
    client: Client<ImapStream, Authenticated>,
}

impl MailboxLogin {
    /// Selects the configured folder.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Folder`] when the folder is missing or
    /// unselectable; this is fatal for the scan.
    pub async fn select_folder(self, folder: &str) -> Result<ImapSession> {
        match self.client.select(&Mailbox::new(folder)).await {
            Ok((client, _status)) => Ok(ImapSession { client }),
            Err(err) => {
                error!("Error selecting folder: {err}");
                Err(ScanError::Folder(err.to_string()))
            }
        }
    }
}

/// A live IMAP session on the selected folder.
#[derive(Debug)]
pub struct ImapSession {
    client: Client<ImapStream, Selected>,
}

impl ImapSession {
    /// Releases the session.
    ///
    /// Goodbye errors are ignored; the connection is going away either
    /// way, and a scan result has already been assembled by the caller.
    pub async fn logout(self) {
        self.client.logout().await;
    }
}

/// Connects and authenticates per the configuration.
///
/// # Errors
///
/// Returns [`ScanError::Connection`] for transport failures (including
/// session timeouts) and [`ScanError::Login`] for rejected credentials.
/// Both are fatal for the scan.
pub async fn login(config: &ScanConfig) -> Result<MailboxLogin> {
    let io_timeout = Duration::from_secs(config.timeout_secs);
    let imap_config = parcelscan_imap::Config::builder(&*config.host)
        .port(config.port)
        .security(match config.security {
            SecurityMode::Tls => parcelscan_imap::Security::Implicit,
            SecurityMode::StartTls => parcelscan_imap::Security::StartTls,
            SecurityMode::Plain => parcelscan_imap::Security::None,
        })
        .verify_certs(config.verify_ssl)
        .io_timeout(io_timeout)
        .build();

    let stream = connect(&imap_config).await.map_err(|err| {
        error!("Network error while connecting to server: {err}");
        ScanError::Connection(err.to_string())
    })?;

    let client = Client::from_stream(stream, io_timeout).await.map_err(|err| {
        error!("Network error while connecting to server: {err}");
        ScanError::Connection(err.to_string())
    })?;

    let client = if config.security == SecurityMode::StartTls {
        client
            .starttls(&config.host, config.verify_ssl)
            .await
            .map_err(|err| {
                error!("Network error while connecting to server: {err}");
                ScanError::Connection(err.to_string())
            })?
    } else {
        client
    };

    let client = client
        .login(&config.username, &config.password)
        .await
        .map_err(|err| {
            error!("Error logging into IMAP Server: {err}");
            ScanError::Login(err.to_string())
        })?;

    Ok(MailboxLogin { client })
}

impl MailSession for ImapSession {
    async fn search(&mut self, criteria: &SearchCriteria) -> SearchReply {
        match self.client.uid_search(criteria).await {
            Ok(uids) => SearchReply {
                status: ReplyStatus::Ok,
                uids,
            },
            Err(err) => {
                error!("{}", ScanError::Search(err.to_string()));
                let status = match err {
                    parcelscan_imap::Error::No(text) => ReplyStatus::No(text),
                    other => ReplyStatus::Bad(other.to_string()),
                };
                SearchReply {
                    status,
                    uids: Vec::new(),
                }
            }
        }
    }

    async fn fetch(&mut self, uid: Uid) -> FetchReply {
        match self.client.uid_fetch_raw(uid, FetchTarget::PeekFull).await {
            Ok(body) => FetchReply {
                status: ReplyStatus::Ok,
                body,
            },
            Err(err) => {
                error!("{}", ScanError::Fetch(err.to_string()));
                let status = match err {
                    parcelscan_imap::Error::No(text) => ReplyStatus::No(text),
                    other => ReplyStatus::Bad(other.to_string()),
                };
                FetchReply { status, body: None }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_status() {
        assert!(ReplyStatus::Ok.is_ok());
        assert!(!ReplyStatus::Bad("nope".to_string()).is_ok());
        assert_eq!(
            ReplyStatus::Bad("UTF-8 not supported".to_string()).text(),
            Some("UTF-8 not supported")
        );
        assert_eq!(ReplyStatus::Ok.text(), None);
    }

    #[tokio::test]
    async fn test_login_unreachable_host() {
        let mut config = crate::config::tests::test_config();
        // Port 1 on loopback refuses immediately.
        config.host = "127.0.0.1".to_string();
        config.port = 1;
        config.timeout_secs = 1;

        let err = login(&config).await.unwrap_err();
        assert!(matches!(err, ScanError::Connection(_)));
    }
}
