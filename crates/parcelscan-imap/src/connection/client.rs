//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at
//! compile time:
//!
//! - `NotAuthenticated`: initial state after connection
//! - `Authenticated`: after successful LOGIN
//! - `Selected`: after successful SELECT
//!
//! Each state only exposes the commands that are valid for that state.

#![allow(clippy::missing_errors_doc)]

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::framed::FramedStream;
use super::stream::ImapStream;
use crate::command::{Command, FetchTarget, SearchCriteria, TagGenerator};
use crate::parser::{ReplyParser, TaggedStatus, UntaggedReply};
use crate::types::{Mailbox, MailboxStatus, Uid};
use crate::{Error, Result};

/// Marker type: connection established, not yet authenticated.
#[derive(Debug)]
pub struct NotAuthenticated;

/// Marker type: LOGIN accepted.
#[derive(Debug)]
pub struct Authenticated;

/// Marker type: a mailbox is selected.
#[derive(Debug)]
pub struct Selected;

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tag_gen: TagGenerator,
    io_timeout: Duration,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends a command and collects replies until its tagged completion.
    ///
    /// Every read is bounded by the configured I/O timeout; a timeout
    /// poisons the exchange and surfaces as [`Error::Timeout`].
    async fn exchange(&mut self, command: &Command) -> Result<(Vec<Vec<u8>>, TaggedStatus)> {
        let tag = self.tag_gen.next();
        let data = command.serialize(&tag);
        self.stream.write_command(&data).await?;
        self.read_until_tagged(&tag).await
    }

    async fn read_until_tagged(&mut self, tag: &str) -> Result<(Vec<Vec<u8>>, TaggedStatus)> {
        let mut replies = Vec::new();

        loop {
            let reply = tokio::time::timeout(self.io_timeout, self.stream.read_reply())
                .await
                .map_err(|_| Error::Timeout(self.io_timeout))??;

            if let Some(status) = TaggedStatus::parse(&reply, tag) {
                return Ok((replies, status));
            }

            if let Some(UntaggedReply::Bye(text)) = ReplyParser::parse(&reply) {
                return Err(Error::Bye(text));
            }

            replies.push(reply);
        }
    }

    /// Maps a non-OK tagged status to the corresponding error.
    fn require_ok(status: TaggedStatus) -> Result<()> {
        match status {
            TaggedStatus::Ok(_) => Ok(()),
            TaggedStatus::No(text) => Err(Error::No(text)),
            TaggedStatus::Bad(text) => Err(Error::Bad(text)),
        }
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            io_timeout: self.io_timeout,
            _state: PhantomData,
        }
    }

    /// Sends a NOOP command to keep the connection alive.
    pub async fn noop(&mut self) -> Result<()> {
        let (_, status) = self.exchange(&Command::Noop).await?;
        Self::require_ok(status)
    }

    /// Gracefully disconnects from the server.
    ///
    /// Errors while saying goodbye are ignored; the connection is being
    /// dropped either way.
    pub async fn logout(mut self) {
        let _ = self.exchange(&Command::Logout).await;
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads and checks the server greeting.
    pub async fn from_stream(stream: S, io_timeout: Duration) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = tokio::time::timeout(io_timeout, framed.read_reply())
            .await
            .map_err(|_| Error::Timeout(io_timeout))??;

        if let Some(UntaggedReply::Bye(text)) = ReplyParser::parse(&greeting) {
            return Err(Error::Bye(text));
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            io_timeout,
            _state: PhantomData,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let (_, status) = self.exchange(&command).await?;

        match status {
            TaggedStatus::Ok(_) => Ok(self.transition()),
            TaggedStatus::No(text) | TaggedStatus::Bad(text) => Err(Error::Auth(text)),
        }
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection to TLS via STARTTLS.
    ///
    /// Must be issued before LOGIN; consumes the plaintext client and
    /// returns one speaking TLS on the same connection.
    pub async fn starttls(mut self, host: &str, verify_certs: bool) -> Result<Self> {
        let (_, status) = self.exchange(&Command::StartTls).await?;
        Self::require_ok(status)?;

        let plain = self.stream.into_inner();
        let tls = plain.upgrade_to_tls(host, verify_certs).await?;

        Ok(Self {
            stream: FramedStream::new(tls),
            tag_gen: self.tag_gen,
            io_timeout: self.io_timeout,
            _state: PhantomData,
        })
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox, moving to the selected state.
    pub async fn select(mut self, mailbox: &Mailbox) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let command = Command::Select {
            mailbox: mailbox.clone(),
        };
        let (replies, status) = self.exchange(&command).await?;
        Self::require_ok(status)?;

        let mut mailbox_status = MailboxStatus::default();
        for reply in &replies {
            match ReplyParser::parse(reply) {
                Some(UntaggedReply::Exists(n)) => mailbox_status.exists = n,
                Some(UntaggedReply::Recent(n)) => mailbox_status.recent = Some(n),
                _ => {}
            }
        }

        debug!(
            "Selected {} ({} messages)",
            mailbox.as_str(),
            mailbox_status.exists
        );
        Ok((self.transition(), mailbox_status))
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Searches the selected mailbox, returning matching UIDs.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let command = Command::UidSearch {
            criteria: criteria.clone(),
        };
        let (replies, status) = self.exchange(&command).await?;

        let mut uids = Vec::new();
        for reply in &replies {
            if let Some(UntaggedReply::Search(found)) = ReplyParser::parse(reply) {
                uids.extend(found);
            }
        }

        Self::require_ok(status)?;
        debug!("UID SEARCH matched {} messages", uids.len());
        Ok(uids)
    }

    /// Fetches one message section without setting `\Seen`.
    ///
    /// Returns `None` when the server reports no matching message (for
    /// example a UID expunged between search and fetch).
    pub async fn uid_fetch_raw(&mut self, uid: Uid, target: FetchTarget) -> Result<Option<Vec<u8>>> {
        let command = Command::UidFetch { uid, target };
        let (replies, status) = self.exchange(&command).await?;

        let mut body = None;
        for reply in &replies {
            if let Some(UntaggedReply::Fetch { body: Some(data) }) = ReplyParser::parse(reply) {
                body = Some(data);
            }
        }

        Self::require_ok(status)?;
        Ok(body)
    }
}
