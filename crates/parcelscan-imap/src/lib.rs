//! # parcelscan-imap
//!
//! A minimal async IMAP client covering exactly the protocol surface a
//! mailbox scan needs: connect (TLS, STARTTLS or plaintext), LOGIN,
//! SELECT, UID SEARCH, and UID FETCH of message bodies.
//!
//! ## Design
//!
//! - **Type-state connection management**: compile-time enforcement of
//!   valid IMAP state transitions (`NotAuthenticated` → `Authenticated`
//!   → `Selected`)
//! - **TLS via rustls**: secure connections without an OpenSSL
//!   dependency, with an opt-out certificate policy for self-signed
//!   private hosts
//! - **Bounded I/O**: every exchange is wrapped in a hard timeout; a
//!   timed-out session surfaces as [`Error::Timeout`] and is expected to
//!   be discarded by the caller
//!
//! ## Connection states
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select() ───→ Selected
//! └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and search criteria
//! - [`connection`]: connection management and type-state client
//! - [`parser`]: response parsing
//! - [`types`]: core IMAP types (UIDs, mailboxes)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchTarget, SearchCriteria, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, NotAuthenticated,
    Security, Selected, connect, connect_plain, connect_tls,
};
pub use error::{Error, Result};
pub use parser::{ReplyParser, TaggedStatus, UntaggedReply};
pub use types::{Mailbox, MailboxStatus, Uid};
