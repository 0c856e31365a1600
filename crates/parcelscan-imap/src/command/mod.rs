//! IMAP command builder.
//!
//! This module provides types and serialization for the subset of IMAP
//! commands a mailbox scan issues.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Mailbox, Uid};

pub use tag_generator::TagGenerator;
pub use types::{FetchTarget, SearchCriteria};

use serialize::{write_astring, write_mailbox, write_search_criteria};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// UID SEARCH command.
    UidSearch {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID FETCH command for a single message.
    UidFetch {
        /// Message UID.
        uid: Uid,
        /// Item to fetch.
        target: FetchTarget,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                write_search_criteria(&mut buf, criteria);
            }

            Self::UidFetch { uid, target } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uid.to_string().as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(target.as_str().as_bytes());
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}
