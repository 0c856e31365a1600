//! Fixture-backed mailbox session for engine tests.

use std::collections::HashMap;

use parcelscan_core::{FetchReply, MailSession, ReplyStatus, SearchReply, Uid};
use parcelscan_imap::{Command, SearchCriteria};

/// Outcome of a canned search.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// OK with these UIDs.
    Uids(Vec<u32>),
    /// BAD with this text.
    Bad(String),
}

/// A mailbox session backed by canned replies.
///
/// Searches are matched by substring against the serialized criteria,
/// first rule wins; unmatched searches return OK with no UIDs. Fetches
/// look up raw fixture bytes by UID.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    rules: Vec<(String, SearchOutcome)>,
    messages: HashMap<u32, Vec<u8>>,
    /// Serialized form of every search issued, in order.
    pub searches: Vec<String>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cans a search outcome for criteria containing `needle`.
    #[must_use]
    pub fn on_search(mut self, needle: &str, outcome: SearchOutcome) -> Self {
        self.rules.push((needle.to_string(), outcome));
        self
    }

    /// Cans a message body for a UID.
    #[must_use]
    pub fn with_message(mut self, uid: u32, raw: &[u8]) -> Self {
        self.messages.insert(uid, raw.to_vec());
        self
    }

    fn render(criteria: &SearchCriteria) -> String {
        let bytes = Command::UidSearch {
            criteria: criteria.clone(),
        }
        .serialize("T0");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl MailSession for MockSession {
    async fn search(&mut self, criteria: &SearchCriteria) -> SearchReply {
        let rendered = Self::render(criteria);
        self.searches.push(rendered.clone());

        for (needle, outcome) in &self.rules {
            if rendered.contains(needle.as_str()) {
                return match outcome {
                    SearchOutcome::Uids(uids) => SearchReply {
                        status: ReplyStatus::Ok,
                        uids: uids.iter().copied().map(Uid).collect(),
                    },
                    SearchOutcome::Bad(text) => SearchReply {
                        status: ReplyStatus::Bad(text.clone()),
                        uids: Vec::new(),
                    },
                };
            }
        }

        SearchReply {
            status: ReplyStatus::Ok,
            uids: Vec::new(),
        }
    }

    async fn fetch(&mut self, uid: Uid) -> FetchReply {
        FetchReply {
            status: ReplyStatus::Ok,
            body: self.messages.get(&uid.value()).cloned(),
        }
    }
}

/// Loads a fixture message.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|err| panic!("fixture {name}: {err}"))
}
