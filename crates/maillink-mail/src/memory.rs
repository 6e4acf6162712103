//! In-memory mailbox for exercising the pipeline without a server.
//!
//! Subject search is a case-insensitive substring match, which is looser
//! than some servers and close to what Gmail does.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::criteria::SelectionCriteria;
use crate::mailbox::{Access, Mailbox, MailboxConnector};
use crate::message::RawMessage;
use crate::MailError;

#[derive(Debug, Clone)]
struct Stored {
    raw: Vec<u8>,
    date: NaiveDate,
    seen: bool,
}

#[derive(Debug, Default)]
struct State {
    messages: BTreeMap<u32, Stored>,
    opened: usize,
    closed: usize,
    connect_error: Option<String>,
    search_error: Option<String>,
    fetch_error: Option<String>,
}

/// Shared handle; clones see the same messages and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailbox {
    state: Arc<Mutex<State>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an unread message.
    pub fn insert(&self, uid: u32, date: NaiveDate, raw: impl Into<Vec<u8>>) {
        self.lock().messages.insert(
            uid,
            Stored {
                raw: raw.into(),
                date,
                seen: false,
            },
        );
    }

    pub fn is_seen(&self, uid: u32) -> bool {
        self.lock().messages.get(&uid).is_some_and(|m| m.seen)
    }

    pub fn set_seen(&self, uid: u32, seen: bool) {
        if let Some(m) = self.lock().messages.get_mut(&uid) {
            m.seen = seen;
        }
    }

    /// Make every subsequent `open` fail.
    pub fn fail_connect(&self, reason: &str) {
        self.lock().connect_error = Some(reason.to_string());
    }

    pub fn fail_search(&self, reason: &str) {
        self.lock().search_error = Some(reason.to_string());
    }

    pub fn fail_fetch(&self, reason: &str) {
        self.lock().fetch_error = Some(reason.to_string());
    }

    /// Sessions opened and not yet logged out.
    pub fn open_sessions(&self) -> usize {
        let state = self.lock();
        state.opened - state.closed
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().opened
    }
}

#[async_trait]
impl MailboxConnector for MemoryMailbox {
    async fn open(&self, access: Access) -> Result<Box<dyn Mailbox>, MailError> {
        let mut state = self.lock();
        if let Some(reason) = &state.connect_error {
            return Err(MailError::Connect(reason.clone()));
        }
        state.opened += 1;
        Ok(Box::new(MemorySession {
            mailbox: self.clone(),
            access,
            closed: false,
        }))
    }
}

struct MemorySession {
    mailbox: MemoryMailbox,
    access: Access,
    closed: bool,
}

#[async_trait]
impl Mailbox for MemorySession {
    async fn search(&mut self, criteria: &SelectionCriteria) -> Result<Vec<u32>, MailError> {
        let state = self.mailbox.lock();
        if let Some(reason) = &state.search_error {
            return Err(MailError::Search(reason.clone()));
        }
        let needle = criteria.subject.to_lowercase();
        Ok(state
            .messages
            .iter()
            .filter(|(_, m)| m.date == criteria.on)
            .filter(|(_, m)| !(criteria.unread_only && m.seen))
            .filter(|(uid, m)| {
                RawMessage::new(**uid, m.raw.clone())
                    .subject()
                    .to_lowercase()
                    .contains(&needle)
            })
            .map(|(uid, _)| *uid)
            .collect())
    }

    async fn fetch(&mut self, uid: u32) -> Result<Option<RawMessage>, MailError> {
        let state = self.mailbox.lock();
        if let Some(reason) = &state.fetch_error {
            return Err(MailError::Fetch(reason.clone()));
        }
        Ok(state
            .messages
            .get(&uid)
            .map(|m| RawMessage::new(uid, m.raw.clone())))
    }

    async fn mark_read(&mut self, uid: u32) -> Result<(), MailError> {
        if self.access == Access::ReadOnly {
            return Err(MailError::Store("folder opened read-only".into()));
        }
        match self.mailbox.lock().messages.get_mut(&uid) {
            Some(m) => {
                m.seen = true;
                Ok(())
            }
            None => Err(MailError::Store(format!("no message with uid {uid}"))),
        }
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        if !self.closed {
            self.closed = true;
            self.mailbox.lock().closed += 1;
        }
        Ok(())
    }
}
