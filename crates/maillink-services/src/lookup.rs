//! On-demand lookup of today's newest sign-in link.
//!
//! Used by the bot's `/link` command and by `maillink probe`. Never reads
//! or writes processing state and never changes message flags.

use std::sync::Arc;

use chrono::NaiveDate;
use maillink_channels::escape_html;
use maillink_mail::selector::{fetch_validated, latest_candidate};
use maillink_mail::{Access, LinkPattern, Mailbox, MailboxConnector, MailError, Validated};
use maillink_types::SubjectFilter;
use tracing::{debug, info, warn};

/// Reply when nothing matched today.
pub const NO_MESSAGE_REPLY: &str = "No Claude login email from today.";

/// Reply when the newest match has no link in it.
pub const NO_LINK_REPLY: &str = "No magic-link URL in today's Claude email.";

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLookup {
    Found {
        uid: u32,
        subject: String,
        link: String,
    },
    /// Nothing from today, or the newest match failed subject re-validation.
    NoMessage,
    NoLink { uid: u32, subject: String },
    /// Mailbox unreachable or a protocol command failed.
    Failed(String),
}

impl LinkLookup {
    /// Text to send back to the requester. Everything except the link
    /// itself is HTML-escaped.
    pub fn reply_text(&self) -> String {
        match self {
            Self::Found { link, .. } => link.clone(),
            Self::NoMessage => NO_MESSAGE_REPLY.to_string(),
            Self::NoLink { .. } => NO_LINK_REPLY.to_string(),
            Self::Failed(reason) => escape_html(reason),
        }
    }
}

/// Runs the on-demand selection against a fresh read-only session.
pub struct LinkFinder {
    connector: Arc<dyn MailboxConnector>,
    filter: SubjectFilter,
    pattern: LinkPattern,
}

impl LinkFinder {
    pub fn new(
        connector: Arc<dyn MailboxConnector>,
        filter: SubjectFilter,
        pattern: LinkPattern,
    ) -> Self {
        Self {
            connector,
            filter,
            pattern,
        }
    }

    /// Newest matching message from `today`, read or not, and its link.
    pub async fn latest(&self, today: NaiveDate) -> LinkLookup {
        let mut mailbox = match self.connector.open(Access::ReadOnly).await {
            Ok(mb) => mb,
            Err(e) => {
                warn!(error = %e, "mailbox unavailable for lookup");
                return LinkLookup::Failed(e.to_string());
            }
        };

        let outcome = self.lookup(mailbox.as_mut(), today).await;
        if let Err(e) = mailbox.logout().await {
            debug!(error = %e, "logout after lookup failed");
        }

        match outcome {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(error = %e, "lookup failed");
                LinkLookup::Failed(e.to_string())
            }
        }
    }

    async fn lookup(
        &self,
        mailbox: &mut dyn Mailbox,
        today: NaiveDate,
    ) -> Result<LinkLookup, MailError> {
        let Some(uid) = latest_candidate(mailbox, &self.filter, today).await? else {
            info!(%today, "no matching message today");
            return Ok(LinkLookup::NoMessage);
        };

        let message = match fetch_validated(mailbox, uid, &self.filter).await? {
            Validated::Accepted(message) => message,
            Validated::SubjectMismatch { uid, subject } => {
                info!(uid, subject = %subject, "newest match failed subject check");
                return Ok(LinkLookup::NoMessage);
            }
            Validated::Gone(uid) => {
                return Err(MailError::Fetch(format!("message {uid} disappeared")));
            }
        };

        let subject = message.subject();
        match self.pattern.extract(&message.raw) {
            Some(link) => Ok(LinkLookup::Found { uid, subject, link }),
            None => {
                info!(uid, "no link found");
                Ok(LinkLookup::NoLink { uid, subject })
            }
        }
    }
}
