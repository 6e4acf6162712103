//! Message selection policy.
//!
//! The server's subject search can match more broadly than intended, so
//! every candidate is re-checked locally after fetch.

use chrono::NaiveDate;
use maillink_types::SubjectFilter;
use tracing::debug;

use crate::criteria::SelectionCriteria;
use crate::mailbox::Mailbox;
use crate::message::RawMessage;
use crate::MailError;

/// Outcome of fetching and re-validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    Accepted(RawMessage),
    /// Fetched but the decoded subject lacks one of the keywords.
    SubjectMismatch { uid: u32, subject: String },
    /// The uid vanished between search and fetch.
    Gone(u32),
}

/// Unread matching messages from `today`, oldest first.
pub async fn scheduled_candidates(
    mailbox: &mut dyn Mailbox,
    filter: &SubjectFilter,
    today: NaiveDate,
) -> Result<Vec<u32>, MailError> {
    let criteria = SelectionCriteria::scheduled(filter, today);
    let mut uids = mailbox.search(&criteria).await?;
    uids.sort_unstable();
    uids.dedup();
    debug!(query = %criteria.to_imap_query(), count = uids.len(), "scheduled search");
    Ok(uids)
}

/// The numerically greatest matching uid from `today`, read or not.
pub async fn latest_candidate(
    mailbox: &mut dyn Mailbox,
    filter: &SubjectFilter,
    today: NaiveDate,
) -> Result<Option<u32>, MailError> {
    let criteria = SelectionCriteria::on_demand(filter, today);
    let uids = mailbox.search(&criteria).await?;
    debug!(query = %criteria.to_imap_query(), count = uids.len(), "on-demand search");
    Ok(uids.into_iter().max())
}

/// Fetch `uid` and confirm its subject carries both keywords.
pub async fn fetch_validated(
    mailbox: &mut dyn Mailbox,
    uid: u32,
    filter: &SubjectFilter,
) -> Result<Validated, MailError> {
    let Some(message) = mailbox.fetch(uid).await? else {
        return Ok(Validated::Gone(uid));
    };
    let subject = message.subject();
    if filter.accepts(&subject) {
        Ok(Validated::Accepted(message))
    } else {
        Ok(Validated::SubjectMismatch { uid, subject })
    }
}
