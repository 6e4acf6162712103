//! One forward cycle: select, extract, deliver, mark read.
//!
//! Every unread matching message from today is handled in ascending uid
//! order. A candidate is marked read only after its link was delivered,
//! so anything that fails stays unread and is picked up by the next
//! cycle. Processing state is written once, after the whole cycle.

use std::sync::Arc;

use chrono::NaiveDate;
use maillink_channels::DeliveryChannel;
use maillink_mail::selector::{fetch_validated, scheduled_candidates};
use maillink_mail::{Access, LinkPattern, Mailbox, MailboxConnector, Validated};
use maillink_types::SubjectFilter;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::state_store::StateStore;

/// Logged when a cycle finds nothing to forward.
pub const NO_CANDIDATES_HINT: &str = "No unread Claude login emails. Mark the 'Secure link to log in to Claude.ai' email as unread and run again.";

/// What happened to the candidates of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardReport {
    /// Uids returned by the scheduled search.
    pub candidates: Vec<u32>,
    /// Uids whose link was delivered.
    pub delivered: Vec<u32>,
    pub skipped_subject: Vec<u32>,
    pub no_link: Vec<u32>,
    /// Fetch or delivery failed; left unread.
    pub failed: Vec<u32>,
    /// Links that a dry run would have sent.
    pub previewed: Vec<String>,
}

/// Forward cycle wiring. Cheap to run repeatedly; each run opens and
/// closes its own mailbox session.
pub struct ForwardCycle {
    connector: Arc<dyn MailboxConnector>,
    channel: Arc<dyn DeliveryChannel>,
    state: Arc<StateStore>,
    filter: SubjectFilter,
    pattern: LinkPattern,
    target: String,
    dry_run: bool,
}

impl ForwardCycle {
    pub fn new(
        connector: Arc<dyn MailboxConnector>,
        channel: Arc<dyn DeliveryChannel>,
        state: Arc<StateStore>,
        filter: SubjectFilter,
        pattern: LinkPattern,
        target: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            channel,
            state,
            filter,
            pattern,
            target: target.into(),
            dry_run: false,
        }
    }

    /// Select and extract only: nothing is delivered, marked or saved.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Run one cycle against `today`'s mail.
    ///
    /// Fails only when the mailbox cannot be reached or searched.
    /// Per-candidate problems are recorded in the report, and a state file
    /// that cannot be written is logged.
    pub async fn run_once(&self, today: NaiveDate) -> Result<ForwardReport> {
        let access = if self.dry_run {
            Access::ReadOnly
        } else {
            Access::ReadWrite
        };
        let previous = self.state.load().await;

        let mut mailbox = self.connector.open(access).await?;
        let outcome = self.process(mailbox.as_mut(), today, previous.last_uid).await;
        if let Err(e) = mailbox.logout().await {
            debug!(error = %e, "logout after forward cycle failed");
        }
        let report = outcome?;

        if !self.dry_run {
            let saved = self
                .state
                .update(|state| {
                    for uid in &report.delivered {
                        state.advance(*uid);
                    }
                })
                .await;
            match saved {
                Ok(saved) => debug!(last_uid = saved.last_uid, "cycle state recorded"),
                Err(e) => error!(
                    error = %e,
                    path = %self.state.path().display(),
                    "could not record cycle state"
                ),
            }
        }

        info!(
            candidates = report.candidates.len(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "forward cycle complete"
        );
        Ok(report)
    }

    async fn process(
        &self,
        mailbox: &mut dyn Mailbox,
        today: NaiveDate,
        last_uid: u32,
    ) -> Result<ForwardReport> {
        let mut report = ForwardReport {
            candidates: scheduled_candidates(mailbox, &self.filter, today).await?,
            ..ForwardReport::default()
        };

        if report.candidates.is_empty() {
            info!("{NO_CANDIDATES_HINT}");
            return Ok(report);
        }

        for uid in report.candidates.clone() {
            if uid <= last_uid {
                debug!(uid, last_uid, "candidate at or below last delivered uid, re-delivering");
            }

            let message = match fetch_validated(mailbox, uid, &self.filter).await {
                Ok(Validated::Accepted(message)) => message,
                Ok(Validated::SubjectMismatch { uid, subject }) => {
                    debug!(uid, subject = %subject, "subject check failed, skipping");
                    report.skipped_subject.push(uid);
                    continue;
                }
                Ok(Validated::Gone(uid)) => {
                    warn!(uid, "message disappeared before fetch");
                    report.failed.push(uid);
                    continue;
                }
                Err(e) => {
                    warn!(uid, error = %e, "fetch failed");
                    report.failed.push(uid);
                    continue;
                }
            };

            let Some(link) = self.pattern.extract(&message.raw) else {
                info!(uid, "no link found");
                report.no_link.push(uid);
                continue;
            };

            if self.dry_run {
                info!(uid, "(dry-run) Would send to Telegram: {link}");
                report.previewed.push(link);
                continue;
            }

            if let Err(failure) = self.channel.send(&self.target, &link).await {
                error!(uid, error = %failure, "delivery failed, leaving message unread");
                report.failed.push(uid);
                continue;
            }
            info!(uid, "link delivered");

            if let Err(e) = mailbox.mark_read(uid).await {
                warn!(uid, error = %e, "delivered but could not mark read");
            }
            report.delivered.push(uid);
        }

        Ok(report)
    }
}
