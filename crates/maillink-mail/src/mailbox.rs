//! Mailbox capability interface.

use async_trait::async_trait;

use crate::criteria::SelectionCriteria;
use crate::message::RawMessage;
use crate::MailError;

/// How the folder is opened. Read-only sessions use `EXAMINE` and can
/// never change flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// An open, authenticated session on one folder.
#[async_trait]
pub trait Mailbox: Send {
    /// Uids matching `criteria`, in ascending order.
    async fn search(&mut self, criteria: &SelectionCriteria) -> Result<Vec<u32>, MailError>;

    /// Full message for `uid`, `None` if it no longer exists. Fetching
    /// never sets the `\Seen` flag.
    async fn fetch(&mut self, uid: u32) -> Result<Option<RawMessage>, MailError>;

    /// Set `\Seen` on `uid`.
    async fn mark_read(&mut self, uid: u32) -> Result<(), MailError>;

    /// Close the session. Called on every exit path.
    async fn logout(&mut self) -> Result<(), MailError>;
}

/// Opens a fresh session per cycle or command.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    async fn open(&self, access: Access) -> Result<Box<dyn Mailbox>, MailError>;
}
