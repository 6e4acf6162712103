//! Mailbox side of maillink.
//!
//! - [`extract`] finds the sign-in link in a raw message, whatever its
//!   MIME structure or encoding.
//! - [`criteria`] and [`selector`] decide which message(s) a run acts on.
//! - [`mailbox`] is the capability interface the rest of the system talks
//!   to; [`imap`] implements it over TLS with password or XOAUTH2 login.

pub mod criteria;
pub mod extract;
pub mod imap;
pub mod mailbox;
pub mod memory;
pub mod message;
pub mod selector;

pub use criteria::SelectionCriteria;
pub use extract::{LinkPattern, PartOutcome};
pub use mailbox::{Access, Mailbox, MailboxConnector};
pub use memory::MemoryMailbox;
pub use message::RawMessage;
pub use selector::Validated;

use maillink_oauth2::OAuthError;

/// Mailbox failures. Every variant carries the underlying cause as text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MailError {
    /// TCP connect failed.
    #[error("IMAP connection failed: {0}")]
    Connect(String),

    /// TLS handshake failed.
    #[error("IMAP TLS handshake failed: {0}")]
    Tls(String),

    /// The server rejected the credentials.
    #[error("IMAP login failed: {0}")]
    Auth(String),

    /// No access token could be obtained for XOAUTH2.
    #[error(transparent)]
    Credential(#[from] OAuthError),

    /// SELECT / EXAMINE failed.
    #[error("cannot open folder {folder}: {reason}")]
    Select { folder: String, reason: String },

    #[error("IMAP search failed: {0}")]
    Search(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Setting the `\Seen` flag failed.
    #[error("IMAP store failed: {0}")]
    Store(String),

    /// An operation did not finish within its time bound.
    #[error("IMAP {0} timed out")]
    Timeout(&'static str),

    /// The link pattern could not be compiled.
    #[error("invalid link pattern: {0}")]
    Pattern(String),
}
