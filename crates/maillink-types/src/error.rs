//! Error types shared across maillink crates.
//!
//! [`ConfigError`] is the only fatal category: it is raised at startup
//! before any work is done. [`ChannelError`] covers push-transport
//! failures that abort a single command or poll.

use thiserror::Error;

/// Configuration is missing or malformed.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Neither a password nor a stored OAuth token is available.
    #[error(
        "no mailbox credential: run 'maillink auth' once for Gmail OAuth, or set IMAP_PASSWORD"
    )]
    NoCredential,
}

/// Push-transport error type.
///
/// Used by the Telegram client for polling and bot setup failures.
/// Outbound delivery has its own classification.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelError {
    /// Failed to reach the transport backend.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The bot token was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Receiving updates failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Catch-all for errors that do not fit other variants.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_setting_names_the_key() {
        let err = ConfigError::Missing("TELEGRAM_CHAT_ID");
        assert_eq!(err.to_string(), "missing required setting TELEGRAM_CHAT_ID");
    }

    #[test]
    fn invalid_setting_display() {
        let err = ConfigError::Invalid {
            key: "IMAP_PORT",
            reason: "not a number".into(),
        };
        assert_eq!(err.to_string(), "invalid value for IMAP_PORT: not a number");
    }

    #[test]
    fn no_credential_mentions_both_paths() {
        let msg = ConfigError::NoCredential.to_string();
        assert!(msg.contains("maillink auth"));
        assert!(msg.contains("IMAP_PASSWORD"));
    }

    #[test]
    fn channel_error_display() {
        let err = ChannelError::ReceiveFailed("Conflict".into());
        assert_eq!(err.to_string(), "receive failed: Conflict");
    }
}
