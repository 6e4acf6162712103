//! Service error types.

use maillink_mail::MailError;
use thiserror::Error;

/// Errors produced by services in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ServiceError {
    /// Mailbox unreachable, login rejected, or a protocol command failed.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_errors_keep_their_message() {
        let err: ServiceError = MailError::Search("BAD [CLIENTBUG]".into()).into();
        assert_eq!(err.to_string(), "IMAP search failed: BAD [CLIENTBUG]");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ServiceError = io_err.into();
        assert!(matches!(err, ServiceError::Io(_)));
    }
}
