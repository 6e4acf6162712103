//! A fetched message.

use mailparse::MailHeaderMap;

/// One mail item as returned by the server: its uid plus the full RFC 5322
/// bytes. The content tree is parsed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
}

impl RawMessage {
    pub fn new(uid: u32, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            uid,
            raw: raw.into(),
        }
    }

    /// The decoded `Subject` header (RFC 2047 encoded words resolved).
    /// Empty when the header is missing or the head cannot be parsed.
    pub fn subject(&self) -> String {
        mailparse::parse_headers(&self.raw)
            .ok()
            .and_then(|(headers, _)| headers.get_first_value("Subject"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_subject() {
        let msg = RawMessage::new(
            1,
            &b"Subject: Secure link to log in to Claude.ai\r\n\r\nbody"[..],
        );
        assert_eq!(msg.subject(), "Secure link to log in to Claude.ai");
    }

    #[test]
    fn encoded_word_subject() {
        let msg = RawMessage::new(
            1,
            &b"Subject: =?UTF-8?B?U2VjdXJlIGxpbmsgdG8gbG9nIGluIHRvIENsYXVkZS5haQ==?=\r\n\r\nx"[..],
        );
        assert_eq!(msg.subject(), "Secure link to log in to Claude.ai");
    }

    #[test]
    fn missing_subject_is_empty() {
        let msg = RawMessage::new(1, &b"From: a@b.c\r\n\r\nbody"[..]);
        assert_eq!(msg.subject(), "");
    }
}
