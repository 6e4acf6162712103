//! Chunking and failure classification for outbound messages.

/// Longest slice sent in one message (Telegram rejects anything over 4096).
pub const MAX_MESSAGE_CHARS: usize = 4050;

/// Why a delivery did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DeliveryFailure {
    /// The recipient never opened a conversation with the bot, so the bot
    /// is not allowed to write first.
    #[error(
        "Telegram 403: The recipient must message the bot first (e.g. send 'hi' to the bot), then run again."
    )]
    RecipientNotStarted,

    /// Any other non-success answer from the API.
    #[error("Telegram API error: {status} {description}")]
    Api { status: u16, description: String },

    /// Timeout, DNS, connection reset and the like.
    #[error("Telegram request failed: {0}")]
    Network(String),
}

impl DeliveryFailure {
    /// Classify a rejected send from its HTTP status and description.
    pub fn from_response(status: u16, description: &str) -> Self {
        if status == 403
            && description
                .to_lowercase()
                .contains("can't initiate conversation")
        {
            Self::RecipientNotStarted
        } else {
            Self::Api {
                status,
                description: description.to_string(),
            }
        }
    }
}

/// Split `text` into consecutive slices of at most `max_chars` characters.
/// Empty text yields no slices.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Escape `&`, `<` and `>` for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_thousand_chars_make_three_chunks() {
        let text = "x".repeat(10_000);
        let lens: Vec<usize> = chunk_text(&text, MAX_MESSAGE_CHARS)
            .iter()
            .map(|c| c.chars().count())
            .collect();
        assert_eq!(lens, vec![4050, 4050, 1900]);
    }

    #[test]
    fn chunks_count_characters_not_bytes() {
        let text = "é".repeat(5);
        let chunks = chunk_text(&text, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn short_and_empty_text() {
        assert_eq!(chunk_text("hi", MAX_MESSAGE_CHARS), vec!["hi"]);
        assert!(chunk_text("", MAX_MESSAGE_CHARS).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let text = "ab".repeat(4);
        assert_eq!(chunk_text(&text, 4), vec!["abab", "abab"]);
    }

    #[test]
    fn forbidden_with_marker_is_actionable() {
        let failure = DeliveryFailure::from_response(
            403,
            "Forbidden: bot can't initiate conversation with a user",
        );
        assert_eq!(failure, DeliveryFailure::RecipientNotStarted);
        assert_eq!(
            failure.to_string(),
            "Telegram 403: The recipient must message the bot first (e.g. send 'hi' to the bot), then run again."
        );
    }

    #[test]
    fn other_forbidden_keeps_description() {
        let failure = DeliveryFailure::from_response(403, "Forbidden: bot was blocked by the user");
        assert_eq!(
            failure.to_string(),
            "Telegram API error: 403 Forbidden: bot was blocked by the user"
        );
    }

    #[test]
    fn escapes_html_specials() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_html("Checking your email…"), "Checking your email…");
    }
}
