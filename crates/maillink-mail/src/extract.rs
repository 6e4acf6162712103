//! Magic-link extraction.
//!
//! Every leaf part of the message is decoded with its declared charset and
//! searched in traversal order; the first match wins. Attached
//! `message/rfc822` parts are parsed and searched in place. A part that
//! cannot be decoded contributes nothing and extraction moves on. A message
//! that cannot be parsed at all simply has no link.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use mailparse::ParsedMail;
use mailparse::body::Body;
use regex::Regex;
use tracing::debug;

use crate::MailError;

/// Characters that end a link: whitespace, quotes, angle brackets and
/// closing parens/brackets.
const LINK_BODY: &str = r#"[^\s"'<>)\]]+"#;

/// Punctuation stripped from the end of a match.
const TRAILING: &[char] = &['\'', '"', ')', ']'];

/// Accepts bodies with missing or extra padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Result of decoding one leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    Decoded(String),
    Skipped(String),
}

/// `https://<host><marker>...`, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct LinkPattern {
    regex: Regex,
}

impl LinkPattern {
    /// Build a pattern for links on `host` whose path starts with `marker`.
    pub fn new(host: &str, marker: &str) -> Result<Self, MailError> {
        let source = format!(
            "(?i)https://{}{}{LINK_BODY}",
            regex::escape(host),
            regex::escape(marker)
        );
        let regex = Regex::new(&source).map_err(|e| MailError::Pattern(e.to_string()))?;
        Ok(Self { regex })
    }

    /// Claude.ai sign-in links: `https://claude.ai/magic-link#...`.
    pub fn claude() -> Result<Self, MailError> {
        Self::new("claude.ai", "/magic-link#")
    }

    /// First link in `text`, trailing punctuation removed.
    pub fn find(&self, text: &str) -> Option<String> {
        let m = self.regex.find(text)?;
        let link = m.as_str().trim_end_matches(TRAILING);
        let scheme_ok = link
            .get(..4)
            .is_some_and(|s| s.eq_ignore_ascii_case("http"));
        scheme_ok.then(|| link.to_string())
    }

    /// First link anywhere in the raw message, in part-traversal order.
    pub fn extract(&self, raw: &[u8]) -> Option<String> {
        let outcomes = decode_parts(raw);

        let mut skipped = 0usize;
        let mut found = None;
        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                PartOutcome::Decoded(text) => {
                    if let Some(link) = self.find(text) {
                        found = Some(link);
                        break;
                    }
                }
                PartOutcome::Skipped(reason) => {
                    skipped += 1;
                    debug!(part = index, reason = %reason, "skipped undecodable part");
                }
            }
        }

        if skipped > 0 {
            debug!(parts = outcomes.len(), skipped, "message had undecodable parts");
        }
        found
    }
}

/// Decode every leaf part of `raw`, in traversal order.
///
/// A message that cannot be parsed yields a single `Skipped` outcome.
pub fn decode_parts(raw: &[u8]) -> Vec<PartOutcome> {
    match mailparse::parse_mail(raw) {
        Ok(parsed) => {
            let mut out = Vec::new();
            collect_leaves(&parsed, &mut out);
            out
        }
        Err(e) => vec![PartOutcome::Skipped(format!("unparseable message: {e}"))],
    }
}

fn collect_leaves(part: &ParsedMail<'_>, out: &mut Vec<PartOutcome>) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_leaves(sub, out);
        }
        return;
    }
    if part.ctype.mimetype == "message/rfc822" {
        collect_attached(part, out);
        return;
    }
    out.push(decode_leaf(part));
}

/// Parse an attached message and walk its parts.
fn collect_attached(part: &ParsedMail<'_>, out: &mut Vec<PartOutcome>) {
    let bytes = match part.get_body_raw() {
        Ok(bytes) => bytes,
        Err(e) => {
            out.push(PartOutcome::Skipped(format!("message/rfc822: {e}")));
            return;
        }
    };
    match mailparse::parse_mail(&bytes) {
        Ok(inner) => collect_leaves(&inner, out),
        Err(e) => out.push(PartOutcome::Skipped(format!("message/rfc822: {e}"))),
    }
}

/// Decode with the declared charset, falling back to lossy UTF-8 over the
/// transfer-decoded bytes.
fn decode_leaf(part: &ParsedMail<'_>) -> PartOutcome {
    let charset_err = match part.get_body() {
        Ok(text) => return PartOutcome::Decoded(text),
        Err(e) => e,
    };
    match part.get_body_raw() {
        Ok(bytes) => PartOutcome::Decoded(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => match part.get_body_encoded() {
            Body::Base64(body) => {
                debug!(
                    mimetype = %part.ctype.mimetype,
                    error = %e,
                    "strict base64 failed, decoding leniently"
                );
                PartOutcome::Decoded(decode_base64_lenient(body.get_raw()))
            }
            _ => PartOutcome::Skipped(format!(
                "{} ({}): {e}; {charset_err}",
                part.ctype.mimetype, part.ctype.charset
            )),
        },
    }
}

/// Decode base64 ignoring padding and stray characters. Input that still
/// fails is passed through as text.
fn decode_base64_lenient(encoded: &[u8]) -> String {
    let cleaned: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, b'+' | b'/'))
        .collect();
    let bytes = LENIENT_BASE64
        .decode(&cleaned)
        .unwrap_or_else(|_| encoded.to_vec());
    String::from_utf8_lossy(&bytes).into_owned()
}
