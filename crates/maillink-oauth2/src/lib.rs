//! Gmail OAuth2 credential provider for maillink.
//!
//! Provides the one-time interactive consent flow ([`flow`]), `token.json`
//! persistence ([`token_store`]) and an [`OAuthCredentialProvider`] that
//! hands out a valid bearer token, refreshing it when it has expired.
//!
//! # Security
//!
//! - OAuth2 `state` parameter for CSRF protection (mandatory).
//! - PKCE (S256) on the authorization code exchange.
//! - Tokens stored with 0600 file permissions.
//! - Rotated refresh tokens persisted immediately.

pub mod flow;
pub mod provider;
pub mod token_store;
pub mod types;

use async_trait::async_trait;
use maillink_types::SecretString;
use rand::Rng;

pub use flow::PendingAuthorization;
pub use provider::OAuthCredentialProvider;
pub use token_store::TokenStore;
pub use types::{ClientSecrets, GMAIL_SCOPE, StoredTokens};

use types::{TokenErrorBody, TokenResponse};

/// Errors from the credential collaborator.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OAuthError {
    /// No usable token and no way to refresh one. The operator has to
    /// repeat the consent flow.
    #[error("OAuth token missing or expired. Run 'maillink auth' again.")]
    ReauthRequired,

    /// The token endpoint answered with an error status.
    #[error("token endpoint rejected the request ({status}): {message}")]
    Endpoint { status: u16, message: String },

    /// Network failure talking to the token endpoint.
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The browser redirect did not carry a usable authorization code.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Reading or writing `token.json` / `credentials.json` failed.
    #[error("{0}")]
    Store(String),
}

/// Source of bearer tokens for XOAUTH2 mailbox login.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, OAuthError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a random state string for CSRF protection.
fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen()).collect();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a PKCE code verifier (43 URL-safe characters).
fn generate_pkce_verifier() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen()).collect();
    base64_url_encode(&bytes)
}

/// PKCE S256 challenge for `verifier`.
fn compute_pkce_challenge(verifier: &str) -> String {
    use sha2::Digest;
    let hash = sha2::Sha256::digest(verifier.as_bytes());
    base64_url_encode(&hash)
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// POST a form to a token endpoint and decode the success body.
async fn post_token_form(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, OAuthError> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();

    if !status.is_success() {
        let body: TokenErrorBody = response.json().await.unwrap_or_default();
        return Err(OAuthError::Endpoint {
            status: status.as_u16(),
            message: body.message(),
        });
    }

    Ok(response.json::<TokenResponse>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_random_hex() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes -> 43 base64url chars without padding.
        assert_eq!(generate_pkce_verifier().len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc7636_example() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            compute_pkce_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn reauth_message_is_actionable() {
        assert_eq!(
            OAuthError::ReauthRequired.to_string(),
            "OAuth token missing or expired. Run 'maillink auth' again."
        );
    }
}
