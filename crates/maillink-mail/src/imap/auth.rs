//! Login strategies.
//!
//! Password and OAuth logins are interchangeable implementations of
//! [`ImapAuthenticator`]; the connector never branches on which one it has.

use std::sync::Arc;

use async_trait::async_trait;
use maillink_oauth2::TokenProvider;
use maillink_types::SecretString;
use tracing::debug;

use super::{ImapClient, ImapSession};
use crate::MailError;

/// Turns a connected client into an authenticated session.
#[async_trait]
pub trait ImapAuthenticator: Send + Sync {
    /// Short name for logs.
    fn method(&self) -> &'static str;

    async fn login(&self, client: ImapClient, user: &str) -> Result<ImapSession, MailError>;
}

/// `LOGIN` with an app password.
pub struct PasswordLogin {
    password: SecretString,
}

impl PasswordLogin {
    pub fn new(password: SecretString) -> Self {
        Self { password }
    }
}

#[async_trait]
impl ImapAuthenticator for PasswordLogin {
    fn method(&self) -> &'static str {
        "password"
    }

    async fn login(&self, client: ImapClient, user: &str) -> Result<ImapSession, MailError> {
        client
            .login(user, self.password.expose())
            .await
            .map_err(|(e, _client)| MailError::Auth(e.to_string()))
    }
}

/// `AUTHENTICATE XOAUTH2` with a bearer token from a [`TokenProvider`].
pub struct XOAuth2Login {
    tokens: Arc<dyn TokenProvider>,
}

impl XOAuth2Login {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl ImapAuthenticator for XOAuth2Login {
    fn method(&self) -> &'static str {
        "xoauth2"
    }

    async fn login(&self, client: ImapClient, user: &str) -> Result<ImapSession, MailError> {
        let token = self.tokens.access_token().await?;
        debug!(user = %user, "authenticating with XOAUTH2");
        client
            .authenticate("XOAUTH2", XOAuth2Payload::new(user, &token))
            .await
            .map_err(|(e, _client)| MailError::Auth(e.to_string()))
    }
}

/// SASL XOAUTH2 initial response: `user=<u>^Aauth=Bearer <t>^A^A`.
pub fn xoauth2_string(user: &str, access_token: &str) -> String {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01")
}

/// Sends the payload once. If the server answers with an error challenge,
/// an empty response lets it finish with a tagged `NO`.
struct XOAuth2Payload {
    payload: Option<String>,
}

impl XOAuth2Payload {
    fn new(user: &str, token: &SecretString) -> Self {
        Self {
            payload: Some(xoauth2_string(user, token.expose())),
        }
    }
}

impl async_imap::Authenticator for XOAuth2Payload {
    type Response = String;

    fn process(&mut self, _challenge: &[u8]) -> Self::Response {
        self.payload.take().unwrap_or_default()
    }
}
