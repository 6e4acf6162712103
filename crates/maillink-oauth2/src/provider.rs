//! Refresh-on-expiry bearer token provider.

use std::time::Duration;

use async_trait::async_trait;
use maillink_types::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::token_store::TokenStore;
use crate::types::StoredTokens;
use crate::{OAuthError, TokenProvider, post_token_form};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Hands out the access token from `token.json`, refreshing and
/// re-persisting it when it has expired.
pub struct OAuthCredentialProvider {
    store: TokenStore,
    http: reqwest::Client,
    // Serializes load-refresh-save so concurrent callers never race on
    // a rotated refresh token.
    lock: Mutex<()>,
}

impl OAuthCredentialProvider {
    pub fn new(store: TokenStore) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            store,
            http,
            lock: Mutex::new(()),
        }
    }

    /// Exchange the refresh token for a new access token and persist it.
    pub async fn refresh(&self, mut tokens: StoredTokens) -> Result<StoredTokens, OAuthError> {
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or(OAuthError::ReauthRequired)?;

        let response = post_token_form(
            &self.http,
            &tokens.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
                ("client_id", &tokens.client_id),
                ("client_secret", &tokens.client_secret),
            ],
        )
        .await;

        let response = match response {
            Ok(r) => r,
            Err(OAuthError::Endpoint { status, message }) => {
                warn!(status, error = %message, "token refresh rejected");
                return Err(OAuthError::ReauthRequired);
            }
            Err(e) => return Err(e),
        };

        tokens.apply(response, chrono::Utc::now().timestamp());
        self.store.save(&tokens)?;
        info!("OAuth access token refreshed");
        Ok(tokens)
    }
}

#[async_trait]
impl TokenProvider for OAuthCredentialProvider {
    async fn access_token(&self) -> Result<SecretString, OAuthError> {
        let _guard = self.lock.lock().await;

        let tokens = self.store.load()?.ok_or(OAuthError::ReauthRequired)?;
        if tokens.is_valid() {
            debug!("using stored OAuth access token");
            return Ok(SecretString::new(tokens.access_token));
        }

        let tokens = self.refresh(tokens).await?;
        Ok(SecretString::new(tokens.access_token))
    }
}
