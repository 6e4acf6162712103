//! One-time interactive consent (authorization code + PKCE).
//!
//! The redirect lands on a loopback listener bound to an ephemeral port,
//! which is how Google's "Desktop app" clients are meant to be used.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::token_store::TokenStore;
use crate::types::{ClientSecrets, GMAIL_SCOPE, StoredTokens};
use crate::{
    OAuthError, compute_pkce_challenge, generate_pkce_verifier, generate_state, post_token_form,
};

/// How long to wait for the browser redirect.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period for the redirect server to finish its last response.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<html><body><p>The authentication flow has completed. \
You may close this window.</p></body></html>";

const DENIED_PAGE: &str = "<html><body><p>Authorization was denied.</p></body></html>";

/// Query parameters carried by the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Callback {
    Code { code: String, state: String },
    Denied(String),
}

impl Callback {
    /// `None` for requests that are not the redirect (favicon and the like).
    pub(crate) fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        if let Some(error) = params.get("error") {
            return Some(Self::Denied(error.clone()));
        }
        match (params.get("code"), params.get("state")) {
            (Some(code), Some(state)) => Some(Self::Code {
                code: code.clone(),
                state: state.clone(),
            }),
            _ => None,
        }
    }
}

/// Hands the first redirect to the waiting flow.
type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Callback>>>>;

/// A started consent flow, waiting for the browser redirect.
pub struct PendingAuthorization {
    secrets: ClientSecrets,
    listener: TcpListener,
    redirect_uri: String,
    state: String,
    pkce_verifier: String,
    authorize_url: String,
}

impl PendingAuthorization {
    /// Bind the loopback listener and build the consent URL.
    pub async fn start(secrets: ClientSecrets) -> Result<Self, OAuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| OAuthError::Authorization(format!("failed to bind loopback port: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| OAuthError::Authorization(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let state = generate_state();
        let pkce_verifier = generate_pkce_verifier();
        let authorize_url = build_authorize_url(
            &secrets,
            &redirect_uri,
            &state,
            &compute_pkce_challenge(&pkce_verifier),
        )?;

        debug!(redirect_uri = %redirect_uri, "started authorization flow");
        Ok(Self {
            secrets,
            listener,
            redirect_uri,
            state,
            pkce_verifier,
            authorize_url,
        })
    }

    /// URL the user must open to grant access.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Try to open the consent page in the default browser. Failure is
    /// not fatal since the URL is printed as well.
    pub fn open_browser(&self) {
        if let Err(e) = open::that(&self.authorize_url) {
            warn!(error = %e, "could not open a browser; open the URL manually");
        }
    }

    /// Wait for the redirect, validate `state`, exchange the code and
    /// persist the resulting tokens.
    pub async fn complete(self, store: &TokenStore) -> Result<StoredTokens, OAuthError> {
        let callback = tokio::time::timeout(CONSENT_TIMEOUT, receive_callback(self.listener))
            .await
            .map_err(|_| OAuthError::Authorization("timed out waiting for the browser".into()))??;

        let (code, state) = match callback {
            Callback::Code { code, state } => (code, state),
            Callback::Denied(reason) => {
                return Err(OAuthError::Authorization(format!("consent denied: {reason}")));
            }
        };

        if state != self.state {
            return Err(OAuthError::Authorization(
                "state parameter mismatch (possible CSRF attack)".into(),
            ));
        }

        let http = reqwest::Client::new();
        let response = post_token_form(
            &http,
            &self.secrets.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", &code),
                ("redirect_uri", &self.redirect_uri),
                ("client_id", &self.secrets.client_id),
                ("client_secret", &self.secrets.client_secret),
                ("code_verifier", &self.pkce_verifier),
            ],
        )
        .await?;

        let mut tokens = StoredTokens {
            access_token: String::new(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_at: None,
            scopes: vec![GMAIL_SCOPE.to_string()],
            client_id: self.secrets.client_id.clone(),
            client_secret: self.secrets.client_secret.clone(),
            token_uri: self.secrets.token_uri.clone(),
        };
        tokens.apply(response, chrono::Utc::now().timestamp());

        if tokens.refresh_token.is_none() {
            warn!("no refresh token granted; the token will need re-authorization when it expires");
        }

        store.save(&tokens)?;
        info!(path = %store.path().display(), "OAuth tokens saved");
        Ok(tokens)
    }
}

/// Serve the redirect URI until the first callback arrives.
async fn receive_callback(listener: TcpListener) -> Result<Callback, OAuthError> {
    let (callback_tx, callback_rx) = oneshot::channel();
    let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback_tx)));
    let app = Router::new()
        .route("/", get(handle_redirect))
        .with_state(slot);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let callback = callback_rx
        .await
        .map_err(|_| OAuthError::Authorization("redirect listener stopped".into()));

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Err(e))) => debug!(error = %e, "redirect server error"),
        Ok(Err(e)) => debug!(error = %e, "redirect server task failed"),
        Err(_) => debug!("redirect server still draining, leaving it"),
        Ok(Ok(Ok(()))) => {}
    }
    callback
}

async fn handle_redirect(
    State(slot): State<CallbackSlot>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let Some(callback) = Callback::from_params(&params) else {
        return (StatusCode::NOT_FOUND, Html("Not found"));
    };
    let page = match callback {
        Callback::Code { .. } => SUCCESS_PAGE,
        Callback::Denied(_) => DENIED_PAGE,
    };
    if let Some(tx) = slot.lock().await.take() {
        debug!("redirect received");
        let _ = tx.send(callback);
    }
    (StatusCode::OK, Html(page))
}

fn build_authorize_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> Result<String, OAuthError> {
    let mut url = url::Url::parse(&secrets.auth_uri)
        .map_err(|e| OAuthError::Authorization(format!("invalid auth URL: {e}")))?;

    url.query_pairs_mut()
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", GMAIL_SCOPE)
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(url.to_string())
}
