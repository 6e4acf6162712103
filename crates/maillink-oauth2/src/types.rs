//! Token and client-secret types.

use std::fmt;
use std::path::Path;

use maillink_types::Environment;
use serde::{Deserialize, Serialize};

use crate::OAuthError;

/// Full IMAP/SMTP access to Gmail.
pub const GMAIL_SCOPE: &str = "https://mail.google.com/";

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Contents of `token.json`.
///
/// The client id and secret are stored next to the tokens so that a
/// refresh needs nothing but this file.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiration timestamp (Unix seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,

    #[serde(default)]
    pub scopes: Vec<String>,

    pub client_id: String,

    pub client_secret: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl StoredTokens {
    /// Check if the access token has expired (with a 60-second buffer).
    /// No expiry info means the token is assumed valid.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    pub(crate) fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at - EXPIRY_BUFFER_SECS,
            None => false,
        }
    }

    /// Usable without a refresh.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Merge a token endpoint response. Providers may omit the refresh
    /// token on refresh, in which case the existing one is kept.
    pub(crate) fn apply(&mut self, response: TokenResponse, now: i64) {
        self.access_token = response.access_token;
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
        if let Some(token_type) = response.token_type {
            self.token_type = token_type;
        }
        self.expires_at = response.expires_in.map(|secs| now + secs);
        if let Some(scope) = response.scope {
            self.scopes = scope.split(' ').map(String::from).collect();
        }
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Successful token endpoint body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body returned by Google's token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenErrorBody {
    pub fn message(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// An OAuth client registration ("Desktop app" in the Google console).
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

/// `credentials.json` as downloaded from the console. Desktop clients use
/// the `installed` key, web clients `web`.
#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    installed: Option<ClientSecrets>,
    #[serde(default)]
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a downloaded `credentials.json`.
    pub fn from_json(json: &str) -> Result<Self, OAuthError> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| OAuthError::Store(format!("failed to parse credentials file: {e}")))?;
        file.installed.or(file.web).ok_or_else(|| {
            OAuthError::Store("credentials file has no 'installed' or 'web' client".into())
        })
    }

    /// Load `credentials.json` if it exists.
    pub fn load(path: &Path) -> Result<Option<Self>, OAuthError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| OAuthError::Store(format!("failed to read credentials file: {e}")))?;
        Self::from_json(&json).map(Some)
    }

    /// Build from `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`.
    pub fn from_env(env: &dyn Environment) -> Option<Self> {
        let id = env.get_var("GOOGLE_CLIENT_ID").filter(|v| !v.is_empty())?;
        let secret = env.get_var("GOOGLE_CLIENT_SECRET").filter(|v| !v.is_empty())?;
        Some(Self {
            client_id: id,
            client_secret: secret,
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        })
    }

    /// Prefer the credentials file, fall back to the environment.
    pub fn discover(path: &Path, env: &dyn Environment) -> Result<Option<Self>, OAuthError> {
        match Self::load(path)? {
            Some(secrets) => Ok(Some(secrets)),
            None => Ok(Self::from_env(env)),
        }
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maillink_types::MapEnvironment;

    fn tokens(expires_at: Option<i64>) -> StoredTokens {
        StoredTokens {
            access_token: "ya29.access".into(),
            refresh_token: Some("1//refresh".into()),
            token_type: "Bearer".into(),
            expires_at,
            scopes: vec![GMAIL_SCOPE.into()],
            client_id: "id.apps.googleusercontent.com".into(),
            client_secret: "shh".into(),
            token_uri: GOOGLE_TOKEN_URL.into(),
        }
    }

    #[test]
    fn expiry_uses_buffer() {
        let t = tokens(Some(1_000));
        assert!(!t.is_expired_at(900));
        assert!(t.is_expired_at(940));
        assert!(t.is_expired_at(2_000));
        assert!(!tokens(None).is_expired_at(i64::MAX));
    }

    #[test]
    fn apply_keeps_refresh_token_when_omitted() {
        let mut t = tokens(Some(0));
        t.apply(
            TokenResponse {
                access_token: "ya29.new".into(),
                refresh_token: None,
                token_type: None,
                expires_in: Some(3599),
                scope: None,
            },
            10_000,
        );
        assert_eq!(t.access_token, "ya29.new");
        assert_eq!(t.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(t.expires_at, Some(13_599));
    }

    #[test]
    fn debug_redacts_tokens() {
        let rendered = format!("{:?}", tokens(None));
        assert!(!rendered.contains("ya29.access"));
        assert!(!rendered.contains("shh"));
    }

    #[test]
    fn parses_installed_credentials() {
        let json = r#"{"installed":{"client_id":"abc.apps.googleusercontent.com",
            "project_id":"p","auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "token_uri":"https://oauth2.googleapis.com/token","client_secret":"xyz",
            "redirect_uris":["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "xyz");
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URL);
    }

    #[test]
    fn rejects_credentials_without_client() {
        assert!(ClientSecrets::from_json(r#"{"other":{}}"#).is_err());
    }

    #[test]
    fn env_fallback_requires_both_values() {
        let env = MapEnvironment::new().with("GOOGLE_CLIENT_ID", "id");
        assert!(ClientSecrets::from_env(&env).is_none());

        let env = env.with("GOOGLE_CLIENT_SECRET", "secret");
        let secrets = ClientSecrets::from_env(&env).unwrap();
        assert_eq!(secrets.auth_uri, GOOGLE_AUTH_URL);
    }

    #[test]
    fn discover_prefers_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed":{"client_id":"from-file","client_secret":"s"}}"#,
        )
        .unwrap();
        let env = MapEnvironment::new()
            .with("GOOGLE_CLIENT_ID", "from-env")
            .with("GOOGLE_CLIENT_SECRET", "s");

        let secrets = ClientSecrets::discover(&path, &env).unwrap().unwrap();
        assert_eq!(secrets.client_id, "from-file");
    }
}
